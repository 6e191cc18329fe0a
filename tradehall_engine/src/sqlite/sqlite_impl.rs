//! `SqliteDatabase` is a concrete implementation of a Tradehall marketplace backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements the [`MarketplaceDatabase`] trait. The per-table
//! query functions live in the sibling modules; this type owns the pool and the transaction boundaries.
use std::{fmt::Debug, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use sqlx::{
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

use super::{events, guilds, listings, ratings, transactions};
use crate::{
    db_types::{
        EventConfirmation,
        EventStatus,
        GuildRatingConfig,
        Listing,
        NewListing,
        NewRating,
        NewTransaction,
        Rating,
        ReputationSummary,
        ScheduledEvent,
        Side,
        TradeRole,
        Transaction,
        UserId,
    },
    traits::{MarketplaceDatabase, MarketplaceError},
};

pub static MIGRATOR: Migrator = sqlx::migrate!("./src/sqlite/migrations");

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, MarketplaceError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| MarketplaceError::DatabaseError(e.to_string()))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    /// Brings the schema up to date. Call once at startup.
    pub async fn migrate(&self) -> Result<(), MarketplaceError> {
        MIGRATOR.run(&self.pool).await.map_err(|e| MarketplaceError::DatabaseError(e.to_string()))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl MarketplaceDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn create_listing(&self, listing: NewListing) -> Result<Listing, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        listings::insert_listing(listing, Utc::now(), &mut conn).await
    }

    async fn fetch_listing(&self, listing_id: i64) -> Result<Option<Listing>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        listings::fetch_listing(listing_id, &mut conn).await
    }

    async fn fetch_active_listings(
        &self,
        guild: &str,
        side: Side,
        zone: &str,
        item: Option<&str>,
    ) -> Result<Vec<Listing>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        listings::fetch_active_listings(guild, side, zone, item, &mut conn).await
    }

    async fn deactivate_listing(&self, listing_id: i64) -> Result<bool, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        listings::deactivate_listing(listing_id, Utc::now(), &mut conn).await
    }

    async fn extend_listing(&self, listing_id: i64, days: i64) -> Result<Listing, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let listing = listings::extend_listing(listing_id, days, &mut *tx).await?;
        tx.commit().await?;
        Ok(listing)
    }

    async fn fetch_expired(&self, now: DateTime<Utc>) -> Result<Vec<Listing>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        listings::fetch_expired(now, &mut conn).await
    }

    async fn fetch_expiring_soon(
        &self,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<Vec<Listing>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        listings::fetch_expiring_soon(now, window, &mut conn).await
    }

    async fn mark_reminded(&self, listing_id: i64) -> Result<(), MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        listings::mark_reminded(listing_id, &mut conn).await
    }

    async fn insert_transaction(&self, tx: NewTransaction) -> Result<Transaction, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        transactions::insert_transaction(tx, Utc::now(), &mut conn).await
    }

    async fn fetch_transactions_for_user(&self, user: &UserId) -> Result<Vec<Transaction>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        transactions::fetch_transactions_for_user(user, &mut conn).await
    }

    async fn insert_rating(&self, rating: NewRating) -> Result<Rating, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        ratings::insert_rating(rating, Utc::now(), &mut conn).await
    }

    async fn fetch_approved_ratings_for(&self, rated: &UserId) -> Result<Vec<Rating>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        ratings::fetch_approved_ratings_for(rated, &mut conn).await
    }

    async fn upsert_reputation_summary(
        &self,
        user: &UserId,
        avg: f64,
        count: i64,
    ) -> Result<ReputationSummary, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        ratings::upsert_reputation_summary(user, avg, count, &mut conn).await
    }

    async fn fetch_reputation_summary(&self, user: &UserId) -> Result<Option<ReputationSummary>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        ratings::fetch_reputation_summary(user, &mut conn).await
    }

    async fn fetch_guild_rating_config(&self, guild: &str) -> Result<GuildRatingConfig, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        guilds::fetch_guild_rating_config(guild, &mut conn).await
    }

    async fn upsert_guild_rating_config(&self, config: GuildRatingConfig) -> Result<(), MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        guilds::upsert_guild_rating_config(config, &mut conn).await
    }

    async fn create_event(
        &self,
        listing_id: i64,
        trigger_at: DateTime<Utc>,
    ) -> Result<ScheduledEvent, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        events::create_event(listing_id, trigger_at, Utc::now(), &mut conn).await
    }

    async fn fetch_event(&self, event_id: i64) -> Result<Option<ScheduledEvent>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        events::fetch_event(event_id, &mut conn).await
    }

    async fn fetch_due_events(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledEvent>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        events::fetch_due_events(now, &mut conn).await
    }

    async fn fetch_events_in_status(&self, status: EventStatus) -> Result<Vec<ScheduledEvent>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        events::fetch_events_in_status(status, &mut conn).await
    }

    async fn set_event_status(&self, event_id: i64, status: EventStatus) -> Result<(), MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        events::set_event_status(event_id, status, &mut conn).await
    }

    async fn set_seller_confirmed(&self, event_id: i64) -> Result<(), MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        events::set_seller_confirmed(event_id, &mut conn).await
    }

    async fn set_rating_due(&self, event_id: i64, due_at: DateTime<Utc>) -> Result<(), MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        events::set_rating_due(event_id, due_at, &mut conn).await
    }

    async fn mark_rating_prompts_sent(&self, event_id: i64) -> Result<(), MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        events::mark_rating_prompts_sent(event_id, &mut conn).await
    }

    async fn add_participant(&self, event_id: i64, user: &UserId) -> Result<(), MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        events::add_participant(event_id, user, &mut conn).await
    }

    async fn fetch_participants(&self, event_id: i64) -> Result<Vec<UserId>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        events::fetch_participants(event_id, &mut conn).await
    }

    async fn upsert_confirmation(
        &self,
        event_id: i64,
        user: &UserId,
        role: TradeRole,
        confirmed: bool,
    ) -> Result<(), MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        events::upsert_confirmation(event_id, user, role, confirmed, &mut conn).await
    }

    async fn fetch_confirmations(&self, event_id: i64) -> Result<Vec<EventConfirmation>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        events::fetch_confirmations(event_id, &mut conn).await
    }

    async fn close(&mut self) -> Result<(), MarketplaceError> {
        self.pool.close().await;
        Ok(())
    }
}
