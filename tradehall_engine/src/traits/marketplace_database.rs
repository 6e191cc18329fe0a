use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::db_types::{
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
};

/// The persistent-store contract for the Tradehall engine.
///
/// Backends own the listings, transactions, ratings, reputation summaries, guild configuration and scheduled-event
/// records. The engine references listings and events by id only and never bypasses this trait.
#[allow(async_fn_in_trait)]
pub trait MarketplaceDatabase: Clone + Send + Sync {
    /// The URL of the database
    fn url(&self) -> &str;

    //----------------------------------------  Listings  ------------------------------------------------------------

    /// Stores a new listing and returns the full record. When the listing carries a scheduled trade time, the caller
    /// is responsible for creating the companion event via [`Self::create_event`].
    async fn create_listing(&self, listing: NewListing) -> Result<Listing, MarketplaceError>;

    async fn fetch_listing(&self, listing_id: i64) -> Result<Option<Listing>, MarketplaceError>;

    /// Active listings for the given guild/side/zone, oldest first. When `item` is given, only listings whose item
    /// matches it case-insensitively, or whose item is the "All Items" sentinel, are returned.
    async fn fetch_active_listings(
        &self,
        guild: &str,
        side: Side,
        zone: &str,
        item: Option<&str>,
    ) -> Result<Vec<Listing>, MarketplaceError>;

    /// Soft-deletes a listing: clears the active flag and stamps `removed_at`. Returns false if the listing was not
    /// active to begin with (idempotent).
    async fn deactivate_listing(&self, listing_id: i64) -> Result<bool, MarketplaceError>;

    /// Pushes the expiry time out by `days` and clears the reminded flag so a fresh reminder can fire later.
    async fn extend_listing(&self, listing_id: i64, days: i64) -> Result<Listing, MarketplaceError>;

    /// Active listings whose expiry time has passed.
    async fn fetch_expired(&self, now: DateTime<Utc>) -> Result<Vec<Listing>, MarketplaceError>;

    /// Active, non-reminded listings expiring within `window` from `now`.
    async fn fetch_expiring_soon(&self, now: DateTime<Utc>, window: Duration) -> Result<Vec<Listing>, MarketplaceError>;

    async fn mark_reminded(&self, listing_id: i64) -> Result<(), MarketplaceError>;

    //---------------------------------------- Transactions ----------------------------------------------------------

    async fn insert_transaction(&self, tx: NewTransaction) -> Result<Transaction, MarketplaceError>;

    async fn fetch_transactions_for_user(&self, user: &UserId) -> Result<Vec<Transaction>, MarketplaceError>;

    //----------------------------------------   Ratings   -----------------------------------------------------------

    async fn insert_rating(&self, rating: NewRating) -> Result<Rating, MarketplaceError>;

    async fn fetch_approved_ratings_for(&self, rated: &UserId) -> Result<Vec<Rating>, MarketplaceError>;

    async fn upsert_reputation_summary(
        &self,
        user: &UserId,
        avg: f64,
        count: i64,
    ) -> Result<ReputationSummary, MarketplaceError>;

    async fn fetch_reputation_summary(&self, user: &UserId) -> Result<Option<ReputationSummary>, MarketplaceError>;

    //----------------------------------------Guild config------------------------------------------------------------

    /// The guild's moderation settings. Returns the defaults (no admin channel, threshold 3) when the guild has never
    /// been configured.
    async fn fetch_guild_rating_config(&self, guild: &str) -> Result<GuildRatingConfig, MarketplaceError>;

    async fn upsert_guild_rating_config(&self, config: GuildRatingConfig) -> Result<(), MarketplaceError>;

    //---------------------------------------- Scheduled events ------------------------------------------------------

    async fn create_event(&self, listing_id: i64, trigger_at: DateTime<Utc>) -> Result<ScheduledEvent, MarketplaceError>;

    async fn fetch_event(&self, event_id: i64) -> Result<Option<ScheduledEvent>, MarketplaceError>;

    /// Pending events whose trigger time has arrived.
    async fn fetch_due_events(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledEvent>, MarketplaceError>;

    async fn fetch_events_in_status(&self, status: EventStatus) -> Result<Vec<ScheduledEvent>, MarketplaceError>;

    async fn set_event_status(&self, event_id: i64, status: EventStatus) -> Result<(), MarketplaceError>;

    async fn set_seller_confirmed(&self, event_id: i64) -> Result<(), MarketplaceError>;

    async fn set_rating_due(&self, event_id: i64, due_at: DateTime<Utc>) -> Result<(), MarketplaceError>;

    async fn mark_rating_prompts_sent(&self, event_id: i64) -> Result<(), MarketplaceError>;

    async fn add_participant(&self, event_id: i64, user: &UserId) -> Result<(), MarketplaceError>;

    async fn fetch_participants(&self, event_id: i64) -> Result<Vec<UserId>, MarketplaceError>;

    /// Records a participant's confirmation answer. Repeat answers overwrite the previous row rather than
    /// accumulating.
    async fn upsert_confirmation(
        &self,
        event_id: i64,
        user: &UserId,
        role: TradeRole,
        confirmed: bool,
    ) -> Result<(), MarketplaceError>;

    async fn fetch_confirmations(&self, event_id: i64) -> Result<Vec<EventConfirmation>, MarketplaceError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), MarketplaceError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum MarketplaceError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("The requested listing (id {0}) does not exist")]
    ListingNotFound(i64),
    #[error("The requested scheduled event (id {0}) does not exist")]
    EventNotFound(i64),
}

impl From<sqlx::Error> for MarketplaceError {
    fn from(e: sqlx::Error) -> Self {
        MarketplaceError::DatabaseError(e.to_string())
    }
}
