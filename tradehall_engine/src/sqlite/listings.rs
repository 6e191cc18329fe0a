use chrono::{DateTime, Duration, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Listing, NewListing, Side, ALL_ITEMS},
    traits::MarketplaceError,
};

const LISTING_COLUMNS: &str = "id, owner, guild, side, zone, subcategory, item, quantity, notes, scheduled_for, \
                               created_at, expires_at, active, reminded, removed_at";

pub async fn insert_listing(
    listing: NewListing,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Listing, MarketplaceError> {
    let expires_at = now + listing.ttl;
    let id: i64 = sqlx::query_scalar(
        r#"
            INSERT INTO listings (owner, guild, side, zone, subcategory, item, quantity, notes, scheduled_for,
                                  created_at, expires_at, active, reminded)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 1, 0)
            RETURNING id;
        "#,
    )
    .bind(&listing.owner)
    .bind(&listing.guild)
    .bind(listing.side)
    .bind(&listing.zone)
    .bind(&listing.subcategory)
    .bind(&listing.item)
    .bind(listing.quantity)
    .bind(&listing.notes)
    .bind(listing.scheduled_for)
    .bind(now)
    .bind(expires_at)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Listing #{id} ({} {} in {}) saved", listing.side, listing.item, listing.zone);
    Ok(Listing {
        id,
        owner: listing.owner,
        guild: listing.guild,
        side: listing.side,
        zone: listing.zone,
        subcategory: listing.subcategory,
        item: listing.item,
        quantity: listing.quantity,
        notes: listing.notes,
        scheduled_for: listing.scheduled_for,
        created_at: now,
        expires_at,
        active: true,
        reminded: false,
        removed_at: None,
    })
}

pub async fn fetch_listing(listing_id: i64, conn: &mut SqliteConnection) -> Result<Option<Listing>, MarketplaceError> {
    let q = format!("SELECT {LISTING_COLUMNS} FROM listings WHERE id = $1");
    let listing = sqlx::query_as::<_, Listing>(&q).bind(listing_id).fetch_optional(conn).await?;
    Ok(listing)
}

/// Active listings for the market segment, oldest first. The optional item filter also admits the "All Items"
/// sentinel so catch-all sellers match any request in their zone.
pub async fn fetch_active_listings(
    guild: &str,
    side: Side,
    zone: &str,
    item: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Listing>, MarketplaceError> {
    let listings = match item {
        Some(item) => {
            let q = format!(
                "SELECT {LISTING_COLUMNS} FROM listings \
                 WHERE guild = $1 AND side = $2 AND zone = $3 AND active = 1 \
                 AND (LOWER(item) = LOWER($4) OR item = $5) \
                 ORDER BY datetime(created_at) ASC, id ASC"
            );
            sqlx::query_as::<_, Listing>(&q)
                .bind(guild)
                .bind(side)
                .bind(zone)
                .bind(item)
                .bind(ALL_ITEMS)
                .fetch_all(conn)
                .await?
        },
        None => {
            let q = format!(
                "SELECT {LISTING_COLUMNS} FROM listings \
                 WHERE guild = $1 AND side = $2 AND zone = $3 AND active = 1 \
                 ORDER BY datetime(created_at) ASC, id ASC"
            );
            sqlx::query_as::<_, Listing>(&q).bind(guild).bind(side).bind(zone).fetch_all(conn).await?
        },
    };
    Ok(listings)
}

/// Soft delete. Returns false when the listing was already inactive, so callers can treat repeats as no-ops.
pub async fn deactivate_listing(
    listing_id: i64,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<bool, MarketplaceError> {
    let result = sqlx::query("UPDATE listings SET active = 0, removed_at = $1 WHERE id = $2 AND active = 1")
        .bind(now)
        .bind(listing_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn extend_listing(
    listing_id: i64,
    days: i64,
    conn: &mut SqliteConnection,
) -> Result<Listing, MarketplaceError> {
    let listing =
        fetch_listing(listing_id, &mut *conn).await?.ok_or(MarketplaceError::ListingNotFound(listing_id))?;
    let expires_at = listing.expires_at + Duration::days(days);
    sqlx::query("UPDATE listings SET expires_at = $1, reminded = 0 WHERE id = $2")
        .bind(expires_at)
        .bind(listing_id)
        .execute(conn)
        .await?;
    Ok(Listing { expires_at, reminded: false, ..listing })
}

pub async fn fetch_expired(now: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<Vec<Listing>, MarketplaceError> {
    let q = format!(
        "SELECT {LISTING_COLUMNS} FROM listings WHERE active = 1 AND datetime(expires_at) <= datetime($1)"
    );
    let listings = sqlx::query_as::<_, Listing>(&q).bind(now).fetch_all(conn).await?;
    Ok(listings)
}

pub async fn fetch_expiring_soon(
    now: DateTime<Utc>,
    window: Duration,
    conn: &mut SqliteConnection,
) -> Result<Vec<Listing>, MarketplaceError> {
    let horizon = now + window;
    let q = format!(
        "SELECT {LISTING_COLUMNS} FROM listings \
         WHERE active = 1 AND reminded = 0 \
         AND datetime(expires_at) > datetime($1) AND datetime(expires_at) <= datetime($2)"
    );
    let listings = sqlx::query_as::<_, Listing>(&q).bind(now).bind(horizon).fetch_all(conn).await?;
    Ok(listings)
}

pub async fn mark_reminded(listing_id: i64, conn: &mut SqliteConnection) -> Result<(), MarketplaceError> {
    sqlx::query("UPDATE listings SET reminded = 1 WHERE id = $1").bind(listing_id).execute(conn).await?;
    Ok(())
}
