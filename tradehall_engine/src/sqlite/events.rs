use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{EventConfirmation, EventStatus, ScheduledEvent, TradeRole, UserId},
    traits::MarketplaceError,
};

const EVENT_COLUMNS: &str =
    "id, listing_id, trigger_at, status, seller_confirmed, rating_due_at, rating_prompts_sent, created_at";

pub async fn create_event(
    listing_id: i64,
    trigger_at: DateTime<Utc>,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<ScheduledEvent, MarketplaceError> {
    let id: i64 = sqlx::query_scalar(
        r#"
            INSERT INTO scheduled_events (listing_id, trigger_at, status, seller_confirmed, rating_prompts_sent, created_at)
            VALUES ($1, $2, $3, 0, 0, $4)
            RETURNING id;
        "#,
    )
    .bind(listing_id)
    .bind(trigger_at)
    .bind(EventStatus::Pending)
    .bind(now)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Scheduled event #{id} created for listing #{listing_id} at {trigger_at}");
    Ok(ScheduledEvent {
        id,
        listing_id,
        trigger_at,
        status: EventStatus::Pending,
        seller_confirmed: false,
        rating_due_at: None,
        rating_prompts_sent: false,
        created_at: now,
    })
}

pub async fn fetch_event(event_id: i64, conn: &mut SqliteConnection) -> Result<Option<ScheduledEvent>, MarketplaceError> {
    let q = format!("SELECT {EVENT_COLUMNS} FROM scheduled_events WHERE id = $1");
    let event = sqlx::query_as::<_, ScheduledEvent>(&q).bind(event_id).fetch_optional(conn).await?;
    Ok(event)
}

pub async fn fetch_due_events(
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<ScheduledEvent>, MarketplaceError> {
    let q = format!(
        "SELECT {EVENT_COLUMNS} FROM scheduled_events \
         WHERE status = $1 AND datetime(trigger_at) <= datetime($2) \
         ORDER BY datetime(trigger_at) ASC"
    );
    let events = sqlx::query_as::<_, ScheduledEvent>(&q).bind(EventStatus::Pending).bind(now).fetch_all(conn).await?;
    Ok(events)
}

pub async fn fetch_events_in_status(
    status: EventStatus,
    conn: &mut SqliteConnection,
) -> Result<Vec<ScheduledEvent>, MarketplaceError> {
    let q = format!("SELECT {EVENT_COLUMNS} FROM scheduled_events WHERE status = $1 ORDER BY id ASC");
    let events = sqlx::query_as::<_, ScheduledEvent>(&q).bind(status).fetch_all(conn).await?;
    Ok(events)
}

pub async fn set_event_status(
    event_id: i64,
    status: EventStatus,
    conn: &mut SqliteConnection,
) -> Result<(), MarketplaceError> {
    let result = sqlx::query("UPDATE scheduled_events SET status = $1 WHERE id = $2")
        .bind(status)
        .bind(event_id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(MarketplaceError::EventNotFound(event_id));
    }
    Ok(())
}

pub async fn set_seller_confirmed(event_id: i64, conn: &mut SqliteConnection) -> Result<(), MarketplaceError> {
    let result =
        sqlx::query("UPDATE scheduled_events SET seller_confirmed = 1 WHERE id = $1").bind(event_id).execute(conn).await?;
    if result.rows_affected() == 0 {
        return Err(MarketplaceError::EventNotFound(event_id));
    }
    Ok(())
}

pub async fn set_rating_due(
    event_id: i64,
    due_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), MarketplaceError> {
    let result = sqlx::query("UPDATE scheduled_events SET rating_due_at = $1 WHERE id = $2")
        .bind(due_at)
        .bind(event_id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(MarketplaceError::EventNotFound(event_id));
    }
    Ok(())
}

pub async fn mark_rating_prompts_sent(event_id: i64, conn: &mut SqliteConnection) -> Result<(), MarketplaceError> {
    let result = sqlx::query("UPDATE scheduled_events SET rating_prompts_sent = 1 WHERE id = $1")
        .bind(event_id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(MarketplaceError::EventNotFound(event_id));
    }
    Ok(())
}

pub async fn add_participant(
    event_id: i64,
    user: &UserId,
    conn: &mut SqliteConnection,
) -> Result<(), MarketplaceError> {
    sqlx::query("INSERT OR IGNORE INTO event_participants (event_id, user_id) VALUES ($1, $2)")
        .bind(event_id)
        .bind(user)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn fetch_participants(event_id: i64, conn: &mut SqliteConnection) -> Result<Vec<UserId>, MarketplaceError> {
    let users = sqlx::query_scalar::<_, UserId>(
        "SELECT user_id FROM event_participants WHERE event_id = $1 ORDER BY rowid ASC",
    )
    .bind(event_id)
    .fetch_all(conn)
    .await?;
    Ok(users)
}

pub async fn upsert_confirmation(
    event_id: i64,
    user: &UserId,
    role: TradeRole,
    confirmed: bool,
    conn: &mut SqliteConnection,
) -> Result<(), MarketplaceError> {
    sqlx::query(
        r#"
            INSERT INTO event_confirmations (event_id, user_id, role, confirmed)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (event_id, user_id)
            DO UPDATE SET role = excluded.role, confirmed = excluded.confirmed;
        "#,
    )
    .bind(event_id)
    .bind(user)
    .bind(role)
    .bind(confirmed)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch_confirmations(
    event_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<EventConfirmation>, MarketplaceError> {
    let confirmations = sqlx::query_as::<_, EventConfirmation>(
        "SELECT event_id, user_id, role, confirmed FROM event_confirmations WHERE event_id = $1 ORDER BY rowid ASC",
    )
    .bind(event_id)
    .fetch_all(conn)
    .await?;
    Ok(confirmations)
}
