use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewRating, Rating, RatingStatus, ReputationSummary, UserId},
    traits::MarketplaceError,
};

const RATING_COLUMNS: &str = "id, rater, rated, guild, score, comment, status, admin_id, created_at";

pub async fn insert_rating(
    rating: NewRating,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Rating, MarketplaceError> {
    let id: i64 = sqlx::query_scalar(
        r#"
            INSERT INTO ratings (rater, rated, guild, score, comment, status, admin_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id;
        "#,
    )
    .bind(&rating.rater)
    .bind(&rating.rated)
    .bind(&rating.guild)
    .bind(rating.score)
    .bind(&rating.comment)
    .bind(rating.status)
    .bind(&rating.admin_id)
    .bind(now)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Rating #{id} saved ({} stars for {} from {})", rating.score, rating.rated, rating.rater);
    Ok(Rating {
        id,
        rater: rating.rater,
        rated: rating.rated,
        guild: rating.guild,
        score: rating.score,
        comment: rating.comment,
        status: rating.status,
        admin_id: rating.admin_id,
        created_at: now,
    })
}

pub async fn fetch_approved_ratings_for(
    rated: &UserId,
    conn: &mut SqliteConnection,
) -> Result<Vec<Rating>, MarketplaceError> {
    let q = format!(
        "SELECT {RATING_COLUMNS} FROM ratings WHERE rated = $1 AND status = $2 ORDER BY datetime(created_at) ASC"
    );
    let ratings =
        sqlx::query_as::<_, Rating>(&q).bind(rated).bind(RatingStatus::Approved).fetch_all(conn).await?;
    Ok(ratings)
}

pub async fn upsert_reputation_summary(
    user: &UserId,
    avg: f64,
    count: i64,
    conn: &mut SqliteConnection,
) -> Result<ReputationSummary, MarketplaceError> {
    sqlx::query(
        r#"
            INSERT INTO reputation_summaries (user_id, reputation_avg, reputation_count, activity_score)
            VALUES ($1, $2, $3, 0)
            ON CONFLICT (user_id)
            DO UPDATE SET reputation_avg = excluded.reputation_avg, reputation_count = excluded.reputation_count;
        "#,
    )
    .bind(user)
    .bind(avg)
    .bind(count)
    .execute(&mut *conn)
    .await?;
    let summary = fetch_reputation_summary(user, conn).await?;
    // The row was just upserted, so this only trips if someone deletes it concurrently.
    summary.ok_or_else(|| MarketplaceError::DatabaseError(format!("reputation summary for {user} vanished")))
}

pub async fn fetch_reputation_summary(
    user: &UserId,
    conn: &mut SqliteConnection,
) -> Result<Option<ReputationSummary>, MarketplaceError> {
    let summary = sqlx::query_as::<_, ReputationSummary>(
        "SELECT user_id, reputation_avg, reputation_count, activity_score FROM reputation_summaries WHERE user_id = $1",
    )
    .bind(user)
    .fetch_optional(conn)
    .await?;
    Ok(summary)
}
