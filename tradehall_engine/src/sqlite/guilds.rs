use sqlx::SqliteConnection;

use crate::{db_types::GuildRatingConfig, traits::MarketplaceError};

/// A guild that has never been configured behaves as the defaults: no admin channel, threshold 3.
pub async fn fetch_guild_rating_config(
    guild: &str,
    conn: &mut SqliteConnection,
) -> Result<GuildRatingConfig, MarketplaceError> {
    let config = sqlx::query_as::<_, GuildRatingConfig>(
        "SELECT guild, admin_channel, low_score_threshold FROM guild_rating_configs WHERE guild = $1",
    )
    .bind(guild)
    .fetch_optional(conn)
    .await?;
    Ok(config.unwrap_or_else(|| GuildRatingConfig::defaults_for(guild)))
}

pub async fn upsert_guild_rating_config(
    config: GuildRatingConfig,
    conn: &mut SqliteConnection,
) -> Result<(), MarketplaceError> {
    sqlx::query(
        r#"
            INSERT INTO guild_rating_configs (guild, admin_channel, low_score_threshold)
            VALUES ($1, $2, $3)
            ON CONFLICT (guild)
            DO UPDATE SET admin_channel = excluded.admin_channel, low_score_threshold = excluded.low_score_threshold;
        "#,
    )
    .bind(&config.guild)
    .bind(&config.admin_channel)
    .bind(config.low_score_threshold)
    .execute(conn)
    .await?;
    Ok(())
}
