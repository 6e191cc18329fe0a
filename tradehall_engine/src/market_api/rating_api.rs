use std::fmt::Debug;

use chrono::Utc;
use log::*;

use crate::{
    db_types::{NewRating, RatingEntry, RatingStatus, RatingSubject, UserId},
    events::{EventProducers, RatingPostedEvent},
    market_api::{errors::RatingError, reputation},
    traits::{MarketplaceDatabase, Notification, NotificationKind, Notifier, OrderRepository, RatingRecordOutcome},
};

/// Where a submitted rating ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingDisposition {
    /// Persisted immediately and already reflected in the rated user's reputation.
    Posted,
    /// Parked in the guild's admin moderation queue; nothing is persisted until an admin rules on it.
    HeldForModeration,
}

/// `RatingApi` collects post-trade ratings, routes low scores through admin moderation, and keeps reputation
/// aggregates in sync.
pub struct RatingApi<B, R, N> {
    db: B,
    repo: R,
    notifier: N,
    producers: EventProducers,
}

impl<B, R, N> Debug for RatingApi<B, R, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RatingApi")
    }
}

impl<B, R, N> RatingApi<B, R, N> {
    pub fn new(db: B, repo: R, notifier: N, producers: EventProducers) -> Self {
        Self { db, repo, notifier, producers }
    }
}

impl<B, R, N> RatingApi<B, R, N>
where
    B: MarketplaceDatabase,
    R: OrderRepository,
    N: Notifier,
{
    /// Submits a rating against an open window.
    ///
    /// Scores below the guild threshold are held for admin review when the guild has an admin channel configured;
    /// everything else posts immediately. A single bad-faith one-star can therefore never dent a seller's record
    /// without an admin seeing it first, while good ratings post without friction.
    pub async fn submit_rating(
        &self,
        subject: &RatingSubject,
        rater: &UserId,
        rated: &UserId,
        score: i64,
        comment: Option<String>,
    ) -> Result<RatingDisposition, RatingError> {
        if !(1..=5).contains(&score) {
            return Err(RatingError::InvalidScore(score));
        }
        let window = self
            .repo
            .fetch_rating_window(subject)
            .await?
            .ok_or_else(|| RatingError::NoSuchPendingRating(subject.clone()))?;
        let config = self.db.fetch_guild_rating_config(&window.guild).await?;
        let moderated = score < config.low_score_threshold && config.admin_channel.is_some();
        let entry =
            RatingEntry { rated: rated.clone(), score, comment: comment.clone(), held: moderated, created_at: Utc::now() };
        match self.repo.record_rating_entry(subject, rater, entry).await? {
            RatingRecordOutcome::WindowMissing => return Err(RatingError::NoSuchPendingRating(subject.clone())),
            RatingRecordOutcome::NotExpected => {
                return Err(RatingError::NotExpectedRater { subject: subject.clone(), rater: rater.to_string() })
            },
            RatingRecordOutcome::Duplicate => {
                return Err(RatingError::DuplicateRating { subject: subject.clone(), rater: rater.to_string() })
            },
            RatingRecordOutcome::Recorded(_) => {},
        }
        if moderated {
            // record_rating_entry only reports `held` entries as recorded when the channel check above passed.
            let channel = config.admin_channel.as_deref().unwrap_or_default();
            info!("⭐️ Rating for {rated} by {rater} ({score} stars) held for moderation in guild {}", window.guild);
            let kind = NotificationKind::ModerationTicket {
                subject: subject.clone(),
                rater: rater.clone(),
                rated: rated.clone(),
                score,
            };
            let body = format!(
                "{rater} rated {rated} {score}/5 for {} in {}: {}",
                window.item,
                window.zone,
                comment.as_deref().unwrap_or("(no comment)")
            );
            if !self.notifier.notify_channel(channel, Notification::with_kind(body, kind)).await {
                warn!("⭐️ Could not deliver a moderation ticket to channel {channel}");
            }
            return Ok(RatingDisposition::HeldForModeration);
        }
        self.persist_rating(&window.guild, rater, rated, score, comment, None).await?;
        Ok(RatingDisposition::Posted)
    }

    /// Applies an admin's verdict on a held rating. Approval persists the rating and recomputes reputation;
    /// rejection discards it without trace. Either verdict closes the rater's slot in the window.
    pub async fn resolve_moderation(
        &self,
        subject: &RatingSubject,
        rater: &UserId,
        rated: &UserId,
        score: i64,
        comment: Option<String>,
        approved: bool,
        admin: &UserId,
    ) -> Result<(), RatingError> {
        // Capture the guild before resolving; resolution may settle and drop the window.
        let window = self
            .repo
            .fetch_rating_window(subject)
            .await?
            .ok_or_else(|| RatingError::NoSuchPendingRating(subject.clone()))?;
        match self.repo.resolve_rating_entry(subject, rater, approved).await? {
            RatingRecordOutcome::WindowMissing => return Err(RatingError::NoSuchPendingRating(subject.clone())),
            RatingRecordOutcome::NotExpected | RatingRecordOutcome::Duplicate => {
                return Err(RatingError::NotExpectedRater { subject: subject.clone(), rater: rater.to_string() })
            },
            RatingRecordOutcome::Recorded(_) => {},
        }
        if approved {
            info!("⭐️ Admin {admin} approved the {score}-star rating for {rated} by {rater}");
            self.persist_rating(&window.guild, rater, rated, score, comment, Some(admin.clone())).await?;
        } else {
            info!("⭐️ Admin {admin} rejected the {score}-star rating for {rated} by {rater}");
        }
        Ok(())
    }

    async fn persist_rating(
        &self,
        guild: &str,
        rater: &UserId,
        rated: &UserId,
        score: i64,
        comment: Option<String>,
        admin: Option<UserId>,
    ) -> Result<(), RatingError> {
        let rating = NewRating {
            rater: rater.clone(),
            rated: rated.clone(),
            guild: guild.to_string(),
            score,
            comment,
            status: RatingStatus::Approved,
            admin_id: admin,
        };
        let rating = self.db.insert_rating(rating).await?;
        let summary = reputation::recompute(&self.db, rated).await?;
        debug!("⭐️ {rated} now has {} rating(s) averaging {:.2}", summary.reputation_count, summary.reputation_avg);
        for producer in &self.producers.rating_posted {
            producer.publish_event(RatingPostedEvent { rating: rating.clone() }).await;
        }
        Ok(())
    }
}
