use std::fmt::Debug;

use chrono::{DateTime, Duration, Utc};
use log::*;

use crate::{
    db_types::{EventStatus, Listing, PendingRating, RatingSubject, TradeRole, UserId},
    events::{EventProducers, ListingsChangedEvent},
    market_api::errors::SchedulerError,
    traits::{MarketplaceDatabase, Notification, NotificationKind, Notifier, OrderRepository, TickReport},
};

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// How far ahead of expiry the one-shot reminder fires.
    pub reminder_lookahead: Duration,
    /// How long after mutual confirmation the rating prompts go out, leaving room for the in-game trade to happen.
    pub rating_prompt_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { reminder_lookahead: Duration::hours(24), rating_prompt_delay: Duration::minutes(15) }
    }
}

/// `SchedulerApi` owns everything time-driven: triggering scheduled trade events, expiry bookkeeping for listings,
/// and the delayed rating-prompt fan-out for scheduled trades.
///
/// [`Self::tick`] is designed to be called from a single polling task. Every check re-reads persistent state, so a
/// tick that dies halfway (store outage) is simply retried in full on the next interval.
pub struct SchedulerApi<B, R, N> {
    db: B,
    repo: R,
    notifier: N,
    producers: EventProducers,
    config: SchedulerConfig,
}

impl<B, R, N> Debug for SchedulerApi<B, R, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SchedulerApi")
    }
}

impl<B, R, N> SchedulerApi<B, R, N> {
    pub fn new(db: B, repo: R, notifier: N, producers: EventProducers, config: SchedulerConfig) -> Self {
        Self { db, repo, notifier, producers, config }
    }
}

impl<B, R, N> SchedulerApi<B, R, N>
where
    B: MarketplaceDatabase,
    R: OrderRepository,
    N: Notifier,
{
    /// One scheduler pass. The checks run in a fixed order so a single tick can carry an event from "due" all the
    /// way to "participants prompted" across successive calls, never within one call.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<TickReport, SchedulerError> {
        let report = TickReport {
            events_triggered: self.trigger_due_events(now).await?,
            rating_prompts_sent: self.send_rating_prompts(now).await?,
            events_completed: self.close_settled_events().await?,
            reminders_sent: self.send_expiry_reminders(now).await?,
            listings_expired: self.expire_listings(now).await?,
        };
        Ok(report)
    }

    /// Extends an active listing's life by `days` and re-arms its expiry reminder.
    pub async fn extend(&self, listing_id: i64, user: &UserId, days: i64) -> Result<Listing, SchedulerError> {
        let listing = self
            .db
            .fetch_listing(listing_id)
            .await?
            .filter(|l| l.active)
            .ok_or(SchedulerError::ListingNotFound(listing_id))?;
        if &listing.owner != user {
            return Err(SchedulerError::NotOwner { listing_id, user: user.to_string() });
        }
        let listing = self.db.extend_listing(listing_id, days).await?;
        info!("🕰️ Listing #{listing_id} extended by {days} day(s); now expires {}", listing.expires_at);
        Ok(listing)
    }

    /// Records a participant's answer to the post-trigger attendance prompt. Repeat answers overwrite.
    pub async fn confirm_attendance(
        &self,
        event_id: i64,
        user: &UserId,
        role: TradeRole,
        confirmed: bool,
    ) -> Result<(), SchedulerError> {
        let _event =
            self.db.fetch_event(event_id).await?.ok_or(SchedulerError::EventNotFound(event_id))?;
        self.db.upsert_confirmation(event_id, user, role, confirmed).await?;
        if role == TradeRole::Seller && confirmed {
            self.db.set_seller_confirmed(event_id).await?;
        }
        debug!("🕰️ {user} answered the attendance check for event #{event_id} as {role}: {confirmed}");
        Ok(())
    }

    /// Queues a user for a scheduled trade so they get the attendance prompt when it triggers.
    pub async fn join_event(&self, event_id: i64, user: &UserId) -> Result<(), SchedulerError> {
        let _event =
            self.db.fetch_event(event_id).await?.ok_or(SchedulerError::EventNotFound(event_id))?;
        self.db.add_participant(event_id, user).await?;
        Ok(())
    }

    async fn trigger_due_events(&self, now: DateTime<Utc>) -> Result<usize, SchedulerError> {
        let due = self.db.fetch_due_events(now).await?;
        let mut triggered = 0;
        for event in due {
            let Some(listing) = self.db.fetch_listing(event.listing_id).await? else {
                error!("🕰️ Event #{} references listing #{} which does not exist; cancelling it", event.id, event.listing_id);
                self.db.set_event_status(event.id, EventStatus::Cancelled).await?;
                continue;
            };
            self.db.set_event_status(event.id, EventStatus::Started).await?;
            self.db.deactivate_listing(listing.id).await?;
            info!("🕰️ Event #{} triggered for {} in {}", event.id, listing.item, listing.zone);
            let kind = NotificationKind::AttendanceCheck { event_id: event.id };
            let body = format!("Your scheduled trade for {} in {} is starting. Did the trade happen?", listing.item, listing.zone);
            self.notify(&listing.owner, Notification::with_kind(body.clone(), kind.clone())).await;
            for participant in self.db.fetch_participants(event.id).await? {
                self.notify(&participant, Notification::with_kind(body.clone(), kind.clone())).await;
            }
            self.publish_listings_changed(&listing).await;
            triggered += 1;
        }
        Ok(triggered)
    }

    /// Once the seller and at least one buyer have confirmed attendance, stamp a rating due time; when it arrives,
    /// open the event's rating window and prompt every confirmed buyer.
    async fn send_rating_prompts(&self, now: DateTime<Utc>) -> Result<usize, SchedulerError> {
        let started = self.db.fetch_events_in_status(EventStatus::Started).await?;
        let mut sent = 0;
        for event in started.into_iter().filter(|e| !e.rating_prompts_sent) {
            let confirmations = self.db.fetch_confirmations(event.id).await?;
            let buyers = confirmations
                .iter()
                .filter(|c| c.role == TradeRole::Buyer && c.confirmed)
                .map(|c| c.user_id.clone())
                .collect::<Vec<_>>();
            if !event.seller_confirmed || buyers.is_empty() {
                continue;
            }
            match event.rating_due_at {
                None => {
                    let due = now + self.config.rating_prompt_delay;
                    self.db.set_rating_due(event.id, due).await?;
                    debug!("🕰️ Event #{} confirmed; rating prompts due at {due}", event.id);
                },
                Some(due) if now < due => {},
                Some(_) => {
                    let Some(listing) = self.db.fetch_listing(event.listing_id).await? else {
                        error!("🕰️ Event #{} lost its listing before rating prompts went out", event.id);
                        self.db.set_event_status(event.id, EventStatus::Cancelled).await?;
                        continue;
                    };
                    let window = PendingRating::for_event(event.id, &listing, buyers.iter().cloned());
                    self.repo.open_rating_window(window).await?;
                    let kind = NotificationKind::RatingPrompt { subject: RatingSubject::Event(event.id) };
                    let body = format!("How was your trade for {} with {}? Rate it 1-5 stars.", listing.item, listing.owner);
                    for buyer in &buyers {
                        self.notify(buyer, Notification::with_kind(body.clone(), kind.clone())).await;
                    }
                    self.db.mark_rating_prompts_sent(event.id).await?;
                    info!("🕰️ Rating prompts sent to {} buyer(s) for event #{}", buyers.len(), event.id);
                    sent += 1;
                },
            }
        }
        Ok(sent)
    }

    /// Settled event rating windows turn into a summary post (when the guild has a log channel) and a Completed
    /// event record.
    async fn close_settled_events(&self) -> Result<usize, SchedulerError> {
        let settled = self.repo.drain_settled_events().await?;
        let mut completed = 0;
        for window in settled {
            let RatingSubject::Event(event_id) = window.subject else {
                continue;
            };
            let config = self.db.fetch_guild_rating_config(&window.guild).await?;
            match config.admin_channel {
                Some(channel) => {
                    let body = rating_summary(&window, event_id);
                    if !self.notifier.notify_channel(&channel, Notification::plain(body)).await {
                        warn!("🕰️ Could not post the rating summary for event #{event_id} to {channel}");
                    }
                },
                // No admin/log channel configured: skip the summary, not an error.
                None => debug!("🕰️ Guild {} has no admin channel; skipping summary for event #{event_id}", window.guild),
            }
            self.db.set_event_status(event_id, EventStatus::Completed).await?;
            completed += 1;
        }
        Ok(completed)
    }

    async fn send_expiry_reminders(&self, now: DateTime<Utc>) -> Result<usize, SchedulerError> {
        let expiring = self.db.fetch_expiring_soon(now, self.config.reminder_lookahead).await?;
        let mut reminded = 0;
        for listing in expiring {
            let body = format!(
                "Your {} listing for {} in {} expires at {}. Use extend to keep it on the market.",
                listing.side, listing.item, listing.zone, listing.expires_at
            );
            self.notify(&listing.owner, Notification::plain(body)).await;
            self.db.mark_reminded(listing.id).await?;
            reminded += 1;
        }
        Ok(reminded)
    }

    async fn expire_listings(&self, now: DateTime<Utc>) -> Result<usize, SchedulerError> {
        let expired = self.db.fetch_expired(now).await?;
        let mut count = 0;
        for listing in expired {
            self.db.deactivate_listing(listing.id).await?;
            info!("🕰️ Listing #{} ({} in {}) expired", listing.id, listing.item, listing.zone);
            let body = format!("Your {} listing for {} in {} has expired.", listing.side, listing.item, listing.zone);
            self.notify(&listing.owner, Notification::plain(body)).await;
            self.publish_listings_changed(&listing).await;
            count += 1;
        }
        Ok(count)
    }

    async fn notify(&self, user: &UserId, note: Notification) {
        if !self.notifier.notify_user(user, note).await {
            warn!("🕰️ Could not deliver a scheduler notification to {user}");
        }
    }

    async fn publish_listings_changed(&self, listing: &Listing) {
        let event = ListingsChangedEvent {
            guild: listing.guild.clone(),
            zone: listing.zone.clone(),
            side: listing.side,
        };
        for producer in &self.producers.listings_changed {
            producer.publish_event(event.clone()).await;
        }
    }
}

fn rating_summary(window: &PendingRating, event_id: i64) -> String {
    let mut lines = vec![format!(
        "Rating summary for event #{event_id} ({} in {}), seller {}:",
        window.item, window.zone, window.seller
    )];
    if window.entries.is_empty() {
        lines.push("No ratings were recorded.".to_string());
    }
    for (rater, entry) in &window.entries {
        let comment = entry.comment.as_deref().unwrap_or("-");
        lines.push(format!("  {rater} rated {}: {}/5 ({comment})", entry.rated, entry.score));
    }
    lines.join("\n")
}
