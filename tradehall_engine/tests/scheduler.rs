use chrono::{Duration, Utc};
use tradehall_engine::{
    db_types::{EventStatus, GuildRatingConfig, NewListing, RatingSubject, Side, TradeRole, UserId},
    MarketplaceDatabase,
    NotificationKind,
    RatingDisposition,
    SchedulerConfig,
    SchedulerError,
};

mod support;

const ADMIN_CHANNEL: &str = "trade-log";

#[tokio::test]
async fn expiry_reminder_fires_exactly_once() {
    let harness = support::setup().await;
    let owner = UserId::from("alice");
    let listing = harness
        .orders
        .post_listing(
            NewListing::new(owner.clone(), "guild-1", Side::Sell, "sky", "Hope Torque")
                .with_ttl(Duration::hours(23)),
        )
        .await
        .unwrap();

    let report = harness.scheduler.tick(Utc::now()).await.unwrap();
    assert_eq!(report.reminders_sent, 1);
    assert_eq!(report.listings_expired, 0);
    let notes = harness.notifier.to_user(&owner);
    assert_eq!(notes.len(), 1);
    assert!(notes[0].body.contains("expires"));

    let listing = harness.db.fetch_listing(listing.id).await.unwrap().unwrap();
    assert!(listing.reminded);

    // Repeated ticks stay quiet for this listing.
    let report = harness.scheduler.tick(Utc::now()).await.unwrap();
    assert_eq!(report.reminders_sent, 0);
    assert_eq!(harness.notifier.to_user(&owner).len(), 1);
    harness.tear_down().await;
}

#[tokio::test]
async fn expired_listings_are_deactivated_and_owner_notified() {
    let harness = support::setup().await;
    let owner = UserId::from("alice");
    let listing = harness
        .orders
        .post_listing(
            NewListing::new(owner.clone(), "guild-1", Side::Sell, "sky", "Hope Torque").with_ttl(Duration::hours(1)),
        )
        .await
        .unwrap();

    let later = Utc::now() + Duration::hours(2);
    let report = harness.scheduler.tick(later).await.unwrap();
    assert_eq!(report.listings_expired, 1);

    let listing = harness.db.fetch_listing(listing.id).await.unwrap().unwrap();
    assert!(!listing.active);
    assert!(listing.removed_at.is_some());
    assert!(harness.notifier.to_user(&owner).last().unwrap().body.contains("expired"));

    // Inactive listings are not expired twice.
    let report = harness.scheduler.tick(later).await.unwrap();
    assert_eq!(report.listings_expired, 0);
    harness.tear_down().await;
}

#[tokio::test]
async fn extend_requires_ownership_and_rearms_the_reminder() {
    let harness = support::setup().await;
    let owner = UserId::from("alice");
    let listing = harness
        .orders
        .post_listing(
            NewListing::new(owner.clone(), "guild-1", Side::Sell, "sky", "Hope Torque")
                .with_ttl(Duration::hours(12)),
        )
        .await
        .unwrap();

    let err = harness.scheduler.extend(listing.id, &UserId::from("mallory"), 7).await.unwrap_err();
    assert!(matches!(err, SchedulerError::NotOwner { .. }));

    // Fire the reminder, then extend: the flag clears and the expiry moves out.
    harness.scheduler.tick(Utc::now()).await.unwrap();
    let extended = harness.scheduler.extend(listing.id, &owner, 7).await.unwrap();
    assert!(!extended.reminded);
    let drift = extended.expires_at - (listing.expires_at + Duration::days(7));
    assert!(drift.num_seconds().abs() < 1);

    // Far from expiry again, so no fresh reminder yet.
    let report = harness.scheduler.tick(Utc::now()).await.unwrap();
    assert_eq!(report.reminders_sent, 0);
    harness.tear_down().await;
}

#[tokio::test]
async fn extending_a_missing_listing_fails() {
    let harness = support::setup().await;
    let err = harness.scheduler.extend(999, &UserId::from("alice"), 3).await.unwrap_err();
    assert!(matches!(err, SchedulerError::ListingNotFound(999)));
    harness.tear_down().await;
}

#[tokio::test]
async fn scheduled_event_runs_the_full_confirmation_and_rating_flow() {
    let config = SchedulerConfig {
        reminder_lookahead: Duration::hours(24),
        rating_prompt_delay: Duration::minutes(30),
    };
    let harness = support::setup_with_scheduler_config(config).await;
    harness
        .db
        .upsert_guild_rating_config(GuildRatingConfig {
            guild: "guild-1".to_string(),
            admin_channel: Some(ADMIN_CHANNEL.to_string()),
            low_score_threshold: 3,
        })
        .await
        .unwrap();

    let seller = UserId::from("seller");
    let buyer = UserId::from("buyer");
    let now = Utc::now();
    let listing = harness
        .orders
        .post_listing(
            NewListing::new(seller.clone(), "guild-1", Side::Sell, "sky", "Hope Torque").with_schedule(now),
        )
        .await
        .unwrap();

    let events = harness.db.fetch_events_in_status(EventStatus::Pending).await.unwrap();
    assert_eq!(events.len(), 1);
    let event_id = events[0].id;
    harness.scheduler.join_event(event_id, &buyer).await.unwrap();

    // Trigger: the event starts, the listing leaves the market, both get attendance checks.
    let report = harness.scheduler.tick(now).await.unwrap();
    assert_eq!(report.events_triggered, 1);
    let event = harness.db.fetch_event(event_id).await.unwrap().unwrap();
    assert_eq!(event.status, EventStatus::Started);
    assert!(!harness.db.fetch_listing(listing.id).await.unwrap().unwrap().active);
    for user in [&seller, &buyer] {
        let notes = harness.notifier.to_user(user);
        assert!(matches!(notes.last().unwrap().kind, NotificationKind::AttendanceCheck { .. }));
    }

    harness.scheduler.confirm_attendance(event_id, &seller, TradeRole::Seller, true).await.unwrap();
    harness.scheduler.confirm_attendance(event_id, &buyer, TradeRole::Buyer, true).await.unwrap();

    // First pass after confirmation stamps the delayed due time, but sends nothing yet.
    let report = harness.scheduler.tick(now).await.unwrap();
    assert_eq!(report.rating_prompts_sent, 0);
    let event = harness.db.fetch_event(event_id).await.unwrap().unwrap();
    assert!(event.rating_due_at.is_some());
    assert!(!event.rating_prompts_sent);

    // Once the delay has passed, the confirmed buyer gets the star prompt and the window opens.
    let report = harness.scheduler.tick(now + Duration::minutes(31)).await.unwrap();
    assert_eq!(report.rating_prompts_sent, 1);
    let prompts = harness.notifier.to_user(&buyer);
    assert!(matches!(prompts.last().unwrap().kind, NotificationKind::RatingPrompt { .. }));

    let subject = RatingSubject::Event(event_id);
    let disposition = harness.ratings.submit_rating(&subject, &buyer, &seller, 5, Some("great".into())).await.unwrap();
    assert_eq!(disposition, RatingDisposition::Posted);

    // The settled window becomes a summary in the log channel, and the event closes out.
    let report = harness.scheduler.tick(now + Duration::minutes(32)).await.unwrap();
    assert_eq!(report.events_completed, 1);
    let summaries = harness.notifier.to_channel(ADMIN_CHANNEL);
    assert_eq!(summaries.len(), 1);
    assert!(summaries[0].body.contains("Rating summary"));
    let event = harness.db.fetch_event(event_id).await.unwrap().unwrap();
    assert_eq!(event.status, EventStatus::Completed);
    harness.tear_down().await;
}

#[tokio::test]
async fn rating_prompts_wait_for_seller_and_buyer_confirmation() {
    let harness = support::setup().await;
    let seller = UserId::from("seller");
    let buyer = UserId::from("buyer");
    let now = Utc::now();
    harness
        .orders
        .post_listing(NewListing::new(seller, "guild-1", Side::Sell, "sky", "Hope Torque").with_schedule(now))
        .await
        .unwrap();
    let event_id = harness.db.fetch_events_in_status(EventStatus::Pending).await.unwrap()[0].id;
    harness.scheduler.join_event(event_id, &buyer).await.unwrap();
    harness.scheduler.tick(now).await.unwrap();

    // Only the buyer confirms; without the seller the prompt pipeline stays idle.
    harness.scheduler.confirm_attendance(event_id, &buyer, TradeRole::Buyer, true).await.unwrap();
    let report = harness.scheduler.tick(now + Duration::hours(1)).await.unwrap();
    assert_eq!(report.rating_prompts_sent, 0);
    let event = harness.db.fetch_event(event_id).await.unwrap().unwrap();
    assert!(event.rating_due_at.is_none());
    harness.tear_down().await;
}

#[tokio::test]
async fn attendance_answers_for_unknown_events_fail() {
    let harness = support::setup().await;
    let err = harness
        .scheduler
        .confirm_attendance(404, &UserId::from("alice"), TradeRole::Buyer, true)
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulerError::EventNotFound(404)));
    harness.tear_down().await;
}

#[tokio::test]
async fn summary_is_skipped_without_an_admin_channel() {
    let config = SchedulerConfig {
        reminder_lookahead: Duration::hours(24),
        rating_prompt_delay: Duration::zero(),
    };
    let harness = support::setup_with_scheduler_config(config).await;
    let seller = UserId::from("seller");
    let buyer = UserId::from("buyer");
    let now = Utc::now();
    harness
        .orders
        .post_listing(NewListing::new(seller.clone(), "guild-1", Side::Sell, "sky", "Hope Torque").with_schedule(now))
        .await
        .unwrap();
    let event_id = harness.db.fetch_events_in_status(EventStatus::Pending).await.unwrap()[0].id;
    harness.scheduler.join_event(event_id, &buyer).await.unwrap();
    harness.scheduler.tick(now).await.unwrap();
    harness.scheduler.confirm_attendance(event_id, &seller, TradeRole::Seller, true).await.unwrap();
    harness.scheduler.confirm_attendance(event_id, &buyer, TradeRole::Buyer, true).await.unwrap();
    harness.scheduler.tick(now).await.unwrap();
    let report = harness.scheduler.tick(now + Duration::seconds(1)).await.unwrap();
    assert_eq!(report.rating_prompts_sent, 1);

    harness
        .ratings
        .submit_rating(&RatingSubject::Event(event_id), &buyer, &seller, 4, None)
        .await
        .unwrap();
    let report = harness.scheduler.tick(now + Duration::seconds(2)).await.unwrap();
    // The event still completes; the summary is just quietly skipped.
    assert_eq!(report.events_completed, 1);
    assert!(harness.notifier.deliveries().iter().all(|d| !matches!(d.target, support::Target::Channel(_))));
    let event = harness.db.fetch_event(event_id).await.unwrap().unwrap();
    assert_eq!(event.status, EventStatus::Completed);
    harness.tear_down().await;
}
