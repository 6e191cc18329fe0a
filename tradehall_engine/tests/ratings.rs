use tradehall_engine::{
    db_types::{GuildRatingConfig, NewListing, OrderId, RatingSubject, Side, UserId},
    reputation,
    ConfirmResult,
    MarketplaceDatabase,
    NotificationKind,
    OrderRepository,
    RatingDisposition,
    RatingError,
};

mod support;

const ADMIN_CHANNEL: &str = "mod-queue";

async fn complete_an_order(harness: &support::TestHarness) -> OrderId {
    harness
        .orders
        .post_listing(NewListing::new(UserId::from("seller"), "guild-1", Side::Sell, "sky", "Hope Torque"))
        .await
        .unwrap();
    let order_id = harness
        .orders
        .request_match(&UserId::from("buyer"), "guild-1", Side::Buy, "sky", "Hope Torque")
        .await
        .unwrap()
        .unwrap();
    harness.orders.confirm(&order_id, &UserId::from("buyer")).await.unwrap();
    let done = harness.orders.confirm(&order_id, &UserId::from("seller")).await.unwrap();
    assert_eq!(done, ConfirmResult::Completed);
    order_id
}

async fn configure_moderation(harness: &support::TestHarness) {
    let config = GuildRatingConfig {
        guild: "guild-1".to_string(),
        admin_channel: Some(ADMIN_CHANNEL.to_string()),
        low_score_threshold: 3,
    };
    harness.db.upsert_guild_rating_config(config).await.unwrap();
}

#[tokio::test]
async fn high_scores_post_immediately() {
    let harness = support::setup().await;
    configure_moderation(&harness).await;
    let order_id = complete_an_order(&harness).await;
    let subject = RatingSubject::Order(order_id);

    let disposition = harness
        .ratings
        .submit_rating(&subject, &UserId::from("buyer"), &UserId::from("seller"), 4, Some("smooth trade".into()))
        .await
        .unwrap();
    assert_eq!(disposition, RatingDisposition::Posted);

    let ratings = harness.db.fetch_approved_ratings_for(&UserId::from("seller")).await.unwrap();
    assert_eq!(ratings.len(), 1);
    assert_eq!(ratings[0].score, 4);
    // No moderation ticket went anywhere.
    assert!(harness.notifier.to_channel(ADMIN_CHANNEL).is_empty());

    // Reputation is already up to date.
    let summary = harness.db.fetch_reputation_summary(&UserId::from("seller")).await.unwrap().unwrap();
    assert_eq!(summary.reputation_count, 1);
    assert!((summary.reputation_avg - 4.0).abs() < f64::EPSILON);
    harness.tear_down().await;
}

#[tokio::test]
async fn low_scores_are_held_for_moderation() {
    let harness = support::setup().await;
    configure_moderation(&harness).await;
    let order_id = complete_an_order(&harness).await;
    let subject = RatingSubject::Order(order_id);
    let buyer = UserId::from("buyer");
    let seller = UserId::from("seller");

    let disposition =
        harness.ratings.submit_rating(&subject, &buyer, &seller, 2, Some("slow to respond".into())).await.unwrap();
    assert_eq!(disposition, RatingDisposition::HeldForModeration);

    // Nothing persisted yet, but the admin channel has the ticket.
    assert!(harness.db.fetch_approved_ratings_for(&seller).await.unwrap().is_empty());
    let tickets = harness.notifier.to_channel(ADMIN_CHANNEL);
    assert_eq!(tickets.len(), 1);
    assert!(matches!(tickets[0].kind, NotificationKind::ModerationTicket { score: 2, .. }));

    // Approval persists the rating and records the admin.
    harness
        .ratings
        .resolve_moderation(&subject, &buyer, &seller, 2, Some("slow to respond".into()), true, &UserId::from("admin"))
        .await
        .unwrap();
    let ratings = harness.db.fetch_approved_ratings_for(&seller).await.unwrap();
    assert_eq!(ratings.len(), 1);
    assert_eq!(ratings[0].admin_id, Some(UserId::from("admin")));
    harness.tear_down().await;
}

#[tokio::test]
async fn rejected_moderation_leaves_no_trace() {
    let harness = support::setup().await;
    configure_moderation(&harness).await;
    let order_id = complete_an_order(&harness).await;
    let subject = RatingSubject::Order(order_id);
    let buyer = UserId::from("buyer");
    let seller = UserId::from("seller");

    harness.ratings.submit_rating(&subject, &buyer, &seller, 1, Some("bad".into())).await.unwrap();
    harness
        .ratings
        .resolve_moderation(&subject, &buyer, &seller, 1, Some("bad".into()), false, &UserId::from("admin"))
        .await
        .unwrap();

    // No rating row was ever created, and the buyer's slot in the window is closed.
    assert!(harness.db.fetch_approved_ratings_for(&seller).await.unwrap().is_empty());
    let window = harness.repo.fetch_rating_window(&subject).await.unwrap().unwrap();
    assert!(!window.outstanding.contains(&buyer));
    assert!(!window.entries.contains_key(&buyer));

    // The seller's own rating still settles the window normally.
    harness.ratings.submit_rating(&subject, &seller, &buyer, 5, None).await.unwrap();
    assert!(harness.repo.fetch_rating_window(&subject).await.unwrap().is_none());
    harness.tear_down().await;
}

#[tokio::test]
async fn low_scores_post_directly_when_no_admin_channel_is_configured() {
    let harness = support::setup().await;
    // No guild config at all: defaults apply, and the moderation route is unavailable.
    let order_id = complete_an_order(&harness).await;
    let subject = RatingSubject::Order(order_id);

    let disposition = harness
        .ratings
        .submit_rating(&subject, &UserId::from("buyer"), &UserId::from("seller"), 1, None)
        .await
        .unwrap();
    assert_eq!(disposition, RatingDisposition::Posted);
    assert_eq!(harness.db.fetch_approved_ratings_for(&UserId::from("seller")).await.unwrap().len(), 1);
    harness.tear_down().await;
}

#[tokio::test]
async fn invalid_and_duplicate_submissions_are_rejected() {
    let harness = support::setup().await;
    let order_id = complete_an_order(&harness).await;
    let subject = RatingSubject::Order(order_id);
    let buyer = UserId::from("buyer");
    let seller = UserId::from("seller");

    for score in [0, 6, -3] {
        let err = harness.ratings.submit_rating(&subject, &buyer, &seller, score, None).await.unwrap_err();
        assert!(matches!(err, RatingError::InvalidScore(_)));
    }

    harness.ratings.submit_rating(&subject, &buyer, &seller, 5, None).await.unwrap();
    let err = harness.ratings.submit_rating(&subject, &buyer, &seller, 4, None).await.unwrap_err();
    assert!(matches!(err, RatingError::DuplicateRating { .. }));

    // A stranger to the trade cannot rate it.
    let err = harness.ratings.submit_rating(&subject, &UserId::from("mallory"), &seller, 5, None).await.unwrap_err();
    assert!(matches!(err, RatingError::NotExpectedRater { .. }));
    harness.tear_down().await;
}

#[tokio::test]
async fn recompute_is_idempotent() {
    let harness = support::setup().await;
    let order_id = complete_an_order(&harness).await;
    let subject = RatingSubject::Order(order_id);
    let seller = UserId::from("seller");
    harness.ratings.submit_rating(&subject, &UserId::from("buyer"), &seller, 3, None).await.unwrap();

    let first = reputation::recompute(&harness.db, &seller).await.unwrap();
    let second = reputation::recompute(&harness.db, &seller).await.unwrap();
    assert_eq!(first.reputation_count, second.reputation_count);
    assert!((first.reputation_avg - second.reputation_avg).abs() < f64::EPSILON);
    harness.tear_down().await;
}

#[tokio::test]
async fn ratings_need_an_open_window() {
    let harness = support::setup().await;
    let subject = RatingSubject::Order(OrderId::from("never-existed".to_string()));
    let err = harness
        .ratings
        .submit_rating(&subject, &UserId::from("buyer"), &UserId::from("seller"), 5, None)
        .await
        .unwrap_err();
    assert!(matches!(err, RatingError::NoSuchPendingRating(_)));
    harness.tear_down().await;
}
