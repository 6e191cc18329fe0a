use std::{collections::HashSet, fmt::Display, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

pub const ALL_ITEMS: &str = "All Items";
pub const DEFAULT_LISTING_TTL_DAYS: i64 = 7;

//--------------------------------------      UserId        ----------------------------------------------------------
/// A lightweight wrapper around the chat platform's user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct UserId(pub String);

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<S: Into<String>> From<S> for UserId {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------      OrderId       ----------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------        Side        ----------------------------------------------------------
/// Which side of the market a listing or request is on. Replaces the free-text "WTS"/"WTB" tags with a closed type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum Side {
    Sell,
    Buy,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Sell => Side::Buy,
            Side::Buy => Side::Sell,
        }
    }
}

impl Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Sell => write!(f, "Sell"),
            Side::Buy => write!(f, "Buy"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid market side: {0}")]
pub struct SideConversionError(String);

impl FromStr for Side {
    type Err = SideConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Sell" => Ok(Self::Sell),
            "Buy" => Ok(Self::Buy),
            s => Err(SideConversionError(s.to_string())),
        }
    }
}

//--------------------------------------     TradeRole      ----------------------------------------------------------
/// The role a user plays in a given trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum TradeRole {
    Seller,
    Buyer,
}

impl Display for TradeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeRole::Seller => write!(f, "Seller"),
            TradeRole::Buyer => write!(f, "Buyer"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid trade role: {0}")]
pub struct TradeRoleConversionError(String);

impl FromStr for TradeRole {
    type Err = TradeRoleConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Seller" => Ok(Self::Seller),
            "Buyer" => Ok(Self::Buyer),
            s => Err(TradeRoleConversionError(s.to_string())),
        }
    }
}

//--------------------------------------      Listing       ----------------------------------------------------------
/// A standing offer to sell or buy a specific item in a specific zone.
///
/// Listings are never hard-deleted. Exactly one of `active` / "soft-deleted with `removed_at`" holds at any time.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Listing {
    pub id: i64,
    pub owner: UserId,
    pub guild: String,
    pub side: Side,
    pub zone: String,
    pub subcategory: String,
    pub item: String,
    pub quantity: i64,
    pub notes: Option<String>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub active: bool,
    pub reminded: bool,
    pub removed_at: Option<DateTime<Utc>>,
}

impl Listing {
    /// True when this listing satisfies a request for `item`, either by case-insensitive equality or because the
    /// listing offers the "All Items" sentinel.
    pub fn matches_item(&self, item: &str) -> bool {
        self.item == ALL_ITEMS || self.item.eq_ignore_ascii_case(item)
    }
}

//--------------------------------------     NewListing     ----------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewListing {
    pub owner: UserId,
    pub guild: String,
    pub side: Side,
    pub zone: String,
    pub subcategory: String,
    pub item: String,
    pub quantity: i64,
    pub notes: Option<String>,
    pub scheduled_for: Option<DateTime<Utc>>,
    /// How long the listing stays on the market before expiring.
    pub ttl: Duration,
}

impl NewListing {
    pub fn new(owner: UserId, guild: impl Into<String>, side: Side, zone: impl Into<String>, item: impl Into<String>) -> Self {
        Self {
            owner,
            guild: guild.into(),
            side,
            zone: zone.into(),
            subcategory: String::new(),
            item: item.into(),
            quantity: 1,
            notes: None,
            scheduled_for: None,
            ttl: Duration::days(DEFAULT_LISTING_TTL_DAYS),
        }
    }

    pub fn with_subcategory(mut self, subcategory: impl Into<String>) -> Self {
        self.subcategory = subcategory.into();
        self
    }

    pub fn with_quantity(mut self, quantity: i64) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_schedule(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_for = Some(at);
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

//--------------------------------------    PendingOrder    ----------------------------------------------------------
/// A proposed match between a buy request and a sell listing, awaiting mutual confirmation.
///
/// Pending orders live only in the order repository. A process restart drops any in-flight proposals; the repository
/// trait exists so that a durable implementation can be swapped in without touching the callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOrder {
    pub order_id: OrderId,
    pub guild: String,
    pub buyer: UserId,
    pub seller: UserId,
    pub item: String,
    pub zone: String,
    pub quantity: i64,
    pub notes: Option<String>,
    pub listing_id: i64,
    pub confirmed_by: HashSet<UserId>,
    pub created_at: DateTime<Utc>,
}

impl PendingOrder {
    pub fn is_party(&self, user: &UserId) -> bool {
        &self.buyer == user || &self.seller == user
    }

    pub fn counterparty(&self, user: &UserId) -> Option<&UserId> {
        if user == &self.buyer {
            Some(&self.seller)
        } else if user == &self.seller {
            Some(&self.buyer)
        } else {
            None
        }
    }
}

//--------------------------------------   RatingSubject    ----------------------------------------------------------
/// What a rating window is attached to: an ad-hoc order or a scheduled event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RatingSubject {
    Order(OrderId),
    Event(i64),
}

impl Display for RatingSubject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RatingSubject::Order(id) => write!(f, "order:{}", id.as_str()),
            RatingSubject::Event(id) => write!(f, "event:{id}"),
        }
    }
}

//--------------------------------------    RatingEntry     ----------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingEntry {
    pub rated: UserId,
    pub score: i64,
    pub comment: Option<String>,
    /// True while the entry is parked in the admin moderation queue.
    pub held: bool,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------   PendingRating    ----------------------------------------------------------
/// The open rating window for a completed order or a triggered event.
///
/// `outstanding` is the set of raters the window is still waiting on. Each submission or moderation verdict shrinks
/// it; the window settles when it drains.
#[derive(Debug, Clone)]
pub struct PendingRating {
    pub subject: RatingSubject,
    pub guild: String,
    pub seller: UserId,
    pub item: String,
    pub zone: String,
    pub outstanding: HashSet<UserId>,
    pub entries: std::collections::HashMap<UserId, RatingEntry>,
}

impl PendingRating {
    /// The rating window for a completed ad-hoc order: buyer and seller each rate the other.
    pub fn for_order(order: &PendingOrder) -> Self {
        let outstanding = HashSet::from([order.buyer.clone(), order.seller.clone()]);
        Self {
            subject: RatingSubject::Order(order.order_id.clone()),
            guild: order.guild.clone(),
            seller: order.seller.clone(),
            item: order.item.clone(),
            zone: order.zone.clone(),
            outstanding,
            entries: std::collections::HashMap::new(),
        }
    }

    /// The rating window for a triggered scheduled event: every confirmed buyer rates the seller.
    pub fn for_event(event_id: i64, listing: &Listing, raters: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            subject: RatingSubject::Event(event_id),
            guild: listing.guild.clone(),
            seller: listing.owner.clone(),
            item: listing.item.clone(),
            zone: listing.zone.clone(),
            outstanding: raters.into_iter().collect(),
            entries: std::collections::HashMap::new(),
        }
    }

    pub fn is_settled(&self) -> bool {
        self.outstanding.is_empty()
    }
}

//-------------------------------------- TransactionStatus  ----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum TransactionStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "Pending"),
            TransactionStatus::Confirmed => write!(f, "Confirmed"),
            TransactionStatus::Completed => write!(f, "Completed"),
            TransactionStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

//--------------------------------------    Transaction     ----------------------------------------------------------
/// Append-only record of a completed or cancelled trade.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub listing_id: Option<i64>,
    pub seller: UserId,
    pub buyer: UserId,
    pub item: String,
    pub zone: String,
    pub quantity: i64,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

//--------------------------------------   NewTransaction   ----------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub listing_id: Option<i64>,
    pub seller: UserId,
    pub buyer: UserId,
    pub item: String,
    pub zone: String,
    pub quantity: i64,
    pub status: TransactionStatus,
}

impl NewTransaction {
    pub fn completed_from(order: &PendingOrder) -> Self {
        Self {
            listing_id: Some(order.listing_id),
            seller: order.seller.clone(),
            buyer: order.buyer.clone(),
            item: order.item.clone(),
            zone: order.zone.clone(),
            quantity: order.quantity,
            status: TransactionStatus::Completed,
        }
    }
}

//--------------------------------------    RatingStatus    ----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum RatingStatus {
    Pending,
    Approved,
    Rejected,
}

impl Display for RatingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RatingStatus::Pending => write!(f, "Pending"),
            RatingStatus::Approved => write!(f, "Approved"),
            RatingStatus::Rejected => write!(f, "Rejected"),
        }
    }
}

//--------------------------------------       Rating       ----------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Rating {
    pub id: i64,
    pub rater: UserId,
    pub rated: UserId,
    pub guild: String,
    pub score: i64,
    pub comment: Option<String>,
    pub status: RatingStatus,
    pub admin_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------     NewRating      ----------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewRating {
    pub rater: UserId,
    pub rated: UserId,
    pub guild: String,
    pub score: i64,
    pub comment: Option<String>,
    pub status: RatingStatus,
    pub admin_id: Option<UserId>,
}

//-------------------------------------- ReputationSummary  ----------------------------------------------------------
/// Derived aggregate. Recomputed after every accepted rating, never hand-edited.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ReputationSummary {
    pub user_id: UserId,
    pub reputation_avg: f64,
    pub reputation_count: i64,
    pub activity_score: f64,
}

//--------------------------------------    EventStatus     ----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum EventStatus {
    Pending,
    Started,
    Completed,
    Cancelled,
}

impl Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventStatus::Pending => write!(f, "Pending"),
            EventStatus::Started => write!(f, "Started"),
            EventStatus::Completed => write!(f, "Completed"),
            EventStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl From<String> for EventStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Pending" => Self::Pending,
            "Started" => Self::Started,
            "Completed" => Self::Completed,
            "Cancelled" => Self::Cancelled,
            s => {
                error!("🗃️ Invalid event status in the database: {s}. Defaulting to Cancelled.");
                Self::Cancelled
            },
        }
    }
}

//--------------------------------------   ScheduledEvent   ----------------------------------------------------------
/// A listing-attached future trade time that the scheduler polls for.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ScheduledEvent {
    pub id: i64,
    pub listing_id: i64,
    pub trigger_at: DateTime<Utc>,
    pub status: EventStatus,
    pub seller_confirmed: bool,
    pub rating_due_at: Option<DateTime<Utc>>,
    pub rating_prompts_sent: bool,
    pub created_at: DateTime<Utc>,
}

//-------------------------------------- EventConfirmation  ----------------------------------------------------------
/// A participant's answer to the post-trigger "did this trade happen?" prompt. Unique per (event, user).
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct EventConfirmation {
    pub event_id: i64,
    pub user_id: UserId,
    pub role: TradeRole,
    pub confirmed: bool,
}

//-------------------------------------- GuildRatingConfig  ----------------------------------------------------------
/// Per-guild moderation settings. A missing row behaves as the defaults with no admin channel.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct GuildRatingConfig {
    pub guild: String,
    pub admin_channel: Option<String>,
    pub low_score_threshold: i64,
}

pub const DEFAULT_LOW_SCORE_THRESHOLD: i64 = 3;

impl GuildRatingConfig {
    pub fn defaults_for(guild: impl Into<String>) -> Self {
        Self { guild: guild.into(), admin_channel: None, low_score_threshold: DEFAULT_LOW_SCORE_THRESHOLD }
    }
}
