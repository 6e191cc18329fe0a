//! Tradehall Engine
//!
//! The Tradehall engine is the order-lifecycle core of a community marketplace bot: users post want-to-sell /
//! want-to-buy listings scoped to zones and items, get matched against the opposite side, confirm trades through a
//! two-party handshake, and rate each other afterwards. This library contains that core. It is
//! presentation-agnostic: the chat platform, permission checks and catalog data all live behind small traits.
//!
//! The library is divided into three main sections:
//! 1. Backend contracts and state ([`traits`], [`mod@sqlite`], [`mem`]). The persistent store is reached through the
//!    [`MarketplaceDatabase`] trait (a SQLite implementation ships with the crate), and the in-flight handshake
//!    state lives behind [`OrderRepository`] (in-memory; a restart drops pending proposals by design).
//! 2. The public API ([`market_api`]): matching, the order confirmation flow, rating collection with moderation,
//!    the time-driven scheduler, and reputation scoring.
//! 3. Engine events ([`events`]): a simple hook system for reacting to proposals, completions, declines, posted
//!    ratings and market refreshes without coupling the state machine to any UI.

pub mod db_types;
pub mod events;
pub mod helpers;
pub mod market_api;
pub mod mem;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;

pub use market_api::{
    errors::{OrderFlowError, RatingError, SchedulerError},
    matcher::Matcher,
    order_flow_api::{ConfirmResult, OrderFlowApi},
    rating_api::{RatingApi, RatingDisposition},
    reputation,
    scheduler_api::{SchedulerApi, SchedulerConfig},
};
pub use mem::InMemoryOrderRepository;
pub use traits::{
    MarketplaceDatabase,
    MarketplaceError,
    Notification,
    NotificationKind,
    Notifier,
    OrderRepository,
    TickReport,
};
