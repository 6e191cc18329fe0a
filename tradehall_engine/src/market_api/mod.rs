//! # Tradehall engine public API
//!
//! The `market_api` module exposes the programmatic API for the marketplace engine. The API is modular: the
//! presentation layer can pick the pieces it needs, and each piece is generic over the backend traits.
//!
//! * [`matcher`] finds opposite-side listings for an incoming buy/sell request.
//! * [`order_flow_api`] drives the order lifecycle: propose, confirm/decline, complete.
//! * [`rating_api`] collects ratings, routes low scores through admin moderation, and maintains reputation.
//! * [`scheduler_api`] is the time-driven side: scheduled trade events, expiry reminders, listing expiry.
//! * [`reputation`] holds the aggregate recomputation and the composite trader score.
//!
//! # API usage
//!
//! The pattern is the same throughout: construct an API instance from a database backend, a pending-state
//! repository, a notifier and the event producers.
//!
//! ```rust,ignore
//! use tradehall_engine::{InMemoryOrderRepository, OrderFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://tradehall.db", 5).await?;
//! let repo = InMemoryOrderRepository::new();
//! let api = OrderFlowApi::new(db, repo, notifier, producers);
//! let order_id = api.request_match(&user, "guild-1", Side::Buy, "sky", "Hope Torque").await?;
//! ```

pub mod errors;
pub mod matcher;
pub mod order_flow_api;
pub mod rating_api;
pub mod reputation;
pub mod scheduler_api;
