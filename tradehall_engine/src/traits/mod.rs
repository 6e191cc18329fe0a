//! Interface contracts between the engine and its collaborators.
//!
//! * [`MarketplaceDatabase`] is the persistent-store contract. The engine never issues SQL itself; backends implement
//!   this trait. A SQLite backend ships with the crate.
//! * [`OrderRepository`] is the contract for the pending, not-yet-persistent handshake state (pending orders and open
//!   rating windows). The shipped implementation is in-memory, which means in-flight proposals die with the process.
//!   The trait boundary keeps that limitation explicit and lets a durable implementation slot in without touching
//!   callers.
//! * [`Notifier`] abstracts message delivery to the chat platform. Delivery failure is reported, never raised.

mod data_objects;
mod marketplace_database;
mod notifier;
mod order_repository;

pub use data_objects::{ConfirmationOutcome, RatingRecordOutcome, TickReport, WindowUpdate};
pub use marketplace_database::{MarketplaceDatabase, MarketplaceError};
pub use notifier::{Notification, NotificationKind, Notifier};
pub use order_repository::OrderRepository;
