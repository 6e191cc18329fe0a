use serde::{Deserialize, Serialize};

use crate::db_types::{PendingOrder, Rating, Side, Transaction};

/// A match was proposed and both parties were asked to confirm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderProposedEvent {
    pub order: PendingOrder,
}

impl OrderProposedEvent {
    pub fn new(order: PendingOrder) -> Self {
        Self { order }
    }
}

/// Both parties confirmed; the trade is recorded and the rating window is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderCompletedEvent {
    pub order: PendingOrder,
    pub transaction: Transaction,
}

/// One party declined the proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDeclinedEvent {
    pub order: PendingOrder,
    pub declined_by: crate::db_types::UserId,
    pub reason: String,
}

/// An approved rating was persisted and the rated user's reputation recomputed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingPostedEvent {
    pub rating: Rating,
}

/// The set of active listings for a zone/side changed; marketplace views should refresh.
///
/// This replaces the fire-and-forget refresh tasks of the original system with an explicit outbound message, so
/// delivery and ordering policy live with the subscriber rather than in detached task scheduling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingsChangedEvent {
    pub guild: String,
    pub zone: String,
    pub side: Side,
}
