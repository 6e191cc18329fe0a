use serde::{Deserialize, Serialize};

use crate::db_types::{OrderId, RatingSubject, UserId};

/// Message delivery to the chat platform.
///
/// Delivery is best-effort by contract: implementations return `false` for permission-denied or unreachable
/// recipients and never raise. State transitions in the engine must not depend on delivery succeeding.
#[allow(async_fn_in_trait)]
pub trait Notifier: Clone + Send + Sync {
    async fn notify_user(&self, user: &UserId, note: Notification) -> bool;

    async fn notify_channel(&self, channel: &str, note: Notification) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub body: String,
    pub kind: NotificationKind,
}

impl Notification {
    pub fn plain(body: impl Into<String>) -> Self {
        Self { body: body.into(), kind: NotificationKind::Plain }
    }

    pub fn with_kind(body: impl Into<String>, kind: NotificationKind) -> Self {
        Self { body: body.into(), kind }
    }
}

/// The interactive affordance a notification carries. The presentation layer renders these as buttons/dropdowns and
/// answers them by calling back into the engine API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    Plain,
    /// Confirm-or-decline buttons for a proposed order.
    ConfirmDecline { order_id: OrderId },
    /// A 1-5 star rating prompt for a completed trade.
    RatingPrompt { subject: RatingSubject },
    /// "Did this trade happen?" prompt after a scheduled event triggers.
    AttendanceCheck { event_id: i64 },
    /// A low-score rating awaiting an admin verdict.
    ModerationTicket { subject: RatingSubject, rater: UserId, rated: UserId, score: i64 },
}
