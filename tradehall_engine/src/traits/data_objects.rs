use serde::{Deserialize, Serialize};

use crate::db_types::{PendingOrder, PendingRating};

/// The result of folding one party's confirmation into a pending order.
///
/// `Completed` carries the pending order out of the repository: the entry is removed in the same critical section
/// that observed the second confirmation, so exactly one caller ever receives it.
#[derive(Debug)]
pub enum ConfirmationOutcome {
    NotFound,
    NotAParty,
    StillPending,
    Completed(PendingOrder),
}

/// The result of recording or resolving a rating entry against an open window.
#[derive(Debug)]
pub enum RatingRecordOutcome {
    Recorded(WindowUpdate),
    WindowMissing,
    NotExpected,
    Duplicate,
}

#[derive(Debug)]
pub struct WindowUpdate {
    /// Raters the window is still waiting on after this update.
    pub outstanding_left: usize,
    /// Set when this update drained the window.
    pub settled: Option<PendingRating>,
}

/// What one scheduler pass did, for the worker's log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    pub events_triggered: usize,
    pub rating_prompts_sent: usize,
    pub events_completed: usize,
    pub reminders_sent: usize,
    pub listings_expired: usize,
}

impl TickReport {
    pub fn is_quiet(&self) -> bool {
        *self == TickReport::default()
    }
}

impl std::fmt::Display for TickReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} triggered, {} rating prompts, {} completed, {} reminders, {} expired",
            self.events_triggered,
            self.rating_prompts_sent,
            self.events_completed,
            self.reminders_sent,
            self.listings_expired
        )
    }
}
