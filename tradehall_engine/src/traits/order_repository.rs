use crate::{
    db_types::{OrderId, PendingOrder, PendingRating, RatingEntry, RatingSubject, UserId},
    traits::{ConfirmationOutcome, MarketplaceError, RatingRecordOutcome},
};

/// The contract for pending handshake state: orders awaiting confirmation and open rating windows.
///
/// The shipped implementation keeps everything in process memory, so a restart silently drops in-flight proposals and
/// unsubmitted ratings. That is a known limitation of the system, not an accident; this trait is the seam where a
/// durable implementation would go.
///
/// Implementations must make [`Self::record_confirmation`] atomic per order id: two parties confirming
/// near-simultaneously must produce exactly one `Completed` outcome, never zero or two.
#[allow(async_fn_in_trait)]
pub trait OrderRepository: Clone + Send + Sync {
    //----------------------------------------Pending orders----------------------------------------------------------

    async fn insert_order(&self, order: PendingOrder) -> Result<(), MarketplaceError>;

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<PendingOrder>, MarketplaceError>;

    /// Adds `user` to the order's confirmation set and checks for completion in one atomic step. When both parties
    /// are present the entry is removed and returned inside [`ConfirmationOutcome::Completed`].
    async fn record_confirmation(
        &self,
        order_id: &OrderId,
        user: &UserId,
    ) -> Result<ConfirmationOutcome, MarketplaceError>;

    /// Removes and returns the pending order, if present. Used by the decline path.
    async fn remove_order(&self, order_id: &OrderId) -> Result<Option<PendingOrder>, MarketplaceError>;

    //----------------------------------------Rating windows----------------------------------------------------------

    async fn open_rating_window(&self, window: PendingRating) -> Result<(), MarketplaceError>;

    async fn fetch_rating_window(&self, subject: &RatingSubject) -> Result<Option<PendingRating>, MarketplaceError>;

    /// Records a rater's entry. A held entry (moderation queue) keeps the rater in the outstanding set; a direct
    /// entry removes them. Settling windows are removed from the open table; settled event windows are additionally
    /// parked for [`Self::drain_settled_events`].
    async fn record_rating_entry(
        &self,
        subject: &RatingSubject,
        rater: &UserId,
        entry: RatingEntry,
    ) -> Result<RatingRecordOutcome, MarketplaceError>;

    /// Applies a moderation verdict to a held entry. Either verdict removes the rater from the outstanding set;
    /// a rejection also discards the entry.
    async fn resolve_rating_entry(
        &self,
        subject: &RatingSubject,
        rater: &UserId,
        approved: bool,
    ) -> Result<RatingRecordOutcome, MarketplaceError>;

    /// Removes and returns event rating windows that have settled since the last drain. The scheduler consumes these
    /// to post rating summaries and close out the events.
    async fn drain_settled_events(&self) -> Result<Vec<PendingRating>, MarketplaceError>;
}
