use std::fmt::Debug;

use chrono::Utc;
use log::*;

use crate::{
    db_types::{Listing, NewListing, NewTransaction, OrderId, PendingOrder, PendingRating, Side, UserId},
    events::{EventProducers, ListingsChangedEvent, OrderCompletedEvent, OrderDeclinedEvent, OrderProposedEvent},
    helpers::new_order_id,
    market_api::{errors::OrderFlowError, matcher::Matcher},
    traits::{ConfirmationOutcome, MarketplaceDatabase, Notification, NotificationKind, Notifier, OrderRepository},
};

/// What a confirmation call achieved, from the caller's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmResult {
    /// The other party has not confirmed yet.
    StillPending,
    /// Both parties have confirmed; the trade is recorded and the rating window is open.
    Completed,
}

/// `OrderFlowApi` drives the order lifecycle: matching a request against the market, the two-party confirmation
/// handshake, and the hand-off into the rating flow on completion.
pub struct OrderFlowApi<B, R, N> {
    db: B,
    repo: R,
    notifier: N,
    producers: EventProducers,
}

impl<B, R, N> Debug for OrderFlowApi<B, R, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B, R, N> OrderFlowApi<B, R, N> {
    pub fn new(db: B, repo: R, notifier: N, producers: EventProducers) -> Self {
        Self { db, repo, notifier, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }
}

impl<B, R, N> OrderFlowApi<B, R, N>
where
    B: MarketplaceDatabase,
    R: OrderRepository,
    N: Notifier,
{
    /// Puts a new listing on the market. A listing that carries a scheduled trade time also gets its companion
    /// scheduler event, so the poll loop will pick it up when the time arrives.
    pub async fn post_listing(&self, listing: NewListing) -> Result<Listing, OrderFlowError> {
        let listing = self.db.create_listing(listing).await?;
        if let Some(at) = listing.scheduled_for {
            let event = self.db.create_event(listing.id, at).await?;
            debug!("🤝️ Listing #{} is scheduled; event #{} will trigger at {at}", listing.id, event.id);
        }
        self.publish_listings_changed(&listing).await;
        Ok(listing)
    }

    /// Handles a "I want to buy/sell X" request: looks for the oldest opposite-side listing and, when one exists,
    /// proposes an order to both parties. Returns the new order id, or `None` when the market has no match.
    pub async fn request_match(
        &self,
        requester: &UserId,
        guild: &str,
        side: Side,
        zone: &str,
        item: &str,
    ) -> Result<Option<OrderId>, OrderFlowError> {
        let matcher = Matcher::new(self.db.clone());
        let candidates = matcher.find_matches(requester, guild, side, zone, item).await?;
        // Only the oldest candidate is processed; the rest stay on the market for future requests.
        let Some(listing) = candidates.into_iter().next() else {
            debug!("🤝️ No match for {requester}'s {side} request on {item} in {zone}");
            return Ok(None);
        };
        let order_id = self.propose(guild, requester, &listing, side).await?;
        Ok(Some(order_id))
    }

    /// Proposes a trade between the requester and the owner of `listing`, and asks both to confirm or decline.
    ///
    /// A notification that cannot be delivered to one party does not abort the proposal; the order stays pending for
    /// the other party's action.
    pub async fn propose(
        &self,
        guild: &str,
        requester: &UserId,
        listing: &Listing,
        requester_side: Side,
    ) -> Result<OrderId, OrderFlowError> {
        let (buyer, seller) = match requester_side {
            Side::Buy => (requester.clone(), listing.owner.clone()),
            Side::Sell => (listing.owner.clone(), requester.clone()),
        };
        let order = PendingOrder {
            order_id: new_order_id(),
            guild: guild.to_string(),
            buyer: buyer.clone(),
            seller: seller.clone(),
            item: listing.item.clone(),
            zone: listing.zone.clone(),
            quantity: listing.quantity,
            notes: listing.notes.clone(),
            listing_id: listing.id,
            confirmed_by: Default::default(),
            created_at: Utc::now(),
        };
        let order_id = order.order_id.clone();
        self.repo.insert_order(order.clone()).await?;
        info!("🤝️ Order {order_id} proposed: {seller} sells {} to {buyer} in {}", order.item, order.zone);
        let kind = NotificationKind::ConfirmDecline { order_id: order_id.clone() };
        let body = format!("Trade proposal for {} x{} in {}. Confirm or decline.", order.item, order.quantity, order.zone);
        self.notify_party(&buyer, Notification::with_kind(body.clone(), kind.clone())).await;
        self.notify_party(&seller, Notification::with_kind(body, kind)).await;
        for producer in &self.producers.order_proposed {
            producer.publish_event(OrderProposedEvent::new(order.clone())).await;
        }
        Ok(order_id)
    }

    /// Folds one party's confirmation into the order. On the second confirmation the order completes: the listing
    /// comes off the market, the transaction is recorded, and the rating window opens.
    pub async fn confirm(&self, order_id: &OrderId, user: &UserId) -> Result<ConfirmResult, OrderFlowError> {
        match self.repo.record_confirmation(order_id, user).await? {
            ConfirmationOutcome::NotFound => Err(OrderFlowError::UnknownOrder(order_id.clone())),
            ConfirmationOutcome::NotAParty => {
                Err(OrderFlowError::NotAParty { order_id: order_id.clone(), user: user.to_string() })
            },
            ConfirmationOutcome::StillPending => {
                debug!("🤝️ {user} confirmed order {order_id}; waiting on the counterparty");
                Ok(ConfirmResult::StillPending)
            },
            ConfirmationOutcome::Completed(order) => {
                self.complete_order(order).await?;
                Ok(ConfirmResult::Completed)
            },
        }
    }

    /// Declines a pending order on behalf of `user` and informs both parties. Declining an order that no longer
    /// exists is a logged no-op.
    pub async fn decline(&self, order_id: &OrderId, user: &UserId, reason: &str) -> Result<(), OrderFlowError> {
        let Some(order) = self.repo.remove_order(order_id).await? else {
            debug!("🤝️ Decline for unknown order {order_id} by {user}; ignoring");
            return Ok(());
        };
        info!("🤝️ Order {order_id} declined by {user}: {reason}");
        let body = format!("Trade for {} in {} was cancelled: {reason}", order.item, order.zone);
        self.notify_party(&order.buyer, Notification::plain(body.clone())).await;
        self.notify_party(&order.seller, Notification::plain(body)).await;
        let event = OrderDeclinedEvent { order, declined_by: user.clone(), reason: reason.to_string() };
        for producer in &self.producers.order_declined {
            producer.publish_event(event.clone()).await;
        }
        Ok(())
    }

    /// The single completion path. The repository has already removed the pending order, so this runs at most once
    /// per order. Store failures here propagate, but already-applied side effects are not rolled back.
    async fn complete_order(&self, order: PendingOrder) -> Result<(), OrderFlowError> {
        let order_id = order.order_id.clone();
        if !self.db.deactivate_listing(order.listing_id).await? {
            // The listing went inactive through another path (expiry, removal). The handshake still stands.
            warn!("🤝️ Listing #{} was already inactive when order {order_id} completed", order.listing_id);
        }
        let transaction = self.db.insert_transaction(NewTransaction::completed_from(&order)).await?;
        let window = PendingRating::for_order(&order);
        let subject = window.subject.clone();
        self.repo.open_rating_window(window).await?;
        info!("🤝️ Order {order_id} completed: transaction #{} recorded", transaction.id);
        let kind = NotificationKind::RatingPrompt { subject };
        let body = format!("Trade complete: {} x{} in {}. Please rate your trade partner.", order.item, order.quantity, order.zone);
        self.notify_party(&order.buyer, Notification::with_kind(body.clone(), kind.clone())).await;
        self.notify_party(&order.seller, Notification::with_kind(body, kind)).await;
        if let Some(listing) = self.db.fetch_listing(order.listing_id).await? {
            self.publish_listings_changed(&listing).await;
        }
        let event = OrderCompletedEvent { order, transaction };
        for producer in &self.producers.order_completed {
            producer.publish_event(event.clone()).await;
        }
        Ok(())
    }

    async fn notify_party(&self, user: &UserId, note: Notification) {
        if !self.notifier.notify_user(user, note).await {
            warn!("🤝️ Could not deliver an order notification to {user}");
        }
    }

    async fn publish_listings_changed(&self, listing: &Listing) {
        let event = ListingsChangedEvent {
            guild: listing.guild.clone(),
            zone: listing.zone.clone(),
            side: listing.side,
        };
        for producer in &self.producers.listings_changed {
            producer.publish_event(event.clone()).await;
        }
    }
}
