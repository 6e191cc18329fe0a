use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use log::debug;

use crate::{
    db_types::{OrderId, PendingOrder, PendingRating, RatingEntry, RatingSubject, UserId},
    traits::{ConfirmationOutcome, MarketplaceError, OrderRepository, RatingRecordOutcome, WindowUpdate},
};

/// Process-wide pending-state tables behind the [`OrderRepository`] seam.
///
/// Each mutation takes a single std mutex and completes without an await point, which is what makes
/// `record_confirmation` atomic: the second confirmer removes the entry in the same critical section that observed
/// both parties, so the `Completed` outcome is produced exactly once per order.
#[derive(Clone, Default)]
pub struct InMemoryOrderRepository {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    orders: Mutex<HashMap<OrderId, PendingOrder>>,
    windows: Mutex<HashMap<RatingSubject, PendingRating>>,
    settled_events: Mutex<Vec<PendingRating>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_order_count(&self) -> usize {
        lock(&self.inner.orders).len()
    }

    pub fn open_window_count(&self) -> usize {
        lock(&self.inner.windows).len()
    }

    fn apply_window_update(
        windows: &mut HashMap<RatingSubject, PendingRating>,
        settled_events: &Mutex<Vec<PendingRating>>,
        subject: &RatingSubject,
    ) -> WindowUpdate {
        let outstanding_left = windows.get(subject).map(|w| w.outstanding.len()).unwrap_or_default();
        if outstanding_left > 0 {
            return WindowUpdate { outstanding_left, settled: None };
        }
        let settled = windows.remove(subject);
        if let (Some(window), RatingSubject::Event(_)) = (&settled, subject) {
            lock(settled_events).push(window.clone());
        }
        WindowUpdate { outstanding_left: 0, settled }
    }
}

impl OrderRepository for InMemoryOrderRepository {
    async fn insert_order(&self, order: PendingOrder) -> Result<(), MarketplaceError> {
        lock(&self.inner.orders).insert(order.order_id.clone(), order);
        Ok(())
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<PendingOrder>, MarketplaceError> {
        Ok(lock(&self.inner.orders).get(order_id).cloned())
    }

    async fn record_confirmation(
        &self,
        order_id: &OrderId,
        user: &UserId,
    ) -> Result<ConfirmationOutcome, MarketplaceError> {
        let mut orders = lock(&self.inner.orders);
        let Some(order) = orders.get_mut(order_id) else {
            return Ok(ConfirmationOutcome::NotFound);
        };
        if !order.is_party(user) {
            return Ok(ConfirmationOutcome::NotAParty);
        }
        order.confirmed_by.insert(user.clone());
        let both_confirmed = order.confirmed_by.contains(&order.buyer) && order.confirmed_by.contains(&order.seller);
        if both_confirmed {
            match orders.remove(order_id) {
                Some(order) => Ok(ConfirmationOutcome::Completed(order)),
                // Unreachable: the lock has been held since the get_mut above.
                None => Ok(ConfirmationOutcome::NotFound),
            }
        } else {
            Ok(ConfirmationOutcome::StillPending)
        }
    }

    async fn remove_order(&self, order_id: &OrderId) -> Result<Option<PendingOrder>, MarketplaceError> {
        Ok(lock(&self.inner.orders).remove(order_id))
    }

    async fn open_rating_window(&self, window: PendingRating) -> Result<(), MarketplaceError> {
        debug!("🗂️ Opening rating window for {} ({} raters expected)", window.subject, window.outstanding.len());
        lock(&self.inner.windows).insert(window.subject.clone(), window);
        Ok(())
    }

    async fn fetch_rating_window(&self, subject: &RatingSubject) -> Result<Option<PendingRating>, MarketplaceError> {
        Ok(lock(&self.inner.windows).get(subject).cloned())
    }

    async fn record_rating_entry(
        &self,
        subject: &RatingSubject,
        rater: &UserId,
        entry: RatingEntry,
    ) -> Result<RatingRecordOutcome, MarketplaceError> {
        let mut windows = lock(&self.inner.windows);
        let Some(window) = windows.get_mut(subject) else {
            return Ok(RatingRecordOutcome::WindowMissing);
        };
        if !window.outstanding.contains(rater) {
            let outcome = if window.entries.contains_key(rater) {
                RatingRecordOutcome::Duplicate
            } else {
                RatingRecordOutcome::NotExpected
            };
            return Ok(outcome);
        }
        if window.entries.contains_key(rater) {
            return Ok(RatingRecordOutcome::Duplicate);
        }
        let held = entry.held;
        window.entries.insert(rater.clone(), entry);
        if !held {
            window.outstanding.remove(rater);
        }
        let update = Self::apply_window_update(&mut windows, &self.inner.settled_events, subject);
        Ok(RatingRecordOutcome::Recorded(update))
    }

    async fn resolve_rating_entry(
        &self,
        subject: &RatingSubject,
        rater: &UserId,
        approved: bool,
    ) -> Result<RatingRecordOutcome, MarketplaceError> {
        let mut windows = lock(&self.inner.windows);
        let Some(window) = windows.get_mut(subject) else {
            return Ok(RatingRecordOutcome::WindowMissing);
        };
        let held = window.entries.get(rater).map(|e| e.held).unwrap_or(false);
        if !held {
            return Ok(RatingRecordOutcome::NotExpected);
        }
        if approved {
            if let Some(entry) = window.entries.get_mut(rater) {
                entry.held = false;
            }
        } else {
            window.entries.remove(rater);
        }
        window.outstanding.remove(rater);
        let update = Self::apply_window_update(&mut windows, &self.inner.settled_events, subject);
        Ok(RatingRecordOutcome::Recorded(update))
    }

    async fn drain_settled_events(&self) -> Result<Vec<PendingRating>, MarketplaceError> {
        Ok(std::mem::take(&mut *lock(&self.inner.settled_events)))
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use chrono::Utc;

    use super::*;

    fn pending_order(id: &str) -> PendingOrder {
        PendingOrder {
            order_id: OrderId::from(id.to_string()),
            guild: "guild-1".into(),
            buyer: UserId::from("buyer"),
            seller: UserId::from("seller"),
            item: "Hope Torque".into(),
            zone: "sky".into(),
            quantity: 1,
            notes: None,
            listing_id: 7,
            confirmed_by: HashSet::new(),
            created_at: Utc::now(),
        }
    }

    fn entry(rated: &str, score: i64, held: bool) -> RatingEntry {
        RatingEntry { rated: UserId::from(rated), score, comment: None, held, created_at: Utc::now() }
    }

    #[tokio::test]
    async fn second_confirmation_completes_exactly_once() {
        let repo = InMemoryOrderRepository::new();
        repo.insert_order(pending_order("o1")).await.unwrap();
        let id = OrderId::from("o1".to_string());
        let first = repo.record_confirmation(&id, &UserId::from("buyer")).await.unwrap();
        assert!(matches!(first, ConfirmationOutcome::StillPending));
        let second = repo.record_confirmation(&id, &UserId::from("seller")).await.unwrap();
        assert!(matches!(second, ConfirmationOutcome::Completed(_)));
        // The entry is gone, so a third confirmation cannot re-complete.
        let third = repo.record_confirmation(&id, &UserId::from("buyer")).await.unwrap();
        assert!(matches!(third, ConfirmationOutcome::NotFound));
    }

    #[tokio::test]
    async fn racing_confirmations_complete_exactly_once() {
        let repo = InMemoryOrderRepository::new();
        repo.insert_order(pending_order("o2")).await.unwrap();
        let id = OrderId::from("o2".to_string());
        let (r1, r2) = (repo.clone(), repo.clone());
        let (id1, id2) = (id.clone(), id.clone());
        let a = tokio::spawn(async move { r1.record_confirmation(&id1, &UserId::from("buyer")).await.unwrap() });
        let b = tokio::spawn(async move { r2.record_confirmation(&id2, &UserId::from("seller")).await.unwrap() });
        let outcomes = [a.await.unwrap(), b.await.unwrap()];
        let completed = outcomes.iter().filter(|o| matches!(o, ConfirmationOutcome::Completed(_))).count();
        assert_eq!(completed, 1);
        assert_eq!(repo.open_order_count(), 0);
    }

    #[tokio::test]
    async fn confirmation_from_outsider_is_rejected() {
        let repo = InMemoryOrderRepository::new();
        repo.insert_order(pending_order("o3")).await.unwrap();
        let id = OrderId::from("o3".to_string());
        let outcome = repo.record_confirmation(&id, &UserId::from("mallory")).await.unwrap();
        assert!(matches!(outcome, ConfirmationOutcome::NotAParty));
    }

    #[tokio::test]
    async fn window_settles_when_last_rater_resolves() {
        let repo = InMemoryOrderRepository::new();
        let order = pending_order("o4");
        repo.open_rating_window(PendingRating::for_order(&order)).await.unwrap();
        let subject = RatingSubject::Order(order.order_id.clone());

        let out = repo.record_rating_entry(&subject, &order.buyer, entry("seller", 5, false)).await.unwrap();
        let RatingRecordOutcome::Recorded(update) = out else { panic!("expected Recorded") };
        assert_eq!(update.outstanding_left, 1);
        assert!(update.settled.is_none());

        // The seller's low rating goes through moderation: recorded held, still outstanding.
        let out = repo.record_rating_entry(&subject, &order.seller, entry("buyer", 1, true)).await.unwrap();
        let RatingRecordOutcome::Recorded(update) = out else { panic!("expected Recorded") };
        assert_eq!(update.outstanding_left, 1);

        let out = repo.resolve_rating_entry(&subject, &order.seller, false).await.unwrap();
        let RatingRecordOutcome::Recorded(update) = out else { panic!("expected Recorded") };
        let settled = update.settled.expect("window should settle");
        // The rejected entry is gone; only the buyer's rating survives.
        assert_eq!(settled.entries.len(), 1);
        assert!(settled.entries.contains_key(&order.buyer));
        assert_eq!(repo.open_window_count(), 0);
        // Order windows are not parked for the scheduler.
        assert!(repo.drain_settled_events().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_rating_is_flagged() {
        let repo = InMemoryOrderRepository::new();
        let order = pending_order("o5");
        repo.open_rating_window(PendingRating::for_order(&order)).await.unwrap();
        let subject = RatingSubject::Order(order.order_id.clone());
        repo.record_rating_entry(&subject, &order.buyer, entry("seller", 4, false)).await.unwrap();
        let out = repo.record_rating_entry(&subject, &order.buyer, entry("seller", 2, false)).await.unwrap();
        assert!(matches!(out, RatingRecordOutcome::Duplicate));
    }

    #[tokio::test]
    async fn settled_event_windows_are_drained_once() {
        let repo = InMemoryOrderRepository::new();
        let listing = crate::db_types::Listing {
            id: 9,
            owner: UserId::from("seller"),
            guild: "guild-1".into(),
            side: crate::db_types::Side::Sell,
            zone: "sky".into(),
            subcategory: String::new(),
            item: "Hope Torque".into(),
            quantity: 1,
            notes: None,
            scheduled_for: None,
            created_at: Utc::now(),
            expires_at: Utc::now(),
            active: true,
            reminded: false,
            removed_at: None,
        };
        let window = PendingRating::for_event(42, &listing, [UserId::from("buyer")]);
        repo.open_rating_window(window).await.unwrap();
        let subject = RatingSubject::Event(42);
        repo.record_rating_entry(&subject, &UserId::from("buyer"), entry("seller", 5, false)).await.unwrap();
        let drained = repo.drain_settled_events().await.unwrap();
        assert_eq!(drained.len(), 1);
        assert!(matches!(drained[0].subject, RatingSubject::Event(42)));
        assert!(repo.drain_settled_events().await.unwrap().is_empty());
    }
}
