//! Nearest-price resolution
//!
//! A point-in-time query is answered with three probes, each of which maps to a
//! single indexed predicate on `(coin_id, timestamp)`:
//!
//! 1. exact match at the target
//! 2. latest sample at or before the target
//! 3. earliest sample strictly after the target
//!
//! Probes 2 and 3 only run when probe 1 misses. The closer of the two wins and
//! equal distances resolve to the earlier sample.

use chrono::{DateTime, Utc};

use crate::error::HistoryError;
use crate::models::{CoinId, PricePoint};
use crate::source::HistoryStore;

/// Pick the sample closest to `target`; ties go to `before`
pub fn choose_nearest(
    target: DateTime<Utc>,
    before: Option<PricePoint>,
    after: Option<PricePoint>,
) -> Option<PricePoint> {
    match (before, after) {
        (None, None) => None,
        (Some(before), None) => Some(before),
        (None, Some(after)) => Some(after),
        (Some(before), Some(after)) => {
            let before_gap = target - before.timestamp;
            let after_gap = after.timestamp - target;

            if before_gap <= after_gap {
                Some(before)
            } else {
                Some(after)
            }
        }
    }
}

/// Resolve the sample of `coin_id` nearest to `target`
pub async fn resolve_nearest<S>(
    store: &S,
    coin_id: CoinId,
    target: DateTime<Utc>,
) -> Result<PricePoint, HistoryError>
where
    S: HistoryStore + ?Sized,
{
    if let Some(exact) = store.find_exact(coin_id, target).await? {
        return Ok(exact);
    }

    let (before, after) = tokio::try_join!(
        store.find_at_or_before(coin_id, target),
        store.find_after(coin_id, target),
    )?;

    choose_nearest(target, before, after).ok_or(HistoryError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryHistoryStore;
    use crate::models::NewPricePoint;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn point(id: i64, secs: i64, price: f64) -> PricePoint {
        PricePoint { id, coin_id: 1, price, timestamp: at(secs) }
    }

    async fn seeded_store() -> InMemoryHistoryStore {
        let store = InMemoryHistoryStore::new();
        store.append(NewPricePoint::new(1, 100.0, at(10))).await.unwrap();
        store.append(NewPricePoint::new(1, 200.0, at(20))).await.unwrap();
        store
    }

    #[test]
    fn test_choose_nearest_prefers_closer_side() {
        let before = point(1, 10, 100.0);
        let after = point(2, 20, 200.0);

        let chosen = choose_nearest(at(14), Some(before.clone()), Some(after.clone()));
        assert_eq!(chosen, Some(before.clone()));

        let chosen = choose_nearest(at(16), Some(before), Some(after.clone()));
        assert_eq!(chosen, Some(after));
    }

    #[test]
    fn test_choose_nearest_tie_goes_to_before() {
        let chosen = choose_nearest(at(15), Some(point(1, 10, 100.0)), Some(point(2, 20, 200.0)));
        assert_eq!(chosen.map(|p| p.price), Some(100.0));
    }

    #[test]
    fn test_choose_nearest_single_side() {
        assert_eq!(choose_nearest(at(5), None, Some(point(2, 20, 200.0))).map(|p| p.id), Some(2));
        assert_eq!(choose_nearest(at(50), Some(point(1, 10, 100.0)), None).map(|p| p.id), Some(1));
        assert!(choose_nearest(at(50), None, None).is_none());
    }

    #[tokio::test]
    async fn test_resolve_nearest_against_store() {
        let store = seeded_store().await;

        let cases = [(10, 100.0), (14, 100.0), (16, 200.0), (15, 100.0), (0, 100.0), (99, 200.0)];
        for (secs, expected) in cases {
            let found = store.nearest_price(1, at(secs)).await.unwrap();
            assert_eq!(found.price, expected, "query at t={secs}");
        }
    }

    #[tokio::test]
    async fn test_resolve_nearest_without_history() {
        let store = seeded_store().await;
        let result = store.nearest_price(2, at(10)).await;
        assert!(matches!(result, Err(HistoryError::NotFound)));
    }

    /// Store that counts probes and only answers the exact probe
    struct CountingStore {
        side_probes: AtomicUsize,
    }

    #[async_trait]
    impl HistoryStore for CountingStore {
        async fn append(&self, point: NewPricePoint) -> Result<PricePoint, HistoryError> {
            Ok(point.into_point(1))
        }

        async fn find_exact(
            &self,
            coin_id: CoinId,
            timestamp: DateTime<Utc>,
        ) -> Result<Option<PricePoint>, HistoryError> {
            Ok(Some(PricePoint { id: 9, coin_id, price: 1.0, timestamp }))
        }

        async fn find_at_or_before(
            &self,
            _coin_id: CoinId,
            _target: DateTime<Utc>,
        ) -> Result<Option<PricePoint>, HistoryError> {
            self.side_probes.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }

        async fn find_after(
            &self,
            _coin_id: CoinId,
            _target: DateTime<Utc>,
        ) -> Result<Option<PricePoint>, HistoryError> {
            self.side_probes.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_exact_hit_skips_side_probes() {
        let store = CountingStore { side_probes: AtomicUsize::new(0) };
        let found = resolve_nearest(&store, 3, at(42)).await.unwrap();

        assert_eq!(found.id, 9);
        assert_eq!(store.side_probes.load(Ordering::SeqCst), 0);
    }

    /// Store whose "after" probe fails
    struct FailingStore;

    #[async_trait]
    impl HistoryStore for FailingStore {
        async fn append(&self, _point: NewPricePoint) -> Result<PricePoint, HistoryError> {
            Err(HistoryError::storage("read only"))
        }

        async fn find_exact(
            &self,
            _coin_id: CoinId,
            _timestamp: DateTime<Utc>,
        ) -> Result<Option<PricePoint>, HistoryError> {
            Ok(None)
        }

        async fn find_at_or_before(
            &self,
            _coin_id: CoinId,
            _target: DateTime<Utc>,
        ) -> Result<Option<PricePoint>, HistoryError> {
            Ok(Some(point(1, 10, 100.0)))
        }

        async fn find_after(
            &self,
            _coin_id: CoinId,
            _target: DateTime<Utc>,
        ) -> Result<Option<PricePoint>, HistoryError> {
            Err(HistoryError::storage("connection reset"))
        }
    }

    #[tokio::test]
    async fn test_probe_failure_is_not_reported_as_not_found() {
        let result = resolve_nearest(&FailingStore, 1, at(12)).await;
        assert!(matches!(result, Err(HistoryError::Storage(_))));
    }
}
