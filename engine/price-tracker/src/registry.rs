//! Live set of coins sampled on every tick
//!
//! Keyed by symbol and backed by a sharded map, so writers never wait on a
//! dispatcher enumeration and a snapshot never holds more than one shard lock.

use dashmap::DashMap;

use crate::models::TrackedCoin;

#[derive(Debug, Default)]
pub struct CoinRegistry {
    coins: DashMap<String, TrackedCoin>,
}

impl CoinRegistry {
    pub fn new() -> Self {
        Self { coins: DashMap::new() }
    }

    /// Insert or overwrite the coin under its symbol, returning the previous entry
    pub fn add(&self, coin: TrackedCoin) -> Option<TrackedCoin> {
        self.coins.insert(coin.symbol.clone(), coin)
    }

    /// Remove a symbol; absent symbols are ignored
    pub fn remove(&self, symbol: &str) -> Option<TrackedCoin> {
        self.coins.remove(symbol).map(|(_, coin)| coin)
    }

    pub fn get(&self, symbol: &str) -> Option<TrackedCoin> {
        self.coins.get(symbol).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.coins.contains_key(symbol)
    }

    /// Point-in-time copy of every tracked coin, in no particular order
    pub fn snapshot(&self) -> Vec<TrackedCoin> {
        self.coins.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Add every coin, returning how many were new
    pub fn extend(&self, coins: impl IntoIterator<Item = TrackedCoin>) -> usize {
        coins.into_iter().filter(|coin| self.add(coin.clone()).is_none()).count()
    }

    pub fn len(&self) -> usize {
        self.coins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_add_is_idempotent() {
        let registry = CoinRegistry::new();

        assert!(registry.add(TrackedCoin::new(1, "BTC")).is_none());
        let previous = registry.add(TrackedCoin::new(1, "BTC"));

        assert_eq!(previous, Some(TrackedCoin::new(1, "BTC")));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.snapshot(), vec![TrackedCoin::new(1, "BTC")]);
    }

    #[test]
    fn test_add_overwrites_same_symbol() {
        let registry = CoinRegistry::new();
        registry.add(TrackedCoin::new(1, "ETH"));
        registry.add(TrackedCoin::new(7, "ETH"));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("ETH").map(|c| c.id), Some(7));
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let registry = CoinRegistry::new();
        registry.add(TrackedCoin::new(1, "BTC"));

        assert!(registry.remove("DOGE").is_none());
        assert_eq!(registry.len(), 1);

        assert_eq!(registry.remove("BTC"), Some(TrackedCoin::new(1, "BTC")));
        assert!(registry.is_empty());
        assert!(!registry.contains("BTC"));
    }

    #[test]
    fn test_extend_counts_new_entries() {
        let registry = CoinRegistry::new();
        registry.add(TrackedCoin::new(1, "BTC"));

        let added = registry.extend(vec![
            TrackedCoin::new(1, "BTC"),
            TrackedCoin::new(2, "ETH"),
            TrackedCoin::new(3, "SOL"),
        ]);

        assert_eq!(added, 2);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_snapshot_during_concurrent_mutation() {
        let registry = Arc::new(CoinRegistry::new());
        for id in 0..100 {
            registry.add(TrackedCoin::new(id, format!("C{id}")));
        }

        let writer = {
            let registry = registry.clone();
            std::thread::spawn(move || {
                for id in 100..200 {
                    registry.add(TrackedCoin::new(id, format!("C{id}")));
                    registry.remove(&format!("C{}", id - 100));
                }
            })
        };

        for _ in 0..50 {
            let snapshot = registry.snapshot();
            let unique: HashSet<_> = snapshot.iter().map(|c| c.symbol.clone()).collect();
            assert_eq!(unique.len(), snapshot.len());
        }

        writer.join().unwrap();
        assert_eq!(registry.len(), 100);
        assert!(registry.contains("C150"));
        assert!(!registry.contains("C50"));
    }
}
