// src/book.rs
//! Price-level book shared between the ingestion loop and its readers.
//!
//! The book maps price (cents) to the most recently applied quantity at that
//! price. It is the only shared-mutable state in the process: [`OrderBook::apply`]
//! and [`OrderBook::snapshot`] each take the internal lock for the whole
//! operation, so a reader never observes a half-applied update and concurrent
//! producers never lose one.
//!
//! Semantics are last-applied-wins per price. The wire timestamp plays no part
//! in conflict resolution, and a zero-quantity update keeps its slot (explicit
//! empty level) rather than evicting it.
//!
//! ## Example
//!
//! ```rust
//! use tickfeed::book::OrderBook;
//! use tickfeed::wire::MarketUpdate;
//!
//! let book = OrderBook::new();
//! book.apply(&MarketUpdate { ts_us: 1, price: 1000, qty: 10 });
//! book.apply(&MarketUpdate { ts_us: 2, price: 1000, qty: 25 });
//!
//! let levels = book.snapshot();
//! assert_eq!(levels.len(), 1);
//! assert_eq!(levels[0].qty, 25);
//! ```

use serde::Serialize;
use std::sync::Mutex;

use crate::wire::MarketUpdate;

/// One aggregated price level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PriceLevel {
    /// Price in cents.
    pub price: u32,
    /// Last applied quantity at this price.
    pub qty: u32,
}

/// Concurrent price -> quantity map. Cheap to share via `Arc`.
#[derive(Default)]
pub struct OrderBook {
    levels: Mutex<hashbrown::HashMap<u32, u32>>,
}

impl OrderBook {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-allocates capacity for `n` distinct price levels.
    #[inline]
    pub fn reserve_levels(&self, n: usize) {
        self.levels.lock().unwrap().reserve(n);
    }

    /// Upserts the level for `upd.price` with `upd.qty`, replacing any
    /// previous quantity. One discrete critical section; atomic with respect
    /// to other `apply` and `snapshot` calls.
    pub fn apply(&self, upd: &MarketUpdate) {
        let mut levels = self.levels.lock().unwrap();
        levels.insert(upd.price, upd.qty);
    }

    /// Returns a consistent copy of all current levels at a single instant,
    /// sorted ascending by price for deterministic output.
    pub fn snapshot(&self) -> Vec<PriceLevel> {
        let levels = self.levels.lock().unwrap();
        let mut out: Vec<PriceLevel> = levels
            .iter()
            .map(|(&price, &qty)| PriceLevel { price, qty })
            .collect();
        drop(levels);

        out.sort_unstable_by_key(|l| l.price);
        out
    }

    /// Number of distinct price levels ever observed (zero-qty included).
    #[inline]
    pub fn len(&self) -> usize {
        self.levels.lock().unwrap().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn upd(price: u32, qty: u32) -> MarketUpdate {
        MarketUpdate { ts_us: 0, price, qty }
    }

    #[test]
    fn snapshot_is_idempotent() {
        let book = OrderBook::new();
        book.apply(&upd(1000, 10));
        book.apply(&upd(1003, 40));
        assert_eq!(book.snapshot(), book.snapshot());
    }

    #[test]
    fn last_applied_update_wins_per_price() {
        let book = OrderBook::new();
        book.apply(&upd(1000, 10));
        book.apply(&upd(1001, 20));
        book.apply(&upd(1000, 99));

        let levels = book.snapshot();
        assert_eq!(
            levels,
            vec![PriceLevel { price: 1000, qty: 99 }, PriceLevel { price: 1001, qty: 20 }]
        );
    }

    #[test]
    fn zero_qty_keeps_its_level() {
        let book = OrderBook::new();
        book.apply(&upd(1000, 10));
        book.apply(&upd(1000, 0));

        assert_eq!(book.snapshot(), vec![PriceLevel { price: 1000, qty: 0 }]);
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn snapshot_is_sorted_by_price() {
        let book = OrderBook::new();
        for &p in &[1019u32, 1000, 1010, 1005] {
            book.apply(&upd(p, 1));
        }
        let prices: Vec<u32> = book.snapshot().iter().map(|l| l.price).collect();
        assert_eq!(prices, vec![1000, 1005, 1010, 1019]);
    }

    #[test]
    fn twenty_update_scenario() {
        let book = OrderBook::new();
        for i in 0..20u32 {
            book.apply(&upd(1000 + i, 10 * (i + 1)));
        }

        let levels = book.snapshot();
        assert_eq!(levels.len(), 20);
        for (i, lvl) in levels.iter().enumerate() {
            assert_eq!(lvl.price, 1000 + i as u32);
            assert_eq!(lvl.qty, 10 * (i as u32 + 1));
            assert!((1000..=1019).contains(&lvl.price));
        }
    }

    #[test]
    fn concurrent_appliers_lose_nothing() {
        let book = Arc::new(OrderBook::new());
        let threads = 4u32;
        let per_thread = 500u32;

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let book = book.clone();
                std::thread::spawn(move || {
                    // Disjoint price ranges per thread; every update must land.
                    let base = 10_000 * (t + 1);
                    for i in 0..per_thread {
                        book.apply(&upd(base + i, i + 1));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let levels = book.snapshot();
        assert_eq!(levels.len(), (threads * per_thread) as usize);
        for lvl in levels {
            let i = lvl.price % 10_000;
            assert_eq!(lvl.qty, i + 1);
        }
    }
}
