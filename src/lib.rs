//! # tickfeed - UDP Market-Data Feed Handler
//!
//! A minimal feed handler: fixed-format binary price/quantity updates arrive
//! over unreliable, unordered UDP and are folded into a concurrently readable
//! order book keyed by price level.
//!
//! ## Architecture
//!
//! - **Wire**: decodes the fixed 16-byte record; rejects bad framing
//! - **Book**: the only shared-mutable state; `apply`/`snapshot` behind one lock
//! - **Feed**: ingestion loop over a pluggable `Transport` (UDP in production)
//! - **Report**: periodic consistent snapshots pushed to a `SnapshotSink`
//! - **Metrics**: cheap atomic counters, Prometheus-rendered
//!
//! Updates are applied in arrival order (last write wins per price); the wire
//! timestamp is informational. Malformed records are dropped and counted,
//! never fatal. A hard transport failure ends ingestion only; readers keep
//! serving the last-known book state until shutdown.
//!
//! ## Example
//!
//! ```rust
//! use tickfeed::{book::OrderBook, wire};
//!
//! let book = OrderBook::new();
//! let upd = wire::decode(&wire::encode(&wire::MarketUpdate {
//!     ts_us: 1000,
//!     price: 1005,
//!     qty: 50,
//! }))
//! .unwrap();
//!
//! book.apply(&upd);
//! assert_eq!(book.snapshot()[0].qty, 50);
//! ```
pub mod book;
pub mod feed;
pub mod metrics;
pub mod report;
pub mod wire;
