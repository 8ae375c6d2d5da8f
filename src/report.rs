// src/report.rs
//! Snapshot reporter: on a fixed cadence, takes a consistent copy of the book
//! and pushes a rendered frame to a sink. Read-only with respect to the book;
//! a failing sink is logged and counted, never fatal, and never touches
//! ingestion.

use anyhow::Result;
use bytes::Bytes;
use itoa::Buffer;
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::book::{OrderBook, PriceLevel};
use crate::metrics::Metrics;

/// Microseconds since the Unix epoch; the feed handler's clock.
pub fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

#[inline(always)]
fn push_str(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(s.as_bytes());
}

#[inline(always)]
fn push_u64(out: &mut Vec<u8>, buf: &mut Buffer, v: u64) {
    push_str(out, buf.format(v));
}

/// Renders one snapshot frame without going through serde on the publish path:
/// `{"type":"snapshot","ts_us":N,"levels":[{"px":N,"qty":N},...]}`.
pub fn encode_snapshot(ts_us: u64, levels: &[PriceLevel]) -> Bytes {
    let mut out = Vec::with_capacity(48 + levels.len() * 28);
    let mut b = Buffer::new();

    push_str(&mut out, "{\"type\":\"snapshot\",\"ts_us\":");
    push_u64(&mut out, &mut b, ts_us);

    push_str(&mut out, ",\"levels\":[");
    for (i, lv) in levels.iter().enumerate() {
        if i != 0 {
            out.push(b',');
        }
        push_str(&mut out, "{\"px\":");
        push_u64(&mut out, &mut b, lv.price as u64);
        push_str(&mut out, ",\"qty\":");
        push_u64(&mut out, &mut b, lv.qty as u64);
        out.push(b'}');
    }

    push_str(&mut out, "]}");
    Bytes::from(out)
}

/// Where rendered snapshots go. No return payload; errors are the caller's to
/// log and count.
pub trait SnapshotSink {
    fn publish(&mut self, ts_us: u64, levels: &[PriceLevel]) -> Result<()>;
}

/// One JSON line per snapshot on stdout.
#[derive(Default)]
pub struct StdoutSink;

impl SnapshotSink for StdoutSink {
    fn publish(&mut self, ts_us: u64, levels: &[PriceLevel]) -> Result<()> {
        let frame = encode_snapshot(ts_us, levels);
        let mut out = std::io::stdout().lock();
        out.write_all(&frame)?;
        out.write_all(b"\n")?;
        Ok(())
    }
}

/// Publishes a snapshot every `interval` until the shutdown flag flips.
pub async fn report_loop<S: SnapshotSink>(
    book: Arc<OrderBook>,
    mut sink: S,
    interval: Duration,
    metrics: Arc<Metrics>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut tick = tokio::time::interval(interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // interval ticks immediately; skip the zero-delay first tick
    tick.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
            _ = tick.tick() => {
                let levels = book.snapshot();
                match sink.publish(now_micros(), &levels) {
                    Ok(()) => metrics.inc_snapshots_published(),
                    Err(e) => {
                        metrics.inc_sink_err();
                        warn!("snapshot sink error: {e:#}");
                    }
                }
            }
        }
    }

    info!("report: stopped");
}
