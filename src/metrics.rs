// src/metrics.rs
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Default)]
pub struct Metrics {
    pub msgs_total: AtomicU64,
    pub framing_err: AtomicU64,
    pub transport_err: AtomicU64,
    pub snapshots_published: AtomicU64,
    pub sink_err: AtomicU64,

    // ultra-cheap apply-latency "histogram" (power-of-2-ish buckets in ns)
    pub apply_lat_b0: AtomicU64,
    pub apply_lat_b1: AtomicU64,
    pub apply_lat_b2: AtomicU64,
    pub apply_lat_b3: AtomicU64,
    pub apply_lat_b4: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn inc_total(&self) {
        self.msgs_total.fetch_add(1, Ordering::Relaxed);
    }
    #[inline]
    pub fn inc_framing_err(&self) {
        self.framing_err.fetch_add(1, Ordering::Relaxed);
    }
    #[inline]
    pub fn inc_transport_err(&self) {
        self.transport_err.fetch_add(1, Ordering::Relaxed);
    }
    #[inline]
    pub fn inc_snapshots_published(&self) {
        self.snapshots_published.fetch_add(1, Ordering::Relaxed);
    }
    #[inline]
    pub fn inc_sink_err(&self) {
        self.sink_err.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_apply(&self, dur: Duration) {
        let ns = dur.as_nanos() as u64;
        // buckets: <250ns, <500ns, <1us, <2us, >=2us
        if ns < 250 {
            self.apply_lat_b0.fetch_add(1, Ordering::Relaxed);
        } else if ns < 500 {
            self.apply_lat_b1.fetch_add(1, Ordering::Relaxed);
        } else if ns < 1_000 {
            self.apply_lat_b2.fetch_add(1, Ordering::Relaxed);
        } else if ns < 2_000 {
            self.apply_lat_b3.fetch_add(1, Ordering::Relaxed);
        } else {
            self.apply_lat_b4.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn prometheus_text(&self) -> String {
        // NOTE: totals stay Relaxed; a prom scrape isn't transactional anyway.
        let total = self.msgs_total.load(Ordering::Relaxed);
        let frame = self.framing_err.load(Ordering::Relaxed);
        let trans = self.transport_err.load(Ordering::Relaxed);
        let snaps = self.snapshots_published.load(Ordering::Relaxed);
        let sink = self.sink_err.load(Ordering::Relaxed);

        let b0 = self.apply_lat_b0.load(Ordering::Relaxed);
        let b1 = self.apply_lat_b1.load(Ordering::Relaxed);
        let b2 = self.apply_lat_b2.load(Ordering::Relaxed);
        let b3 = self.apply_lat_b3.load(Ordering::Relaxed);
        let b4 = self.apply_lat_b4.load(Ordering::Relaxed);

        format!(
            "\
# TYPE tickfeed_msgs_total counter
tickfeed_msgs_total {total}
# TYPE tickfeed_framing_err_total counter
tickfeed_framing_err_total {frame}
# TYPE tickfeed_transport_err_total counter
tickfeed_transport_err_total {trans}
# TYPE tickfeed_snapshots_published_total counter
tickfeed_snapshots_published_total {snaps}
# TYPE tickfeed_sink_err_total counter
tickfeed_sink_err_total {sink}
# TYPE tickfeed_apply_latency_bucket counter
tickfeed_apply_latency_bucket{{le=\"250\"}} {b0}
tickfeed_apply_latency_bucket{{le=\"500\"}} {b1}
tickfeed_apply_latency_bucket{{le=\"1000\"}} {b2}
tickfeed_apply_latency_bucket{{le=\"2000\"}} {b3}
tickfeed_apply_latency_bucket{{le=\"+Inf\"}} {b4}
"
        )
    }
}
