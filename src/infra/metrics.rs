//! Lock-free metrics collection and periodic reporting
//!
//! Uses atomics for the request path to avoid mutex contention between
//! concurrent requests. Reporting is the only operation that resets
//! anything (the per-interval counters, via atomic swap).
//!
//! NOTE: All atomics use Relaxed ordering intentionally—these are statistical
//! counters only. Do NOT use these atomics for coordination or logic decisions.

use crate::domain::error::Operation;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Exponential bucket boundaries for upstream call latency (milliseconds)
/// Buckets: ≤5, ≤10, ≤25, ≤50, ≤100, ≤250, ≤500, ≤1000, ≤2500, ≤5000, >5000
const BUCKET_BOUNDS: [u64; 10] = [5, 10, 25, 50, 100, 250, 500, 1000, 2500, 5000];
const NUM_BUCKETS: usize = 11;

const NUM_OPERATIONS: usize = 5;

/// Compute bucket index for a latency value using binary search
#[inline]
fn bucket_index(latency_ms: u64) -> usize {
    BUCKET_BOUNDS.partition_point(|&bound| bound < latency_ms)
}

/// Update an atomic max value using compare-and-swap loop
#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

/// Load all bucket values without resetting
#[inline]
fn load_buckets(buckets: &[AtomicU64; NUM_BUCKETS]) -> [u64; NUM_BUCKETS] {
    std::array::from_fn(|i| buckets[i].load(Ordering::Relaxed))
}

/// Compute percentile from histogram buckets
/// Returns the upper bound of the bucket containing the percentile
fn percentile_from_buckets(buckets: &[u64; NUM_BUCKETS], percentile: f64) -> u64 {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return 0;
    }

    let target = (total as f64 * percentile) as u64;
    let mut cumulative = 0u64;

    // Upper bounds for each bucket (last bucket uses 2x the previous bound)
    const BUCKET_UPPER_BOUNDS: [u64; NUM_BUCKETS] =
        [5, 10, 25, 50, 100, 250, 500, 1000, 2500, 5000, 10000];

    for (i, &count) in buckets.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return BUCKET_UPPER_BOUNDS[i];
        }
    }
    BUCKET_UPPER_BOUNDS[NUM_BUCKETS - 1]
}

#[inline]
fn operation_index(operation: Operation) -> usize {
    match operation {
        Operation::CreateUser => 0,
        Operation::ListUsers => 1,
        Operation::GetUser => 2,
        Operation::UpdateUser => 3,
        Operation::DeleteUser => 4,
    }
}

/// Operations in metrics index order
pub const OPERATIONS: [Operation; NUM_OPERATIONS] = [
    Operation::CreateUser,
    Operation::ListUsers,
    Operation::GetUser,
    Operation::UpdateUser,
    Operation::DeleteUser,
];

/// Outbound dependency whose calls are timed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    Postal,
    Backend,
}

impl Upstream {
    pub fn as_str(&self) -> &'static str {
        match self {
            Upstream::Postal => "postal",
            Upstream::Backend => "backend",
        }
    }
}

/// Call counters and latency histogram for one upstream
struct UpstreamStats {
    /// Calls issued (monotonic)
    calls_total: AtomicU64,
    /// Calls that failed at transport level or returned non-2xx (monotonic)
    failures_total: AtomicU64,
    /// Latency histogram buckets (cumulative)
    latency_buckets: [AtomicU64; NUM_BUCKETS],
    /// Sum of latencies in milliseconds (cumulative)
    latency_sum_ms: AtomicU64,
    /// Max latency since last report (reset on report)
    latency_max_ms: AtomicU64,
}

impl UpstreamStats {
    fn new() -> Self {
        Self {
            calls_total: AtomicU64::new(0),
            failures_total: AtomicU64::new(0),
            latency_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            latency_sum_ms: AtomicU64::new(0),
            latency_max_ms: AtomicU64::new(0),
        }
    }

    #[inline]
    fn record(&self, latency_ms: u64, ok: bool) {
        self.calls_total.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.failures_total.fetch_add(1, Ordering::Relaxed);
        }
        self.latency_sum_ms.fetch_add(latency_ms, Ordering::Relaxed);
        self.latency_buckets[bucket_index(latency_ms)].fetch_add(1, Ordering::Relaxed);
        update_atomic_max(&self.latency_max_ms, latency_ms);
    }

    fn summary(&self, reset: bool) -> UpstreamSummary {
        let buckets = load_buckets(&self.latency_buckets);
        let calls_total = self.calls_total.load(Ordering::Relaxed);
        let latency_sum_ms = self.latency_sum_ms.load(Ordering::Relaxed);
        UpstreamSummary {
            calls_total,
            failures_total: self.failures_total.load(Ordering::Relaxed),
            latency_buckets: buckets,
            latency_sum_ms,
            latency_avg_ms: if calls_total > 0 { latency_sum_ms / calls_total } else { 0 },
            latency_max_ms: if reset {
                self.latency_max_ms.swap(0, Ordering::Relaxed)
            } else {
                self.latency_max_ms.load(Ordering::Relaxed)
            },
            latency_p50_ms: percentile_from_buckets(&buckets, 0.50),
            latency_p99_ms: percentile_from_buckets(&buckets, 0.99),
        }
    }
}

/// Lock-free metrics collector
///
/// All recording operations are lock-free using atomics.
pub struct Metrics {
    /// Requests received per operation (monotonic)
    requests_total: [AtomicU64; NUM_OPERATIONS],
    /// Requests since last report (reset on report)
    requests_since_report: AtomicU64,
    /// Responses by status class (monotonic)
    responses_2xx: AtomicU64,
    responses_4xx: AtomicU64,
    responses_5xx: AtomicU64,
    postal: UpstreamStats,
    backend: UpstreamStats,
    /// Last report time (only accessed from reporter)
    last_report_time: parking_lot::Mutex<Instant>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            requests_total: std::array::from_fn(|_| AtomicU64::new(0)),
            requests_since_report: AtomicU64::new(0),
            responses_2xx: AtomicU64::new(0),
            responses_4xx: AtomicU64::new(0),
            responses_5xx: AtomicU64::new(0),
            postal: UpstreamStats::new(),
            backend: UpstreamStats::new(),
            last_report_time: parking_lot::Mutex::new(Instant::now()),
        }
    }

    /// Record an inbound request for an operation (lock-free)
    #[inline]
    pub fn record_request(&self, operation: Operation) {
        self.requests_total[operation_index(operation)].fetch_add(1, Ordering::Relaxed);
        self.requests_since_report.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the status code sent back to the client
    #[inline]
    pub fn record_response(&self, status: u16) {
        let counter = match status {
            200..=299 => &self.responses_2xx,
            400..=499 => &self.responses_4xx,
            500..=599 => &self.responses_5xx,
            _ => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one outbound call and its latency
    #[inline]
    pub fn record_upstream_call(&self, upstream: Upstream, latency_ms: u64, ok: bool) {
        self.upstream(upstream).record(latency_ms, ok);
    }

    pub fn requests_total(&self, operation: Operation) -> u64 {
        self.requests_total[operation_index(operation)].load(Ordering::Relaxed)
    }

    pub fn upstream_calls(&self, upstream: Upstream) -> u64 {
        self.upstream(upstream).calls_total.load(Ordering::Relaxed)
    }

    fn upstream(&self, upstream: Upstream) -> &UpstreamStats {
        match upstream {
            Upstream::Postal => &self.postal,
            Upstream::Backend => &self.backend,
        }
    }

    /// Calculate and return metrics summary, then reset periodic counters
    pub fn report(&self) -> MetricsSummary {
        self.summarize(true)
    }

    /// Summary for scraping; leaves periodic counters untouched
    pub fn snapshot(&self) -> MetricsSummary {
        self.summarize(false)
    }

    fn summarize(&self, reset: bool) -> MetricsSummary {
        let (requests_count, elapsed) = if reset {
            let mut last = self.last_report_time.lock();
            let elapsed = last.elapsed();
            *last = Instant::now();
            (self.requests_since_report.swap(0, Ordering::Relaxed), elapsed)
        } else {
            let last = self.last_report_time.lock();
            (self.requests_since_report.load(Ordering::Relaxed), last.elapsed())
        };

        let requests_per_sec = if elapsed.as_secs_f64() > 0.0 {
            requests_count as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        MetricsSummary {
            requests_total: std::array::from_fn(|i| self.requests_total[i].load(Ordering::Relaxed)),
            requests_per_sec,
            responses_2xx: self.responses_2xx.load(Ordering::Relaxed),
            responses_4xx: self.responses_4xx.load(Ordering::Relaxed),
            responses_5xx: self.responses_5xx.load(Ordering::Relaxed),
            postal: self.postal.summary(reset),
            backend: self.backend.summary(reset),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Number of histogram buckets (exported for Prometheus formatting)
pub const METRICS_NUM_BUCKETS: usize = NUM_BUCKETS;

/// Exported bucket bounds for Prometheus formatting
pub const METRICS_BUCKET_BOUNDS: [u64; 10] = BUCKET_BOUNDS;

#[derive(Debug, Clone)]
pub struct UpstreamSummary {
    pub calls_total: u64,
    pub failures_total: u64,
    /// Bounds: ≤5, ≤10, ≤25, ≤50, ≤100, ≤250, ≤500, ≤1000, ≤2500, ≤5000, >5000 ms
    pub latency_buckets: [u64; NUM_BUCKETS],
    pub latency_sum_ms: u64,
    pub latency_avg_ms: u64,
    /// Max since the previous report
    pub latency_max_ms: u64,
    pub latency_p50_ms: u64,
    pub latency_p99_ms: u64,
}

#[derive(Debug, Clone)]
pub struct MetricsSummary {
    /// Indexed like [`OPERATIONS`]
    pub requests_total: [u64; NUM_OPERATIONS],
    pub requests_per_sec: f64,
    pub responses_2xx: u64,
    pub responses_4xx: u64,
    pub responses_5xx: u64,
    pub postal: UpstreamSummary,
    pub backend: UpstreamSummary,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            requests_total = %self.requests_total.iter().sum::<u64>(),
            requests_per_sec = format!("{:.1}", self.requests_per_sec),
            responses_2xx = %self.responses_2xx,
            responses_4xx = %self.responses_4xx,
            responses_5xx = %self.responses_5xx,
            postal_calls = %self.postal.calls_total,
            postal_failures = %self.postal.failures_total,
            postal_p99_ms = %self.postal.latency_p99_ms,
            backend_calls = %self.backend.calls_total,
            backend_failures = %self.backend.failures_total,
            backend_p99_ms = %self.backend.latency_p99_ms,
            "metrics"
        );
    }
}
