//! Observability metrics: query latency, pruning effectiveness, rebuilds.

use std::collections::VecDeque;
use std::time::Duration;

/// Latency samples kept for averages and percentiles; older samples roll off.
pub const LATENCY_WINDOW: usize = 10_000;

/// Collects runtime metrics for a served index.
///
/// Counters cover the whole process lifetime. Latency statistics cover the
/// most recent [`LATENCY_WINDOW`] queries.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    latencies_us: VecDeque<u64>,
    total_queries: u64,
    total_candidates: u64,
    failed_queries: u64,
    total_rebuilds: u64,
    last_rebuild: Option<Duration>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a served query and how many vectors it scored exactly.
    pub fn record_query(&mut self, duration: Duration, candidates: usize) {
        self.total_queries += 1;
        self.total_candidates += candidates as u64;
        if self.latencies_us.len() == LATENCY_WINDOW {
            self.latencies_us.pop_front();
        }
        self.latencies_us.push_back(duration.as_micros() as u64);
    }

    pub fn record_failure(&mut self) {
        self.failed_queries += 1;
    }

    pub fn record_rebuild(&mut self, duration: Duration) {
        self.total_rebuilds += 1;
        self.last_rebuild = Some(duration);
    }

    pub fn total_queries(&self) -> u64 {
        self.total_queries
    }

    pub fn failed_queries(&self) -> u64 {
        self.failed_queries
    }

    pub fn total_rebuilds(&self) -> u64 {
        self.total_rebuilds
    }

    pub fn last_rebuild_ms(&self) -> Option<u64> {
        self.last_rebuild.map(|d| d.as_millis() as u64)
    }

    /// Mean number of vectors scored per query; the pruning ratio is this over N.
    pub fn avg_candidates(&self) -> f64 {
        match self.total_queries {
            0 => 0.0,
            n => self.total_candidates as f64 / n as f64,
        }
    }

    pub fn avg_query_latency_us(&self) -> f64 {
        if self.latencies_us.is_empty() {
            return 0.0;
        }
        let sum: u64 = self.latencies_us.iter().sum();
        sum as f64 / self.latencies_us.len() as f64
    }

    /// Nearest-rank percentile of the latency window (e.g. 50.0, 95.0, 99.0).
    pub fn percentile_query_latency_us(&self, percentile: f64) -> f64 {
        if self.latencies_us.is_empty() {
            return 0.0;
        }
        let mut samples: Vec<u64> = self.latencies_us.iter().copied().collect();
        let last = samples.len() - 1;
        let rank = ((percentile.clamp(0.0, 100.0) / 100.0) * last as f64).round() as usize;
        let (_, value, _) = samples.select_nth_unstable(rank.min(last));
        *value as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let mut m = MetricsCollector::new();
        m.record_query(Duration::from_micros(10), 30);
        m.record_query(Duration::from_micros(10), 10);
        m.record_failure();
        m.record_rebuild(Duration::from_millis(250));

        assert_eq!(m.total_queries(), 2);
        assert_eq!(m.failed_queries(), 1);
        assert_eq!(m.total_rebuilds(), 1);
        assert_eq!(m.last_rebuild_ms(), Some(250));
        assert!((m.avg_candidates() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_latency_percentiles() {
        let mut m = MetricsCollector::new();
        for us in [300, 100, 200] {
            m.record_query(Duration::from_micros(us), 1);
        }

        assert!((m.avg_query_latency_us() - 200.0).abs() < 1e-9);
        assert_eq!(m.percentile_query_latency_us(0.0), 100.0);
        assert_eq!(m.percentile_query_latency_us(50.0), 200.0);
        assert_eq!(m.percentile_query_latency_us(100.0), 300.0);
    }

    #[test]
    fn test_latency_window_rolls_over() {
        let mut m = MetricsCollector::new();
        m.record_query(Duration::from_secs(1), 1);
        for _ in 0..LATENCY_WINDOW {
            m.record_query(Duration::from_micros(5), 1);
        }
        assert_eq!(m.total_queries(), LATENCY_WINDOW as u64 + 1);
        assert_eq!(m.percentile_query_latency_us(100.0), 5.0);
    }

    #[test]
    fn test_empty() {
        let m = MetricsCollector::new();
        assert_eq!(m.avg_query_latency_us(), 0.0);
        assert_eq!(m.percentile_query_latency_us(99.0), 0.0);
        assert_eq!(m.avg_candidates(), 0.0);
        assert_eq!(m.last_rebuild_ms(), None);
    }
}
