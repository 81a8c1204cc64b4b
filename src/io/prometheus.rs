//! Prometheus text exposition of gateway metrics
//!
//! Served by the gateway's own HTTP listener at `GET /metrics`.

use crate::infra::metrics::{
    Metrics, MetricsSummary, Upstream, UpstreamSummary, METRICS_BUCKET_BOUNDS,
    METRICS_NUM_BUCKETS, OPERATIONS,
};
use std::fmt::Write;

pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Prometheus metric type
enum MetricType {
    Counter,
    Gauge,
}

impl MetricType {
    fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
        }
    }
}

fn write_header(output: &mut String, name: &str, help: &str, typ: &str) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} {typ}");
}

/// Write a metric with one sample per label value
fn write_labeled(
    output: &mut String,
    name: &str,
    help: &str,
    typ: MetricType,
    label: &str,
    samples: &[(&str, u64)],
) {
    write_header(output, name, help, typ.as_str());
    for (value, sample) in samples {
        let _ = writeln!(output, "{name}{{{label}=\"{value}\"}} {sample}");
    }
}

/// Write histogram samples (buckets, sum, count) for one upstream
fn write_histogram_samples(output: &mut String, name: &str, upstream: &str, s: &UpstreamSummary) {
    let buckets: &[u64; METRICS_NUM_BUCKETS] = &s.latency_buckets;

    let mut cumulative = 0u64;
    for (i, &bound) in METRICS_BUCKET_BOUNDS.iter().enumerate() {
        cumulative += buckets[i];
        let _ = writeln!(output, "{name}_bucket{{upstream=\"{upstream}\",le=\"{bound}\"}} {cumulative}");
    }
    cumulative += buckets[METRICS_NUM_BUCKETS - 1];
    let _ = writeln!(output, "{name}_bucket{{upstream=\"{upstream}\",le=\"+Inf\"}} {cumulative}");
    let _ = writeln!(output, "{name}_sum{{upstream=\"{upstream}\"}} {}", s.latency_sum_ms);
    let _ = writeln!(output, "{name}_count{{upstream=\"{upstream}\"}} {cumulative}");
}

/// Format metrics in Prometheus text exposition format
pub fn format_prometheus_metrics(metrics: &Metrics) -> String {
    let summary = metrics.snapshot();
    let mut output = String::with_capacity(4096);

    write_request_metrics(&mut output, &summary);
    write_upstream_metrics(&mut output, &summary);

    output
}

fn write_request_metrics(output: &mut String, summary: &MetricsSummary) {
    let per_op: Vec<(&str, u64)> = OPERATIONS
        .iter()
        .zip(summary.requests_total.iter())
        .map(|(op, &count)| (op.as_str(), count))
        .collect();
    write_labeled(
        output,
        "gateway_requests_total",
        "Requests received per operation",
        MetricType::Counter,
        "op",
        &per_op,
    );

    write_labeled(
        output,
        "gateway_responses_total",
        "Responses sent per status class",
        MetricType::Counter,
        "class",
        &[
            ("2xx", summary.responses_2xx),
            ("4xx", summary.responses_4xx),
            ("5xx", summary.responses_5xx),
        ],
    );
}

fn write_upstream_metrics(output: &mut String, summary: &MetricsSummary) {
    let upstreams = [
        (Upstream::Postal.as_str(), &summary.postal),
        (Upstream::Backend.as_str(), &summary.backend),
    ];

    write_labeled(
        output,
        "gateway_upstream_calls_total",
        "Outbound calls per upstream",
        MetricType::Counter,
        "upstream",
        &upstreams.map(|(name, s)| (name, s.calls_total)),
    );
    write_labeled(
        output,
        "gateway_upstream_failures_total",
        "Outbound calls that failed at transport level or returned non-2xx",
        MetricType::Counter,
        "upstream",
        &upstreams.map(|(name, s)| (name, s.failures_total)),
    );

    let name = "gateway_upstream_latency_ms";
    write_header(output, name, "Outbound call latency in milliseconds", "histogram");
    for (upstream, s) in upstreams {
        write_histogram_samples(output, name, upstream, s);
    }

    write_labeled(
        output,
        "gateway_upstream_latency_p99_ms",
        "99th percentile outbound call latency",
        MetricType::Gauge,
        "upstream",
        &upstreams.map(|(name, s)| (name, s.latency_p99_ms)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::Operation;

    #[test]
    fn test_format_prometheus_metrics() {
        let metrics = Metrics::new();

        metrics.record_request(Operation::CreateUser);
        metrics.record_request(Operation::CreateUser);
        metrics.record_response(200);
        metrics.record_response(404);
        metrics.record_upstream_call(Upstream::Postal, 40, true);
        metrics.record_upstream_call(Upstream::Backend, 7, true);

        let output = format_prometheus_metrics(&metrics);

        assert!(output.contains("gateway_requests_total{op=\"create_user\"} 2"));
        assert!(output.contains("gateway_requests_total{op=\"delete_user\"} 0"));
        assert!(output.contains("gateway_responses_total{class=\"4xx\"} 1"));
        assert!(output.contains("gateway_upstream_calls_total{upstream=\"postal\"} 1"));
        assert!(output.contains("gateway_upstream_latency_ms_bucket{upstream=\"postal\",le=\"50\"} 1"));
        assert!(output.contains("gateway_upstream_latency_ms_bucket{upstream=\"backend\",le=\"+Inf\"} 1"));
        assert!(output.contains("gateway_upstream_latency_ms_sum{upstream=\"postal\"} 40"));
    }
}
