// Static catalog of everything one export cycle queries. Definitions are
// grouped by metric kind; the exporters iterate them in declaration order.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricDef {
    pub name: &'static str,
    // Explicit query expression. Defaults to the metric name itself.
    pub query: Option<&'static str>,
    pub description: &'static str,
}

impl MetricDef {
    pub fn query_expr(&self) -> &str {
        self.query.unwrap_or(self.name)
    }

    pub fn count_query(&self) -> String {
        format!("{}_count", self.name)
    }

    pub fn sum_query(&self) -> String {
        format!("{}_sum", self.name)
    }

    pub fn quantile_query(&self, percentile: f64) -> String {
        format!(
            "histogram_quantile({}, rate({}_bucket[1m]))",
            percentile, self.name
        )
    }

    // Tag name for a percentile sub-table, e.g. `app_request_latency_seconds_p99`.
    pub fn percentile_name(&self, percentile: f64) -> String {
        format!("{}_p{}", self.name, (percentile * 100.0) as u32)
    }
}

pub const COUNTERS: &[MetricDef] = &[
    MetricDef {
        name: "app_requests_total",
        query: None,
        description: "Total requests",
    },
    MetricDef {
        name: "app_errors_total",
        query: None,
        description: "Total errors",
    },
    MetricDef {
        name: "app_connections_total",
        query: None,
        description: "Total connections",
    },
    MetricDef {
        name: "app_jobs_processed_total",
        query: None,
        description: "Total jobs processed",
    },
];

pub const GAUGES: &[MetricDef] = &[
    MetricDef {
        name: "process_cpu_usage",
        query: None,
        description: "CPU usage (0-1)",
    },
    MetricDef {
        name: "jvm_memory_used_bytes",
        query: Some(r#"jvm_memory_used_bytes{area="heap"}"#),
        description: "RAM used bytes",
    },
    MetricDef {
        name: "jvm_memory_max_bytes",
        query: Some(r#"jvm_memory_max_bytes{area="heap"}"#),
        description: "RAM max bytes",
    },
    MetricDef {
        name: "app_connections_current",
        query: None,
        description: "Current connections",
    },
    MetricDef {
        name: "app_queue_length",
        query: None,
        description: "Queue length",
    },
];

pub const HISTOGRAMS: &[MetricDef] = &[
    MetricDef {
        name: "app_request_latency_seconds",
        query: None,
        description: "Request latency",
    },
    MetricDef {
        name: "app_response_size_bytes",
        query: None,
        description: "Response size",
    },
    MetricDef {
        name: "app_processing_time_seconds",
        query: None,
        description: "Processing time",
    },
];

// Percentiles exported for every histogram, in output order.
pub const PERCENTILES: &[f64] = &[0.50, 0.90, 0.95, 0.99];

// Per-second rates and derived averages. Not catalog-driven: each entry is
// its own full query expression.
pub const RATE_QUERIES: &[(&str, &str)] = &[
    ("request_rate_per_sec", "rate(app_requests_total[1m])"),
    ("error_rate_per_sec", "rate(app_errors_total[1m])"),
    ("jobs_rate_per_sec", "rate(app_jobs_processed_total[1m])"),
    (
        "avg_latency_seconds",
        "rate(app_request_latency_seconds_sum[1m]) / rate(app_request_latency_seconds_count[1m])",
    ),
    (
        "avg_processing_time_seconds",
        "rate(app_processing_time_seconds_sum[1m]) / rate(app_processing_time_seconds_count[1m])",
    ),
];

// Columns of the combined wide table, joined on timestamp. Declaration
// order is the column order in the output file.
pub const COMBINED_COLUMNS: &[(&str, &str)] = &[
    ("requests_total", "app_requests_total"),
    ("errors_total", "app_errors_total"),
    ("connections_total", "app_connections_total"),
    ("jobs_processed", "app_jobs_processed_total"),
    ("cpu_usage", "process_cpu_usage"),
    ("memory_used_bytes", r#"jvm_memory_used_bytes{area="heap"}"#),
    ("memory_max_bytes", r#"jvm_memory_max_bytes{area="heap"}"#),
    ("connections_current", "app_connections_current"),
    ("queue_length", "app_queue_length"),
    ("request_rate", "rate(app_requests_total[1m])"),
    ("error_rate", "rate(app_errors_total[1m])"),
    (
        "latency_p50",
        "histogram_quantile(0.50, rate(app_request_latency_seconds_bucket[1m]))",
    ),
    (
        "latency_p95",
        "histogram_quantile(0.95, rate(app_request_latency_seconds_bucket[1m]))",
    ),
    (
        "latency_p99",
        "histogram_quantile(0.99, rate(app_request_latency_seconds_bucket[1m]))",
    ),
    (
        "avg_latency",
        "rate(app_request_latency_seconds_sum[1m]) / rate(app_request_latency_seconds_count[1m])",
    ),
    (
        "avg_processing_time",
        "rate(app_processing_time_seconds_sum[1m]) / rate(app_processing_time_seconds_count[1m])",
    ),
];

#[cfg(test)]
pub mod tests {
    use super::{MetricDef, COUNTERS, GAUGES, PERCENTILES};

    #[test]
    fn test_query_expr_defaults_to_name() {
        assert_eq!(COUNTERS[0].query_expr(), "app_requests_total");
    }

    #[test]
    fn test_query_expr_uses_override() {
        assert_eq!(
            GAUGES[1].query_expr(),
            r#"jvm_memory_used_bytes{area="heap"}"#
        );
    }

    #[test]
    fn test_histogram_queries() {
        let def = MetricDef {
            name: "app_request_latency_seconds",
            query: None,
            description: "Request latency",
        };
        assert_eq!(def.count_query(), "app_request_latency_seconds_count");
        assert_eq!(def.sum_query(), "app_request_latency_seconds_sum");
        assert_eq!(
            def.quantile_query(0.95),
            "histogram_quantile(0.95, rate(app_request_latency_seconds_bucket[1m]))"
        );
    }

    #[test]
    fn test_percentile_names() {
        let def = MetricDef {
            name: "app_response_size_bytes",
            query: None,
            description: "Response size",
        };
        let names: Vec<String> = PERCENTILES
            .iter()
            .map(|p| def.percentile_name(*p))
            .collect();
        assert_eq!(
            names,
            vec![
                "app_response_size_bytes_p50",
                "app_response_size_bytes_p90",
                "app_response_size_bytes_p95",
                "app_response_size_bytes_p99",
            ]
        );
    }
}
