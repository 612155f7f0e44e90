use crate::catalog::{self, MetricDef};
use crate::client::MetricSource;
use crate::table::Table;
use crate::window::QueryWindow;
use log::info;

mod combined;
mod driver;

pub use combined::{build_combined, CombinedTable};
pub use driver::{CycleSummary, Driver, ExportError};

// Shared loop for the catalog-driven categories: query each definition,
// keep non-empty results, tag and concatenate in visitation order.
fn export_catalog<S: MetricSource>(
    source: &S,
    defs: &[MetricDef],
    metric_type: &str,
    window: &QueryWindow,
) -> Table {
    let mut combined = Table::new();
    for def in defs {
        info!("  querying {}...", def.name);
        let table = Table::from_response(source.query_range(def.query_expr(), window));
        if table.is_empty() {
            info!("    -> no data");
            continue;
        }
        let table = table.tagged(def.name, metric_type);
        info!("    -> {} records", table.len());
        combined.append(table);
    }
    combined
}

pub fn export_counters<S: MetricSource>(source: &S, window: &QueryWindow) -> Table {
    info!("=== exporting counter metrics ===");
    export_catalog(source, catalog::COUNTERS, "counter", window)
}

pub fn export_gauges<S: MetricSource>(source: &S, window: &QueryWindow) -> Table {
    info!("=== exporting gauge metrics ===");
    export_catalog(source, catalog::GAUGES, "gauge", window)
}

// Histograms fan out into several queries per definition: the cumulative
// count, the sum, and one quantile estimation per exported percentile.
// Sub-table order per definition is count, sum, then percentiles.
pub fn export_histograms<S: MetricSource>(source: &S, window: &QueryWindow) -> Table {
    info!("=== exporting histogram metrics ===");
    let mut combined = Table::new();
    for def in catalog::HISTOGRAMS {
        info!("  querying {}...", def.name);

        let count_query = def.count_query();
        let count = Table::from_response(source.query_range(&count_query, window));
        if !count.is_empty() {
            let count = count.tagged(&count_query, "histogram_count");
            info!("    -> count: {} records", count.len());
            combined.append(count);
        }

        let sum_query = def.sum_query();
        let sum = Table::from_response(source.query_range(&sum_query, window));
        if !sum.is_empty() {
            let sum = sum.tagged(&sum_query, "histogram_sum");
            info!("    -> sum: {} records", sum.len());
            combined.append(sum);
        }

        for &percentile in catalog::PERCENTILES {
            let table =
                Table::from_response(source.query_range(&def.quantile_query(percentile), window));
            if !table.is_empty() {
                let table = table
                    .tagged(&def.percentile_name(percentile), "histogram_percentile")
                    .with_percentile(percentile);
                info!(
                    "    -> p{}: {} records",
                    (percentile * 100.0) as u32,
                    table.len()
                );
                combined.append(table);
            }
        }
    }
    combined
}

pub fn export_rates<S: MetricSource>(source: &S, window: &QueryWindow) -> Table {
    info!("=== exporting rate metrics ===");
    let mut combined = Table::new();
    for (name, query) in catalog::RATE_QUERIES {
        info!("  querying {}...", name);
        let table = Table::from_response(source.query_range(query, window));
        if table.is_empty() {
            info!("    -> no data");
            continue;
        }
        let table = table.tagged(name, "rate");
        info!("    -> {} records", table.len());
        combined.append(table);
    }
    combined
}
