use crate::catalog;
use crate::client::MetricSource;
use crate::table::{format_timestamp, Table};
use crate::window::QueryWindow;
use chrono::{DateTime, Utc};
use csv::Writer;
use log::info;
use std::collections::BTreeMap;
use std::path::Path;

const MEMORY_USED: &str = "memory_used_bytes";
const MEMORY_MAX: &str = "memory_max_bytes";
const CPU_USAGE: &str = "cpu_usage";
const MEMORY_PERCENT: &str = "memory_usage_percent";
const CPU_PERCENT: &str = "cpu_usage_percent";

// Wide table joining the named combined-column series on timestamp: one
// row per timestamp, one cell per column that had a sample there.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombinedTable {
    // Populated query columns, catalog order. Derived columns aren't
    // listed here; the writer appends them when any row carries one.
    columns: Vec<String>,
    rows: BTreeMap<DateTime<Utc>, BTreeMap<String, f64>>,
}

// Queries every combined column, reduces each to one value per timestamp
// and outer-joins the results. Rows come out in ascending timestamp order.
pub fn build_combined<S: MetricSource>(source: &S, window: &QueryWindow) -> CombinedTable {
    info!("=== creating combined timeseries ===");
    let mut columns: Vec<String> = vec![];
    let mut rows: BTreeMap<DateTime<Utc>, BTreeMap<String, f64>> = BTreeMap::new();

    for (column, query) in catalog::COMBINED_COLUMNS {
        info!("  querying {}...", column);
        let table = Table::from_response(source.query_range(query, window));
        let series = reduce_first(&table);
        if series.is_empty() {
            info!("    -> no data");
            continue;
        }
        info!("    -> {} records", series.len());
        columns.push(column.to_string());
        for (timestamp, value) in series {
            rows.entry(timestamp)
                .or_default()
                .insert(column.to_string(), value);
        }
    }

    // Derived columns, only where both operands landed on the row.
    for cells in rows.values_mut() {
        if let (Some(&used), Some(&max)) = (cells.get(MEMORY_USED), cells.get(MEMORY_MAX)) {
            cells.insert(MEMORY_PERCENT.to_string(), used / max * 100.0);
        }
        if let Some(&cpu) = cells.get(CPU_USAGE) {
            cells.insert(CPU_PERCENT.to_string(), cpu * 100.0);
        }
    }

    CombinedTable { columns, rows }
}

// One value per timestamp: the first non-null record in arrival order
// wins, so a query matching several label sets keeps whichever series the
// server listed first.
fn reduce_first(table: &Table) -> BTreeMap<DateTime<Utc>, f64> {
    let mut series = BTreeMap::new();
    for record in table.rows() {
        if let Some(value) = record.value {
            series.entry(record.timestamp).or_insert(value);
        }
    }
    series
}

impl CombinedTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn get(&self, timestamp: DateTime<Utc>, column: &str) -> Option<f64> {
        self.rows.get(&timestamp).and_then(|cells| cells.get(column).copied())
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.rows.keys().copied().collect()
    }

    fn header(&self) -> Vec<String> {
        let mut header = vec!["timestamp".to_string()];
        header.extend(self.columns.iter().cloned());
        for derived in [MEMORY_PERCENT, CPU_PERCENT] {
            if self.rows.values().any(|cells| cells.contains_key(derived)) {
                header.push(derived.to_string());
            }
        }
        header
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), csv::Error> {
        let header = self.header();
        let mut writer = Writer::from_path(path)?;
        writer.write_record(&header)?;
        for (timestamp, cells) in &self.rows {
            let mut record: Vec<String> = vec![format_timestamp(*timestamp)];
            for column in &header[1..] {
                record.push(
                    cells
                        .get(column)
                        .map(|v| v.to_string())
                        .unwrap_or_default(),
                );
            }
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
pub mod tests {
    use super::{build_combined, reduce_first};
    use crate::export::tests::{window, FakeSource};
    use crate::table::{tests::response_from_json, Table};
    use chrono::{TimeZone, Utc};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_reduce_first_takes_first_series_on_ties() {
        let response = response_from_json(
            r#"{
                "status": "success",
                "data": {
                    "result": [
                        {"metric": {"instance": "a"}, "values": [[100, "1"]]},
                        {"metric": {"instance": "b"}, "values": [[100, "2"], [115, "3"]]}
                    ]
                }
            }"#,
        );
        let series = reduce_first(&Table::from_response(Some(response)));
        let at = |secs: i64| Utc.timestamp_opt(secs, 0).unwrap();
        assert_eq!(series.get(&at(100)), Some(&1.0));
        assert_eq!(series.get(&at(115)), Some(&3.0));
    }

    #[test]
    fn test_reduce_first_skips_null_values() {
        let response = response_from_json(
            r#"{
                "status": "success",
                "data": {
                    "result": [
                        {"metric": {"instance": "a"}, "values": [[100, "NaN"]]},
                        {"metric": {"instance": "b"}, "values": [[100, "2"]]}
                    ]
                }
            }"#,
        );
        let series = reduce_first(&Table::from_response(Some(response)));
        assert_eq!(series.get(&Utc.timestamp_opt(100, 0).unwrap()), Some(&2.0));
    }

    #[test]
    fn test_join_is_sparse_and_sorted() {
        let source = FakeSource::new()
            .with_series("app_requests_total", &[(115, "2"), (100, "1")])
            .with_series("app_queue_length", &[(130, "7")]);
        let combined = build_combined(&source, &window());

        assert_eq!(combined.columns(), ["requests_total", "queue_length"]);
        let at = |secs: i64| Utc.timestamp_opt(secs, 0).unwrap();
        assert_eq!(combined.timestamps(), vec![at(100), at(115), at(130)]);
        assert_eq!(combined.get(at(100), "requests_total"), Some(1.0));
        assert_eq!(combined.get(at(130), "requests_total"), None);
        assert_eq!(combined.get(at(130), "queue_length"), Some(7.0));
    }

    #[test]
    fn test_derived_columns_require_both_operands() {
        let source = FakeSource::new()
            .with_series(r#"jvm_memory_used_bytes{area="heap"}"#, &[(100, "50"), (115, "60")])
            .with_series(r#"jvm_memory_max_bytes{area="heap"}"#, &[(100, "200")])
            .with_series("process_cpu_usage", &[(115, "0.25")]);
        let combined = build_combined(&source, &window());

        let at = |secs: i64| Utc.timestamp_opt(secs, 0).unwrap();
        // Both memory operands at 100 -> derived present.
        assert_eq!(combined.get(at(100), "memory_usage_percent"), Some(25.0));
        // Max is missing at 115 -> no derived value there.
        assert_eq!(combined.get(at(115), "memory_usage_percent"), None);
        assert_eq!(combined.get(at(115), "cpu_usage_percent"), Some(25.0));
        assert_eq!(combined.get(at(100), "cpu_usage_percent"), None);
    }

    #[test]
    fn test_empty_when_nothing_matches() {
        let combined = build_combined(&FakeSource::new(), &window());
        assert!(combined.is_empty());
    }

    #[test]
    fn test_write_csv() {
        let source = FakeSource::new()
            .with_series("app_requests_total", &[(100, "1"), (115, "2")])
            .with_series("process_cpu_usage", &[(100, "0.5")]);
        let combined = build_combined(&source, &window());

        let dir = tempdir().unwrap();
        let path = dir.path().join("combined.csv");
        combined.write_csv(&path).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(
            lines[0],
            "timestamp,requests_total,cpu_usage,cpu_usage_percent"
        );
        assert_eq!(lines[1], "1970-01-01 00:01:40,1,0.5,50");
        // No cpu sample at the second timestamp: cells stay empty.
        assert_eq!(lines[2], "1970-01-01 00:01:55,2,,");
        assert_eq!(lines.len(), 3);
    }
}
