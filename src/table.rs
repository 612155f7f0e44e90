use crate::client::RangeResponse;
use chrono::{DateTime, TimeZone, Utc};
use csv::Writer;
use log::debug;
use std::collections::BTreeMap;
use std::path::Path;

// One flattened sample. Labels differ between series, so rows in a table
// don't share a fixed schema beyond the common columns; the CSV writer
// pads the union.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub timestamp: DateTime<Utc>,
    // None when the server reported the NaN sentinel for this step.
    pub value: Option<f64>,
    pub labels: BTreeMap<String, String>,
    pub metric_name: String,
    pub metric_type: String,
    pub percentile: Option<f64>,
}

// Ordered sequence of records from one or more queries. Row order is
// arrival order; nothing here sorts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    rows: Vec<Record>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    // Flattens a range response into rows, one per (series, sample).
    // Absent responses, error statuses and empty matches all flatten to an
    // empty table.
    pub fn from_response(response: Option<RangeResponse>) -> Self {
        let response = match response {
            Some(response) => response,
            None => return Self::new(),
        };
        if !response.is_success() {
            return Self::new();
        }

        let mut rows = vec![];
        for series in response.data.result {
            for sample in &series.values {
                let timestamp = match timestamp_from_epoch(sample.0) {
                    Some(timestamp) => timestamp,
                    None => {
                        debug!("dropping sample with unrepresentable timestamp {}", sample.0);
                        continue;
                    }
                };
                rows.push(Record {
                    timestamp,
                    value: parse_value(&sample.1),
                    labels: series.metric.clone(),
                    metric_name: String::new(),
                    metric_type: String::new(),
                    percentile: None,
                });
            }
        }
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    // Stamps every row with the metric it came from. Applied by the
    // exporter, which knows the catalog entry; the flattener doesn't.
    pub fn tagged(mut self, metric_name: &str, metric_type: &str) -> Self {
        for row in &mut self.rows {
            row.metric_name = metric_name.to_string();
            row.metric_type = metric_type.to_string();
        }
        self
    }

    pub fn with_percentile(mut self, percentile: f64) -> Self {
        for row in &mut self.rows {
            row.percentile = Some(percentile);
        }
        self
    }

    pub fn append(&mut self, mut other: Table) {
        self.rows.append(&mut other.rows);
    }

    // Label keys across all rows, in first-seen order. These become the
    // variable part of the CSV header.
    fn label_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = vec![];
        for row in &self.rows {
            for key in row.labels.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }
        columns
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), csv::Error> {
        let label_columns = self.label_columns();
        let has_percentile = self.rows.iter().any(|r| r.percentile.is_some());

        let mut header: Vec<String> = vec!["timestamp".to_string(), "value".to_string()];
        header.extend(label_columns.iter().cloned());
        header.push("metric_name".to_string());
        header.push("metric_type".to_string());
        if has_percentile {
            header.push("percentile".to_string());
        }

        let mut writer = Writer::from_path(path)?;
        writer.write_record(&header)?;
        for row in &self.rows {
            let mut cells: Vec<String> = vec![
                format_timestamp(row.timestamp),
                format_value(row.value),
            ];
            for column in &label_columns {
                cells.push(row.labels.get(column).cloned().unwrap_or_default());
            }
            cells.push(row.metric_name.clone());
            cells.push(row.metric_type.clone());
            if has_percentile {
                cells.push(row.percentile.map(|p| p.to_string()).unwrap_or_default());
            }
            writer.write_record(&cells)?;
        }
        writer.flush()?;
        Ok(())
    }
}

pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn format_value(value: Option<f64>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => String::new(),
    }
}

fn parse_value(raw: &str) -> Option<f64> {
    if raw == "NaN" {
        return None;
    }
    match raw.parse::<f64>() {
        Ok(value) => Some(value),
        Err(_) => {
            debug!("dropping unparseable sample value {:?}", raw);
            None
        }
    }
}

fn timestamp_from_epoch(epoch: f64) -> Option<DateTime<Utc>> {
    let secs = epoch.trunc() as i64;
    let nanos = ((epoch - epoch.trunc()) * 1e9).round() as u32;
    Utc.timestamp_opt(secs, nanos).single()
}
