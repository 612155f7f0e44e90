use chrono::{DateTime, Duration, SecondsFormat, Utc};

// Time range a single export cycle queries over. All exporters in a cycle
// share one window so their rows line up on the same step grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub step_secs: u64,
}

impl QueryWindow {
    pub fn lookback(end: DateTime<Utc>, lookback: std::time::Duration, step_secs: u64) -> Self {
        let start = end - Duration::seconds(lookback.as_secs() as i64);
        Self {
            start,
            end,
            step_secs,
        }
    }

    pub fn start_param(&self) -> String {
        self.start.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    pub fn end_param(&self) -> String {
        self.end.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    pub fn step_param(&self) -> String {
        format!("{}s", self.step_secs)
    }
}
