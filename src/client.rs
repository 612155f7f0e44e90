use crate::config::Config;
use crate::window::QueryWindow;
use log::error;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

// Range queries get a generous timeout; the probe is only a liveness check
// and should fail fast.
const QUERY_TIMEOUT: Duration = Duration::from_secs(30);
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("error reaching query endpoint")]
    Http(#[from] reqwest::Error),
    #[error("query endpoint returned status {0}")]
    Status(reqwest::StatusCode),
}

// Decoded body of a range query. Shapes the API doesn't fill in (error
// payloads, empty matches) decode to their defaults rather than failing.
#[derive(Debug, Clone, Deserialize)]
pub struct RangeResponse {
    pub status: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub data: RangeData,
}

impl RangeResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RangeData {
    #[serde(default)]
    pub result: Vec<RangeSeries>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RangeSeries {
    #[serde(default)]
    pub metric: BTreeMap<String, String>,
    #[serde(default)]
    pub values: Vec<Sample>,
}

// One (epoch seconds, value) pair. The value arrives as a string; "NaN" is
// a valid payload for series with no computable value at that step.
#[derive(Debug, Clone, Deserialize)]
pub struct Sample(pub f64, pub String);

// Seam between the exporters and the network. The exporters only ever see
// this trait, so tests (or an alternative backend) can feed them canned
// series without a server.
pub trait MetricSource {
    // One range query. Any transport or status failure is logged and
    // reported as "no result"; it never propagates.
    fn query_range(&self, expr: &str, window: &QueryWindow) -> Option<RangeResponse>;

    // Cheap liveness check against the server, used to gate a whole cycle.
    fn probe(&self) -> Result<(), ClientError>;
}

pub struct PromClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl PromClient {
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(QUERY_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: config.prometheus_url.trim_end_matches('/').to_string(),
        })
    }

    fn try_query_range(
        &self,
        expr: &str,
        window: &QueryWindow,
    ) -> Result<RangeResponse, ClientError> {
        let url = format!("{}/api/v1/query_range", self.base_url);
        let start = window.start_param();
        let end = window.end_param();
        let step = window.step_param();
        let response = self
            .http
            .get(&url)
            .query(&[
                ("query", expr),
                ("start", start.as_str()),
                ("end", end.as_str()),
                ("step", step.as_str()),
            ])
            .send()?;
        if !response.status().is_success() {
            return Err(ClientError::Status(response.status()));
        }
        Ok(response.json()?)
    }
}

impl MetricSource for PromClient {
    fn query_range(&self, expr: &str, window: &QueryWindow) -> Option<RangeResponse> {
        match self.try_query_range(expr, window) {
            Ok(response) => Some(response),
            Err(e) => {
                error!("error querying {}: {}", expr, e);
                None
            }
        }
    }

    fn probe(&self) -> Result<(), ClientError> {
        let url = format!("{}/api/v1/status/config", self.base_url);
        let response = self.http.get(&url).timeout(PROBE_TIMEOUT).send()?;
        if !response.status().is_success() {
            return Err(ClientError::Status(response.status()));
        }
        Ok(())
    }
}
