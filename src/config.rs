use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PROMETHEUS_URL: &str = "http://localhost:9090";
pub const DEFAULT_OUTPUT_DIR: &str = "./exported_data";

pub struct Config {
    // Base URL of the Prometheus server, without a trailing path.
    pub prometheus_url: String,
    // Directory CSV snapshots are written into. Created on demand.
    pub output_dir: PathBuf,
    // Sampling step for range queries, in seconds.
    pub step_secs: u64,
    // How far back each export cycle reaches from now.
    pub lookback: Duration,
    // Time between scheduled export cycles.
    pub interval: Duration,
    // How often the scheduler checks whether a cycle is due.
    pub poll: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prometheus_url: DEFAULT_PROMETHEUS_URL.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            step_secs: 15,
            lookback: Duration::from_secs(24 * 60 * 60),
            interval: Duration::from_secs(24 * 60 * 60),
            poll: Duration::from_secs(60),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("prometheus url is empty")]
    EmptyUrl,
    #[error("output directory is empty")]
    EmptyOutputDir,
    #[error("query step must be greater than zero")]
    ZeroStep,
    #[error("lookback window must be greater than zero")]
    ZeroLookback,
    #[error("poll interval must be greater than zero")]
    ZeroPoll,
    #[error("poll interval is longer than the export interval")]
    PollExceedsInterval,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prometheus_url.is_empty() {
            return Err(ConfigError::EmptyUrl);
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyOutputDir);
        }
        if self.step_secs == 0 {
            return Err(ConfigError::ZeroStep);
        }
        if self.lookback.is_zero() {
            return Err(ConfigError::ZeroLookback);
        }
        if self.poll.is_zero() {
            return Err(ConfigError::ZeroPoll);
        }
        if self.poll > self.interval {
            return Err(ConfigError::PollExceedsInterval);
        }
        Ok(())
    }
}

#[cfg(test)]
pub mod tests {
    use super::{Config, ConfigError};
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_config_empty_url() {
        let config = Config {
            prometheus_url: String::new(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::EmptyUrl)));
    }

    #[test]
    fn test_invalid_config_empty_output_dir() {
        let config = Config {
            output_dir: PathBuf::new(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyOutputDir)
        ));
    }

    #[test]
    fn test_invalid_config_zero_step() {
        let config = Config {
            step_secs: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroStep)));
    }

    #[test]
    fn test_invalid_config_zero_lookback() {
        let config = Config {
            lookback: Duration::ZERO,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroLookback)));
    }

    #[test]
    fn test_invalid_config_poll_exceeds_interval() {
        let config = Config {
            interval: Duration::from_secs(30),
            poll: Duration::from_secs(60),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PollExceedsInterval)
        ));
    }
}
