use super::{
    build_combined, export_counters, export_gauges, export_histograms, export_rates,
};
use crate::client::MetricSource;
use crate::config::Config;
use crate::table::Table;
use crate::window::QueryWindow;
use chrono::Utc;
use log::{error, info};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("error creating output directory")]
    OutputDir(#[source] std::io::Error),
    #[error("error writing csv file")]
    Csv(#[from] csv::Error),
}

// What one cycle did: whether it was skipped at the probe, and the files
// it wrote. Files from the same cycle share one timestamp suffix.
#[derive(Debug, Default)]
pub struct CycleSummary {
    pub skipped: bool,
    pub files: Vec<PathBuf>,
}

// Runs one full export cycle against a metric source: compute the query
// window, probe, run every exporter, write the non-empty tables.
pub struct Driver<S> {
    config: Config,
    source: S,
}

impl<S: MetricSource> Driver<S> {
    pub fn new(config: Config, source: S) -> Self {
        Self { config, source }
    }

    pub fn run_cycle(&self) -> Result<CycleSummary, ExportError> {
        info!("starting metrics export cycle");
        fs::create_dir_all(&self.config.output_dir).map_err(ExportError::OutputDir)?;

        let window = QueryWindow::lookback(Utc::now(), self.config.lookback, self.config.step_secs);
        info!(
            "exporting metrics from {} to {} (step {}s)",
            window.start, window.end, window.step_secs
        );
        info!("output directory: {}", self.config.output_dir.display());

        if let Err(e) = self.source.probe() {
            error!(
                "cannot connect to {}: {}; skipping this export cycle",
                self.config.prometheus_url, e
            );
            return Ok(CycleSummary {
                skipped: true,
                files: vec![],
            });
        }
        info!("connected to {}", self.config.prometheus_url);

        // Exporters run independently; one coming back empty never blocks
        // the others.
        let counters = export_counters(&self.source, &window);
        let gauges = export_gauges(&self.source, &window);
        let histograms = export_histograms(&self.source, &window);
        let rates = export_rates(&self.source, &window);
        let combined = build_combined(&self.source, &window);

        let stamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let mut files = vec![];
        self.save_table(&counters, "counters", &stamp, &mut files)?;
        self.save_table(&gauges, "gauges", &stamp, &mut files)?;
        self.save_table(&histograms, "histograms", &stamp, &mut files)?;
        self.save_table(&rates, "rates", &stamp, &mut files)?;
        if !combined.is_empty() {
            let path = self.output_path("combined_timeseries", &stamp);
            combined.write_csv(&path)?;
            info!("saved: {} ({} rows)", path.display(), combined.len());
            files.push(path);
        }

        info!("export cycle complete, {} file(s) written", files.len());
        Ok(CycleSummary {
            skipped: false,
            files,
        })
    }

    fn save_table(
        &self,
        table: &Table,
        category: &str,
        stamp: &str,
        files: &mut Vec<PathBuf>,
    ) -> Result<(), ExportError> {
        if table.is_empty() {
            return Ok(());
        }
        let path = self.output_path(category, stamp);
        table.write_csv(&path)?;
        info!("saved: {} ({} rows)", path.display(), table.len());
        files.push(path);
        Ok(())
    }

    fn output_path(&self, category: &str, stamp: &str) -> PathBuf {
        self.config.output_dir.join(format!("{}_{}.csv", category, stamp))
    }
}
