use anyhow::Result;
use clap::Parser;
use log::info;
use promsnap::client::PromClient;
use promsnap::config::{Config, DEFAULT_OUTPUT_DIR, DEFAULT_PROMETHEUS_URL};
use promsnap::export::Driver;
use promsnap::scheduler::Scheduler;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "promsnap")]
#[command(about = "Periodically exports Prometheus metrics to CSV snapshots")]
struct Args {
    /// Base URL of the Prometheus server
    #[arg(long, default_value = DEFAULT_PROMETHEUS_URL)]
    prometheus_url: String,

    /// Directory CSV snapshots are written into
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Sampling step for range queries, in seconds
    #[arg(long, default_value_t = 15)]
    step_secs: u64,

    /// Hours between export cycles; each cycle looks back this far
    #[arg(long, default_value_t = 24)]
    interval_hours: u64,

    /// Run a single export cycle and exit
    #[arg(long)]
    once: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = Config {
        prometheus_url: args.prometheus_url,
        output_dir: args.output_dir,
        step_secs: args.step_secs,
        lookback: Duration::from_secs(args.interval_hours * 3600),
        interval: Duration::from_secs(args.interval_hours * 3600),
        ..Default::default()
    };
    config.validate()?;

    let shutdown = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&shutdown))?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&shutdown))?;

    info!("prometheus url: {}", config.prometheus_url);
    info!("output directory: {}", config.output_dir.display());
    info!("schedule: every {} hours from now", args.interval_hours);

    let interval = config.interval;
    let poll = config.poll;
    let client = PromClient::new(&config)?;
    let driver = Driver::new(config, client);

    if args.once {
        driver.run_cycle()?;
        return Ok(());
    }

    Scheduler::new(interval, poll).run(&shutdown, || driver.run_cycle().map(|_| ()))?;
    info!("scheduler stopped by operator");
    Ok(())
}
