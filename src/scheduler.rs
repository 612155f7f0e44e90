use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

// Runs the export job once immediately, then once per interval, polling
// for due work on a short fixed cadence. Everything happens on the calling
// thread, so invocations can never overlap; a job that overruns scheduled
// marks skips them (see advance_due).
pub struct Scheduler {
    interval: Duration,
    poll: Duration,
}

impl Scheduler {
    pub fn new(interval: Duration, poll: Duration) -> Self {
        Self { interval, poll }
    }

    // Blocks until the shutdown flag is set or the job fails. The flag is
    // checked once per poll, so a stop request takes effect within one
    // poll interval (or after the running job finishes).
    pub fn run<F, E>(&self, shutdown: &AtomicBool, mut job: F) -> Result<(), E>
    where
        F: FnMut() -> Result<(), E>,
    {
        let mut due = Instant::now();
        loop {
            if shutdown.load(Ordering::SeqCst) {
                return Ok(());
            }
            if Instant::now() >= due {
                job()?;
                let (next, skipped) = advance_due(due, Instant::now(), self.interval);
                if skipped > 0 {
                    warn!(
                        "export overran {} scheduled cycle(s); skipping them",
                        skipped
                    );
                }
                due = next;
                info!(
                    "next export in {}s",
                    due.saturating_duration_since(Instant::now()).as_secs()
                );
            }
            std::thread::sleep(self.poll);
        }
    }
}

// Advances a due mark by whole intervals until it lands in the future,
// counting the marks that passed while the job ran.
fn advance_due(due: Instant, now: Instant, interval: Duration) -> (Instant, u64) {
    let mut next = due + interval;
    let mut skipped = 0;
    while next <= now {
        next += interval;
        skipped += 1;
    }
    (next, skipped)
}
