use std::error::Error;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use log::error;
use rand::Rng;

use crate::progress::Progress;
use crate::retry::{with_retry, RetryPolicy};
use crate::roster::Season;
use crate::stats::error::FetchError;

/// One unit of fetch work. Immutable once enqueued.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
    pub player: String,
    pub season: Season,
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.season, self.player)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RunnerConfig {
    pub max_workers: usize,
    /// Minimum pause each worker takes after one of its own requests.
    pub rate_limit: Duration,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub item: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: Vec<Failure>,
}

impl RunSummary {
    pub fn all_ok(&self) -> bool {
        self.failed.is_empty()
    }

    /// One `item<TAB>reason` line per failure, the format the follow-up
    /// scripts grep for.
    pub fn write_report(&self, path: &Path) -> io::Result<()> {
        let mut buffer = String::new();
        for f in &self.failed {
            buffer.push_str(&f.item);
            buffer.push('\t');
            buffer.push_str(&f.reason);
            buffer.push('\n');
        }
        fs::write(path, buffer)
    }
}

/// Drain `items` with a bounded pool of worker threads.
///
/// Workers pull from a shared cursor, run `fetch` with the configured retry
/// policy, and pause `rate_limit` (plus up to 30% jitter) after every
/// request they make; the throttle is per worker, so the aggregate request
/// rate scales with `max_workers`. Results come back over a channel to the
/// calling thread, which alone runs `sink` — it is the only writer of
/// output files — and drives `progress`.
///
/// A failed item (permanent error, exhausted retries, or a sink error)
/// is recorded in the summary and never aborts the batch. The run returns
/// once every item has been attempted.
pub fn run<T, R, F, S>(
    items: &[T],
    config: &RunnerConfig,
    fetch: F,
    mut sink: S,
    progress: &mut dyn Progress,
) -> RunSummary
where
    T: fmt::Display + Sync,
    R: Send,
    F: Fn(&T) -> Result<R, FetchError> + Sync,
    S: FnMut(&T, R) -> Result<(), Box<dyn Error>>,
{
    let workers = config.max_workers.clamp(1, items.len().max(1));
    let cursor = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel::<(usize, Result<R, FetchError>)>();

    progress.begin(items.len());
    let mut summary = RunSummary::default();

    thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let cursor = &cursor;
            let fetch = &fetch;
            scope.spawn(move || {
                let mut rng = rand::rng();
                loop {
                    let i = cursor.fetch_add(1, Ordering::Relaxed);
                    if i >= items.len() {
                        break;
                    }
                    let item = &items[i];
                    let result = with_retry(&config.retry, &item.to_string(), || fetch(item));
                    if tx.send((i, result)).is_err() {
                        break;
                    }
                    // be polite
                    if !config.rate_limit.is_zero() {
                        let jitter = rng.random_range(0.0..0.3);
                        thread::sleep(config.rate_limit.mul_f64(1.0 + jitter));
                    }
                }
            });
        }
        drop(tx);

        for (i, result) in rx {
            let item = &items[i];
            match result {
                Ok(value) => match sink(item, value) {
                    Ok(()) => summary.succeeded += 1,
                    Err(e) => {
                        error!("{}: write failed: {}", item, e);
                        summary.failed.push(Failure {
                            item: item.to_string(),
                            reason: format!("write failed: {}", e),
                        });
                    }
                },
                Err(e) => {
                    summary.failed.push(Failure {
                        item: item.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
            progress.item_done(&item.to_string());
        }
    });

    progress.finish();
    summary
}
