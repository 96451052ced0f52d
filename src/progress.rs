use std::io::{self, Write};

/// Lightweight progress reporting for long batch runs.
pub trait Progress {
    /// Called at the start with the total number of items.
    fn begin(&mut self, _total: usize) {}

    /// Called when one item finishes, success or failure.
    fn item_done(&mut self, _label: &str) {}

    /// Called at the end of the run.
    fn finish(&mut self) {}
}

/// A no-op progress sink.
pub struct NullProgress;
impl Progress for NullProgress {}

/// Single-line `[done/total]` counter on stderr.
#[derive(Default)]
pub struct ConsoleProgress {
    done: usize,
    total: usize,
}

impl ConsoleProgress {
    pub fn new() -> ConsoleProgress {
        ConsoleProgress::default()
    }
}

impl Progress for ConsoleProgress {
    fn begin(&mut self, total: usize) {
        self.done = 0;
        self.total = total;
    }

    fn item_done(&mut self, label: &str) {
        self.done += 1;
        eprint!("\r[{}/{}] {:<40}", self.done, self.total, label);
        let _ = io::stderr().flush();
    }

    fn finish(&mut self) {
        if self.total > 0 {
            eprintln!();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_items() {
        let mut progress = ConsoleProgress::new();
        progress.begin(2);
        progress.item_done("2022-23 Stephen Curry");
        progress.item_done("2022-23 Klay Thompson");
        assert_eq!(progress.done, 2);
        progress.finish();
    }
}
