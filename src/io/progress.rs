//! Progress display for batch decoding

use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicUsize, Ordering};

static BATCH_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_bar()
        .template("[{elapsed_precise}] Images: [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏ ")
});

/// Single progress bar shared by the decode threads of a batch
///
/// Completion calls take `&self`, so worker threads report directly.
#[derive(Debug)]
pub struct ProgressManager {
    bar: ProgressBar,
    failures: AtomicUsize,
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressManager {
    /// Create a manager with an empty, hidden-length bar
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(BATCH_STYLE.clone());
        Self {
            bar,
            failures: AtomicUsize::new(0),
        }
    }

    /// Size the bar for `file_count` images
    pub fn initialize(&self, file_count: usize) {
        self.bar.set_length(file_count as u64);
        self.bar.set_position(0);
        self.failures.store(0, Ordering::Relaxed);
    }

    /// Record one finished image and show its name
    pub fn complete_file(&self, path: &Path, succeeded: bool) {
        if !succeeded {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
        let name = path.file_name().unwrap_or_default().to_string_lossy();
        let mark = if succeeded { '✓' } else { '✗' };
        self.bar.set_message(format!("{mark} {name}"));
        self.bar.inc(1);
    }

    /// Images completed so far
    pub fn completed(&self) -> u64 {
        self.bar.position()
    }

    /// Images that failed to decode so far
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }

    /// Close the bar with a summary line
    pub fn finish(&self) {
        let failures = self.failures();
        if failures == 0 {
            self.bar.finish_with_message("All images decoded");
        } else {
            self.bar
                .finish_with_message(format!("{failures} image(s) failed"));
        }
    }
}
