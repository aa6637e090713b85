use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::IoError;

const CSV_HEADER: &str = "strategy,workers,width,height,millis";

/// Run `f` and return its result together with the elapsed wall-clock time.
///
/// # Examples
///
/// ```
/// use histeq_io::runtime::measure_runtime;
///
/// let (sum, elapsed) = measure_runtime(|| (0..100u32).sum::<u32>());
/// assert_eq!(sum, 4950);
/// assert!(elapsed.as_secs() < 60);
/// ```
pub fn measure_runtime<R>(f: impl FnOnce() -> R) -> (R, Duration) {
    let start = Instant::now();
    let result = f();
    (result, start.elapsed())
}

/// One timed equalization run.
#[derive(Clone, Debug, PartialEq)]
pub struct RuntimeRecord {
    /// Strategy tag, e.g. `seq`.
    pub strategy: String,
    /// Number of workers or ranks.
    pub workers: usize,
    /// Image width in pixels.
    pub width: usize,
    /// Image height in pixels.
    pub height: usize,
    /// Elapsed time of the equalization.
    pub elapsed: Duration,
}

impl RuntimeRecord {
    fn to_csv(&self) -> String {
        format!(
            "{},{},{},{},{:.3}",
            self.strategy,
            self.workers,
            self.width,
            self.height,
            self.elapsed.as_secs_f64() * 1e3
        )
    }
}

/// Appends [`RuntimeRecord`]s to a CSV file, writing the header when the file is new.
#[derive(Clone, Debug)]
pub struct RuntimeLog {
    path: PathBuf,
}

impl RuntimeLog {
    /// Create a log that appends to `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Append one record.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or written.
    pub fn append(&self, record: &RuntimeRecord) -> Result<(), IoError> {
        let is_new = !self.path.exists();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        if is_new {
            writeln!(file, "{CSV_HEADER}")?;
        }
        writeln!(file, "{}", record.to_csv())?;
        Ok(())
    }
}
