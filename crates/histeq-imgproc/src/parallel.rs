use rayon::prelude::*;
use thiserror::Error;

/// Errors that can occur during parallel execution.
#[derive(Error, Debug, PartialEq)]
pub enum ParallelError {
    /// The thread pool failed to build.
    #[error("failed to build thread pool: {0}")]
    BuildError(String),

    /// The requested thread count is invalid.
    #[error("thread count must be > 0, got {0}")]
    InvalidThreadCount(usize),

    /// A worker panicked while merging into a shared accumulator.
    #[error("a worker panicked while holding the histogram accumulator")]
    PoisonedAccumulator,
}

/// Controls how histogram equalization is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionStrategy {
    /// Run sequentially on the current thread.
    ///
    /// This is the reference the other strategies are checked against.
    #[default]
    Serial,

    /// Run on a local thread pool with `n` threads sharing the image.
    ///
    /// # Warning
    /// Creates a new thread pool on every call, which has significant overhead for small images.
    Fixed(usize),

    /// Run as `n` ranks that exchange row blocks by message passing only.
    Distributed(usize),
}

impl ExecutionStrategy {
    /// Number of workers or ranks taking part in the computation.
    pub fn num_workers(&self) -> usize {
        match self {
            ExecutionStrategy::Serial => 1,
            ExecutionStrategy::Fixed(n) | ExecutionStrategy::Distributed(n) => *n,
        }
    }

    /// Short name used in logs and output paths.
    pub fn tag(&self) -> &'static str {
        match self {
            ExecutionStrategy::Serial => "seq",
            ExecutionStrategy::Fixed(_) => "shared",
            ExecutionStrategy::Distributed(_) => "distributed",
        }
    }
}

/// Build a local thread pool with exactly `num_threads` threads.
///
/// # Errors
///
/// Returns an error if `num_threads` is zero or the pool cannot be created.
pub fn build_thread_pool(num_threads: usize) -> Result<rayon::ThreadPool, ParallelError> {
    if num_threads == 0 {
        return Err(ParallelError::InvalidThreadCount(num_threads));
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("histeq-worker-{i}"))
        .build()
        .map_err(|e| ParallelError::BuildError(e.to_string()))
}

/// Run `op` once per block on `pool`, one task per block.
///
/// The first error returned by any block is returned; the remaining blocks may or may not have
/// been processed.
pub fn try_for_each_block<B, E, F>(
    pool: &rayon::ThreadPool,
    blocks: Vec<B>,
    op: F,
) -> Result<(), E>
where
    B: Send,
    E: Send,
    F: Fn(usize, B) -> Result<(), E> + Sync + Send,
{
    pool.install(|| {
        blocks
            .into_par_iter()
            .with_max_len(1)
            .enumerate()
            .try_for_each(|(i, block)| op(i, block))
    })
}
