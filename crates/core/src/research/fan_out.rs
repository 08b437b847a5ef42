//! # Fan-Out / Fan-In
//!
//! Launches a batch of independent tasks at once and gathers their results
//! in completion order. Tasks only return values; all bookkeeping (result
//! collection, completion count) happens here, sequentially.
//!
//! ```text
//! items ──spawn──▶ JoinSet ──join_next──▶ results (completion order)
//!                              │
//!                              └──▶ on_progress("n/N completed")
//! ```

use std::fmt;
use std::future::Future;

use tokio::task::JoinSet;

/// Completion count after each finished task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanOutProgress {
    pub completed: usize,
    pub total: usize,
}

impl fmt::Display for FanOutProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} completed", self.completed, self.total)
    }
}

/// Everything a batch produced
#[derive(Debug, Clone)]
pub struct FanOutOutcome<R> {
    /// Present results, in the order they completed
    pub results: Vec<R>,
    /// Number of tasks that finished (always equals `total`)
    pub completed: usize,
    pub total: usize,
}

impl<R> FanOutOutcome<R> {
    /// Tasks that finished without a result
    pub fn failed(&self) -> usize {
        self.total - self.results.len()
    }
}

/// Run `task_fn` over every item concurrently.
///
/// All tasks are spawned before any is awaited. Absent results are dropped.
/// A panicking task counts as completed with no result. Returns only once
/// every spawned task has finished.
pub async fn fan_out<T, R, F, Fut, P>(
    items: Vec<T>,
    task_fn: F,
    mut on_progress: P,
) -> FanOutOutcome<R>
where
    R: Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future<Output = Option<R>> + Send + 'static,
    P: FnMut(FanOutProgress),
{
    let total = items.len();
    let mut join_set = JoinSet::new();

    // SCATTER
    for item in items {
        join_set.spawn(task_fn(item));
    }

    // GATHER
    let mut results = Vec::with_capacity(total);
    let mut completed = 0;

    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(Some(result)) => results.push(result),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Fan-out task did not finish cleanly"),
        }
        completed += 1;
        on_progress(FanOutProgress { completed, total });
    }

    FanOutOutcome {
        results,
        completed,
        total,
    }
}
