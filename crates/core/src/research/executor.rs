//! # Task Executor
//!
//! Runs one unit of sub-task work and normalizes failure to an absent
//! result. Used for individual searches inside a fan-out batch, where a
//! single miss must never abort the run.

use std::future::Future;

/// Await `task`, returning `Some` on success and `None` on failure.
///
/// Failures are logged at `warn` with `label` and then dropped.
pub async fn execute_task<Fut, R>(label: &str, task: Fut) -> Option<R>
where
    Fut: Future<Output = anyhow::Result<R>>,
{
    match task.await {
        Ok(result) => {
            tracing::debug!(task = label, "Task completed");
            Some(result)
        }
        Err(e) => {
            tracing::warn!(task = label, error = %e, "Task failed, result dropped");
            None
        }
    }
}
