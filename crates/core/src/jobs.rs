use std::fmt::Display;
use std::future::Future;
use tokio::task::JoinHandle;
use tracing::error;

/// Spawn a background task detached from the request that triggered
/// it. The task's failure is logged and swallowed, never surfaced to
/// the caller; anyone needing completion state polls for it.
pub fn spawn_detached<F, E>(task: &'static str, future: F) -> JoinHandle<()>
where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: Display,
{
    tokio::spawn(async move {
        if let Err(err) = future.await {
            error!(task, error = %err, "detached background task failed");
        }
    })
}
