//! Run independent operations in parallel and collect their outcomes.

use crate::error::DevboxError;
use crate::outcome::Outcome;
use futures::future::BoxFuture;
use std::future::Future;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// A set of independent operations joined by a single barrier.
///
/// Operations are queued with [`TaskGroup::add`] and only start when
/// [`TaskGroup::join`] is awaited. Each one runs as its own runtime task and
/// reports through a channel sized to the number of operations, so no task
/// ever waits on a full channel.
#[derive(Default)]
pub struct TaskGroup {
    operations: Vec<BoxFuture<'static, Outcome>>,
}

impl TaskGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F>(&mut self, operation: F)
    where
        F: Future<Output = Outcome> + Send + 'static,
    {
        self.operations.push(Box::pin(operation));
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Start every queued operation, wait for all of them and merge the results.
    ///
    /// Errors appear in completion order. A task that panics is reported as
    /// [`DevboxError::TaskFailed`].
    pub async fn join(self) -> Outcome {
        if self.operations.is_empty() {
            return Outcome::Ok;
        }

        let (sender, receiver) = mpsc::channel(self.operations.len());
        let mut tasks = JoinSet::new();

        for operation in self.operations {
            let sender = sender.clone();
            tasks.spawn(async move {
                let outcome = operation.await;
                // Capacity matches the number of senders, so this never waits.
                let _ = sender.send(outcome).await;
            });
        }
        drop(sender);

        let mut outcome = Outcome::drain(receiver).await;

        while let Some(joined) = tasks.join_next().await {
            if let Err(error) = joined {
                tracing::error!(%error, "install task did not complete");
                outcome.push(DevboxError::TaskFailed(error.to_string()));
            }
        }

        outcome
    }
}
