//! Supervisor for fire-and-forget background work.
//!
//! Tasks spawned here never take the process down: a panic inside a task is
//! caught at the task boundary and logged. Shutdown calls [`TaskSupervisor::drain`]
//! so in-flight side effects finish before the process exits.

use std::{any::Any, future::Future, panic::AssertUnwindSafe};

use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

#[derive(Clone, Default)]
pub struct TaskSupervisor {
    tracker: TaskTracker,
}

impl TaskSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `fut` in the background under this supervisor.
    pub fn spawn<F>(&self, name: &'static str, fut: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn(async move {
            if let Err(panic) = AssertUnwindSafe(fut).catch_unwind().await {
                tracing::error!(
                    task = name,
                    panic = %panic_message(&*panic),
                    "background task panicked"
                );
            }
        })
    }

    /// Number of spawned tasks that have not finished yet.
    pub fn outstanding(&self) -> usize {
        self.tracker.len()
    }

    /// Stop accepting new work and wait for every outstanding task.
    pub async fn drain(&self) {
        self.tracker.close();
        tracing::info!(outstanding = self.tracker.len(), "Waiting for background tasks");
        self.tracker.wait().await;
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "panic"
    }
}
