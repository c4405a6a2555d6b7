//! Task spawning abstraction.
//!
//! The coordinator starts its poll loop and per-cycle device polls through
//! [`TaskSpawner`], so an embedding application can run them on a runtime
//! it already owns.

use std::future::Future;

/// Spawns detached background tasks.
pub trait TaskSpawner: Send + Sync {
    /// Spawns `future`; it runs to completion independently of the caller.
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Spawner backed by a Tokio runtime handle.
#[derive(Clone, Debug)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
}

impl TokioSpawner {
    #[must_use]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Uses the current runtime's handle.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    #[must_use]
    pub fn current() -> Self {
        Self {
            handle: tokio::runtime::Handle::current(),
        }
    }
}

impl TaskSpawner for TokioSpawner {
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(future);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn tokio_spawner_runs_the_task() {
        let spawner = TokioSpawner::current();
        let (tx, rx) = oneshot::channel();

        spawner.spawn(async move {
            let _ = tx.send(42);
        });

        assert_eq!(rx.await.unwrap(), 42);
    }
}
