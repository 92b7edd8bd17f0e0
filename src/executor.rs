//! Worker pool for evaluating and dispatching effects.
//!
//! There is no process-wide pool. A program builds one [`WorkerPool`] at
//! startup, hands [`Executor`] handles to the code that needs to dispatch
//! work, and shuts the pool down explicitly when it is done.
//!
//! Code that already runs inside a tokio runtime can use
//! [`Executor::current`] instead of threading a handle through.
//!
//! # Example
//!
//! ```
//! use eddy::{WorkerPool, IO};
//! use std::time::Duration;
//!
//! let pool = WorkerPool::builder().thread_name("eddy-doc").build().unwrap();
//! let answer = pool.block_on(&IO::succeed(42)).unwrap();
//! assert_eq!(answer, 42);
//! pool.shutdown(Duration::from_secs(1));
//! ```

use std::time::Duration;

use tokio::runtime::{Handle, Runtime};
use tokio::task::JoinHandle;

use crate::error::{Error, ErrorKind, Result};
use crate::io::IO;

/// An owned multi-threaded tokio runtime.
#[derive(Debug)]
pub struct WorkerPool {
    runtime: Runtime,
}

/// Configures a [`WorkerPool`].
#[derive(Debug, Clone)]
pub struct WorkerPoolBuilder {
    thread_name: String,
    worker_threads: Option<usize>,
}

impl Default for WorkerPoolBuilder {
    fn default() -> Self {
        Self {
            thread_name: "eddy-worker".to_string(),
            worker_threads: None,
        }
    }
}

impl WorkerPoolBuilder {
    /// Name given to the pool's worker threads.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Number of worker threads. Defaults to the number of CPUs.
    ///
    /// # Panics
    ///
    /// Panics if `count` is zero.
    pub fn worker_threads(mut self, count: usize) -> Self {
        assert!(count > 0, "worker_threads requires count > 0");
        self.worker_threads = Some(count);
        self
    }

    /// Start the pool.
    pub fn build(self) -> Result<WorkerPool> {
        let mut builder = tokio::runtime::Builder::new_multi_thread();
        builder.thread_name(self.thread_name).enable_all();
        if let Some(count) = self.worker_threads {
            builder.worker_threads(count);
        }
        let runtime = builder.build()?;
        Ok(WorkerPool { runtime })
    }
}

impl WorkerPool {
    /// Start a pool with the default settings.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Configure a new pool.
    pub fn builder() -> WorkerPoolBuilder {
        WorkerPoolBuilder::default()
    }

    /// A handle for dispatching work onto this pool.
    pub fn executor(&self) -> Executor {
        Executor::from_handle(self.runtime.handle().clone())
    }

    /// Evaluate `effect` on the pool, blocking the calling thread.
    ///
    /// # Panics
    ///
    /// Panics when called from inside an async context.
    pub fn block_on<T: Send + 'static>(&self, effect: &IO<T>) -> Result<T> {
        self.runtime.block_on(effect.run())
    }

    /// Stop the pool, waiting at most `timeout` for running tasks.
    ///
    /// Tasks that have not finished by then are abandoned.
    pub fn shutdown(self, timeout: Duration) {
        tracing::debug!(timeout = ?timeout, "shutting down worker pool");
        self.runtime.shutdown_timeout(timeout);
    }
}

/// A cheap, clonable handle to a runtime that effects can be dispatched to.
#[derive(Debug, Clone)]
pub struct Executor {
    handle: Handle,
}

impl Executor {
    /// The runtime the caller is running on.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn current() -> Self {
        Self::from_handle(Handle::current())
    }

    /// The runtime the caller is running on, if any.
    pub fn try_current() -> Result<Self> {
        Handle::try_current()
            .map(Self::from_handle)
            .map_err(|e| Error::with_source(ErrorKind::IllegalArgument, "no tokio runtime", e))
    }

    /// Wrap an existing runtime handle.
    pub fn from_handle(handle: Handle) -> Self {
        Self { handle }
    }

    /// The underlying runtime handle.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Start evaluating `effect` and return a handle to its result.
    pub fn spawn<T: Send + 'static>(&self, effect: IO<T>) -> JoinHandle<Result<T>> {
        self.handle.spawn(async move { effect.run().await })
    }

    /// Start evaluating `effect` without keeping track of it.
    ///
    /// A failure is logged at `WARN` level.
    pub fn spawn_detached<T: Send + 'static>(&self, effect: IO<T>) {
        self.handle.spawn(async move {
            if let Err(error) = effect.run().await {
                tracing::warn!(
                    error = %error,
                    kind = %error.kind(),
                    "detached effect failed"
                );
            }
        });
    }
}
