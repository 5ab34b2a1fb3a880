use std::{future::Future, io, time::Duration};

use tokio::{
    runtime::{Builder, Runtime},
    task::{JoinHandle, LocalSet},
};

/// Single-threaded cooperative executor. All asynchronous work in the session
/// runs on a current-thread runtime plus a `LocalSet`, so spawned futures need
/// not be `Send` and nothing progresses unless the owner pumps the loop.
/// Callbacks therefore only ever fire on the calling thread, during a
/// [`pump`](Executor::pump), [`pump_for`](Executor::pump_for) or
/// [`block_on`](Executor::block_on) turn.
///
/// `block_on` must not be re-entered from inside a spawned task.
pub struct Executor {
    runtime: Runtime,
    local: LocalSet,
}

impl Executor {
    pub fn new() -> io::Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            runtime,
            local: LocalSet::new(),
        })
    }

    /// Runs a future to completion, driving spawned tasks alongside it. Used
    /// by the deliberately synchronous variants (startup authorization,
    /// blocking fetches).
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.local.block_on(&self.runtime, future)
    }

    /// Queues a future on the loop. It makes no progress until the executor
    /// is pumped.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + 'static,
    {
        self.local.spawn_local(future)
    }

    /// One cooperative scheduling turn: runs whatever is ready, never waits
    /// for pending I/O.
    pub fn pump(&self) {
        self.local.block_on(&self.runtime, tokio::task::yield_now());
    }

    /// Drives the loop for a bounded slice of wall-clock time so in-flight
    /// network futures can wait on the I/O driver. Suits a render loop with a
    /// per-frame budget.
    pub fn pump_for(&self, budget: Duration) {
        self.local
            .block_on(&self.runtime, async move { tokio::time::sleep(budget).await });
    }
}
