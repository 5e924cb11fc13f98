//! Shared tokio runtime for the bridge's asynchronous pipelines.
//!
//! Fetch and decode tasks run here; their results come back through the
//! completion queue and are only delivered to the guest from `Bridge::pump`,
//! so guest code always observes a single-threaded event loop.

use std::future::Future;
use std::sync::OnceLock;

use tokio::runtime::{Builder, Runtime};
use tokio::task::JoinHandle;

fn runtime() -> &'static Runtime {
    static RUNTIME: OnceLock<Runtime> = OnceLock::new();
    RUNTIME.get_or_init(|| {
        Builder::new_multi_thread()
            .enable_all()
            .thread_name("wasmport-rt")
            .build()
            .expect("failed to build shared tokio runtime")
    })
}

pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    runtime().spawn(future)
}

/// Drive a future to completion from a non-runtime thread.
///
/// Used by `boot` for the one-shot module fetch; must not be called from
/// inside a spawned task.
pub fn block_on<F: Future>(future: F) -> F::Output {
    runtime().block_on(future)
}
