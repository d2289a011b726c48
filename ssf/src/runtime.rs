//! Process-wide executor lifecycle (spec §5 "Shared resources" /
//! SPEC_FULL.md §5): a multi-threaded Tokio runtime sized to the platform's
//! hardware concurrency by default, started once at program init and
//! stopped by dropping it, which joins every worker thread.

use std::num::NonZeroUsize;

use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

/// The runtime plus a cancellation token that every socket/acceptor/
/// multiplexer started under it should hold a child of, so a single
/// `shutdown()` call propagates `operation_canceled` everywhere (spec §5
/// "Cancellation"). This is the one place the implementation reaches
/// beyond the original's `io_service::stop()` plumbing (DESIGN.md).
pub struct AppRuntime {
    runtime: Runtime,
    shutdown: CancellationToken,
}

impl AppRuntime {
    /// `worker_threads = None` defaults to `std::thread::available_parallelism()`,
    /// matching spec §5's "defaults to the platform's hardware concurrency".
    pub fn start(worker_threads: Option<usize>) -> std::io::Result<Self> {
        let workers = worker_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
        });

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(workers.max(1))
            .enable_all()
            .build()?;

        Ok(Self {
            runtime,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn handle(&self) -> &tokio::runtime::Handle {
        self.runtime.handle()
    }

    pub fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// A child token: cancelling the parent (via [`Self::shutdown`])
    /// cancels every child, but cancelling a child doesn't affect siblings.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }

    /// Releases the keep-alive token; does not forcibly join workers (that
    /// happens on drop, per spec §5's "stop by releasing the keep-alive and
    /// joining the workers").
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_default_worker_count() {
        let runtime = AppRuntime::start(None).unwrap();
        let result = runtime.block_on(async { 1 + 1 });
        assert_eq!(result, 2);
    }

    #[test]
    fn shutdown_cancels_child_tokens() {
        let runtime = AppRuntime::start(Some(1)).unwrap();
        let child = runtime.shutdown_token();
        assert!(!child.is_cancelled());
        runtime.shutdown();
        assert!(child.is_cancelled());
    }
}
