//! Async runtime bridge for running background tasks in egui

use std::io;

use tokio::runtime::{Handle, Runtime};

/// Owns the tokio runtime that outbound calls and downloads run on.
pub struct AsyncBridge {
    /// Wrapped in Option so Drop can shut it down without blocking the UI thread.
    runtime: Option<Runtime>,
    handle: Handle,
}

impl AsyncBridge {
    pub fn new() -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("imagegen-worker")
            .enable_all()
            .build()?;
        let handle = runtime.handle().clone();

        Ok(Self {
            runtime: Some(runtime),
            handle,
        })
    }

    /// Handle for spawning tasks from panels.
    pub fn handle(&self) -> Handle {
        self.handle.clone()
    }
}

impl Drop for AsyncBridge {
    fn drop(&mut self) {
        // Dropping a runtime inside the eframe event loop would block; hand it off instead.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
