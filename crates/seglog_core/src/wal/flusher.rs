//! Background flush scheduling.
//!
//! A dedicated thread flushes the writer's buffer to the operating system
//! on a fixed interval. It shares the instance's lock with writers and
//! readers, never writes records, and is cancellable at shutdown. Missed
//! ticks don't accumulate: each tick performs at most one flush.

use crate::wal::WalInner;
use parking_lot::{Mutex, RwLock};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, warn};

/// Control messages for the flush thread.
pub(crate) enum FlushCommand {
    /// Restart the current tick, e.g. after a repair.
    Reset,
    /// Stop the thread.
    Shutdown,
}

/// Handle to the background flush thread.
pub(crate) struct FlushScheduler {
    tx: Sender<FlushCommand>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl FlushScheduler {
    /// Spawns the flush thread over the shared writer state.
    pub(crate) fn spawn(
        inner: Arc<RwLock<WalInner>>,
        interval: Duration,
    ) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel();

        let handle = std::thread::Builder::new()
            .name("seglog-flush".into())
            .spawn(move || loop {
                match rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let mut inner = inner.write();
                        if let Err(e) = inner.flush() {
                            warn!(error = %e, "background flush failed");
                        } else {
                            debug!("background flush");
                        }
                    }
                    Ok(FlushCommand::Reset) => {}
                    Ok(FlushCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;

        Ok(Self {
            tx,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Restarts the wait for the next tick.
    pub(crate) fn reset(&self) {
        let _ = self.tx.send(FlushCommand::Reset);
    }

    /// Stops the thread and waits for it to exit. Idempotent.
    pub(crate) fn shutdown(&self) {
        let _ = self.tx.send(FlushCommand::Shutdown);
        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
        }
    }
}
