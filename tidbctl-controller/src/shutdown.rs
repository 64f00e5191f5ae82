//! Cancellation for in-flight work
//!
//! A `Shutdown` owns the sending side of a watch channel; callers hand out
//! `ShutdownSignal`s to operations that should stop early (for example a
//! health report whose probes must be abandoned on SIGINT).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// Shutdown trigger
#[derive(Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
    triggered: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            triggered: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a signal that resolves once `trigger` is called
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Fire the signal. Subsequent calls are no-ops.
    pub fn trigger(&self) {
        if self.triggered.swap(true, Ordering::SeqCst) {
            return;
        }

        info!("Shutdown requested, cancelling in-flight work");
        self.tx.send_replace(true);
    }

    /// Wait for SIGTERM/SIGINT and trigger
    pub async fn wait_for_signal(&self) {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(mut sigterm), Ok(mut sigint)) => {
                    tokio::select! {
                        _ = sigterm.recv() => info!("Received SIGTERM"),
                        _ = sigint.recv() => info!("Received SIGINT"),
                    }
                }
                (Err(e), _) | (_, Err(e)) => {
                    warn!(error = %e, "Failed to register signal handlers");
                    return;
                }
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to register ctrl-c handler");
                return;
            }
            info!("Received Ctrl+C");
        }

        self.trigger();
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of a `Shutdown`
#[derive(Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        Shutdown::new().subscribe()
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the signal has fired
    pub async fn cancelled(&mut self) {
        if self.rx.wait_for(|fired| *fired).await.is_err() {
            // Sender dropped without firing: never resolve.
            std::future::pending::<()>().await;
        }
    }
}
