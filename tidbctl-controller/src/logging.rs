//! Logging initialization
//!
//! Console output plus an optional daily-rolling JSON file under `log_dir`.

use crate::config::LoggingConfig;
use std::io;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

impl LoggingConfig {
    /// Install the global subscriber.
    ///
    /// The returned guard flushes the file writer on drop and must be held
    /// for the lifetime of the process.
    pub fn init(&self) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
        let env_filter = self.env_filter();

        let console_layer = if self.json {
            fmt::layer()
                .with_target(true)
                .with_writer(io::stderr)
                .json()
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_ansi(true)
                .with_writer(io::stderr)
                .boxed()
        };

        let mut guard = None;
        let file_layer = match &self.log_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                let (writer, file_guard) = non_blocking(rolling::daily(dir, "tidbctl.log"));
                guard = Some(file_guard);

                Some(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_ansi(false)
                        .json()
                        .with_writer(writer),
                )
            }
            None => None,
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .try_init()?;

        tracing::debug!(level = %self.level, log_dir = ?self.log_dir, "Logging initialized");

        Ok(guard)
    }

    /// `RUST_LOG` wins over the configured level
    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level))
    }
}
