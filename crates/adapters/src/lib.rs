//! # codex-env-adapters
//!
//! Adapter implementations for ports: the PostgREST environment store,
//! structured loggers, and a logging notifier.
//! This crate depends on `ports`, `api`, `config`, `domain`, and `shared`.

pub mod log_sink;
pub mod logger;
pub mod notifier;
pub mod store;
pub mod tracing_logger;

pub use log_sink::{LogSink, MemoryLogSink, StderrLogSink};
pub use logger::JsonLogger;
pub use notifier::LoggingNotifier;
pub use store::{PostgrestEnvironmentStore, PostgrestStoreConfig};
pub use tracing_logger::TracingLogger;

/// Returns the adapters crate version.
#[must_use]
pub const fn adapters_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
