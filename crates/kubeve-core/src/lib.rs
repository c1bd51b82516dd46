//! kubeve-core: event model, scope and generation types, and on-disk
//! configuration shared by the transport and UI crates.

pub mod config;
pub mod error;
pub mod event;

pub use error::ConfigError;
pub use event::{Event, EventType, ResourceRef, Scope, WatchGeneration};

/// Application version reported in the header and by `--version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
