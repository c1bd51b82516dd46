//! kubeve-tui: live Kubernetes event viewer.
//!
//! [`app::App`] is a pure state machine over the event log and its derived
//! view. [`session::Session`] performs the side effects it requests, and
//! [`runtime`] drives both from the terminal.

pub mod aggregate;
pub mod app;
pub mod command_palette;
pub mod details;
pub mod event_log;
pub mod fuzzy;
pub mod layout;
pub mod logging;
pub mod namespace_picker;
pub mod recent_scopes;
pub mod runtime;
pub mod session;
pub mod view_model;
pub mod watch;

pub use app::{App, Command, UiMode};
pub use session::Session;

/// Failures that end the interactive binary.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("terminal: {0}")]
    Terminal(#[from] std::io::Error),
    #[error(transparent)]
    Transport(#[from] kubeve_kube::TransportError),
    #[error(transparent)]
    Logging(#[from] logging::InitError),
}
