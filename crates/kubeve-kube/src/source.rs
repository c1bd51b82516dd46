//! Transport traits. The UI only talks to the cluster through these, so the
//! kubectl-backed client and the in-memory mock are interchangeable.

use async_trait::async_trait;
use kubeve_core::{Event, Scope};
use serde_json::Value;

use crate::error::TransportError;
use crate::kind::{ListOptions, ResourceKind};

/// Result of the initial listing that precedes a watch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventListing {
    pub events: Vec<Event>,
    /// Opaque resume token (the list's resource version).
    pub resume_token: String,
}

/// A stream of watched events.
///
/// Dropping the stream tears down the underlying request.
#[async_trait]
pub trait EventStream: Send {
    /// Waits for the next event. `None` means the server closed the watch
    /// cleanly; `Some(Err(_))` is terminal.
    async fn next(&mut self) -> Option<Result<Event, TransportError>>;
}

/// Event subscription transport.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Lists current events in `scope` and returns a resume token.
    async fn list(&self, scope: &Scope) -> Result<EventListing, TransportError>;

    /// Watches `scope` for events newer than `resume_token`.
    async fn watch(
        &self,
        scope: &Scope,
        resume_token: &str,
    ) -> Result<Box<dyn EventStream>, TransportError>;
}

/// Options for a pod log tail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogOptions {
    pub container: String,
    pub tail_lines: u32,
    pub limit_bytes: usize,
    pub timestamps: bool,
}

impl LogOptions {
    #[must_use]
    pub fn tail(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            tail_lines: 80,
            limit_bytes: 64 * 1024,
            timestamps: true,
        }
    }
}

/// Object description transport used by drill-down.
#[async_trait]
pub trait ObjectSource: Send + Sync {
    /// Fetches one object as raw JSON.
    async fn get(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Value, TransportError>;

    /// Lists objects of `kind`; `None` namespace lists across the cluster.
    async fn list(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        options: &ListOptions,
    ) -> Result<Vec<Value>, TransportError>;

    /// Tails logs from one container of a pod.
    async fn logs(
        &self,
        namespace: &str,
        pod: &str,
        options: &LogOptions,
    ) -> Result<String, TransportError>;
}

/// Facts about the connected cluster shown in the header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterInfo {
    pub context: String,
    pub cluster: String,
    pub server_version: String,
    /// Namespace of the current kubeconfig context (`default` when unset).
    pub default_namespace: String,
}

/// Cluster bootstrap queries.
#[async_trait]
pub trait ClusterSource: Send + Sync {
    async fn cluster_info(&self) -> Result<ClusterInfo, TransportError>;

    /// Namespace names, sorted.
    async fn namespaces(&self) -> Result<Vec<String>, TransportError>;
}
