//! Resource kinds the transport knows how to address.

use std::fmt;

/// Kinds with a known REST path. Drill-down dispatch is a match over these;
/// any other kind string is handled by the placeholder path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Pod,
    Deployment,
    ReplicaSet,
    StatefulSet,
    DaemonSet,
    Job,
    CronJob,
    Service,
    Node,
    Namespace,
    Event,
}

impl ResourceKind {
    /// Case-insensitive lookup by `Kind` name.
    #[must_use]
    pub fn parse(kind: &str) -> Option<Self> {
        let kind = kind.trim().to_ascii_lowercase();
        Some(match kind.as_str() {
            "pod" => Self::Pod,
            "deployment" => Self::Deployment,
            "replicaset" => Self::ReplicaSet,
            "statefulset" => Self::StatefulSet,
            "daemonset" => Self::DaemonSet,
            "job" => Self::Job,
            "cronjob" => Self::CronJob,
            "service" => Self::Service,
            "node" => Self::Node,
            "namespace" => Self::Namespace,
            "event" => Self::Event,
            _ => return None,
        })
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pod => "Pod",
            Self::Deployment => "Deployment",
            Self::ReplicaSet => "ReplicaSet",
            Self::StatefulSet => "StatefulSet",
            Self::DaemonSet => "DaemonSet",
            Self::Job => "Job",
            Self::CronJob => "CronJob",
            Self::Service => "Service",
            Self::Node => "Node",
            Self::Namespace => "Namespace",
            Self::Event => "Event",
        }
    }

    fn api_prefix(self) -> &'static str {
        match self {
            Self::Deployment | Self::ReplicaSet | Self::StatefulSet | Self::DaemonSet => {
                "/apis/apps/v1"
            }
            Self::Job | Self::CronJob => "/apis/batch/v1",
            _ => "/api/v1",
        }
    }

    fn plural(self) -> &'static str {
        match self {
            Self::Pod => "pods",
            Self::Deployment => "deployments",
            Self::ReplicaSet => "replicasets",
            Self::StatefulSet => "statefulsets",
            Self::DaemonSet => "daemonsets",
            Self::Job => "jobs",
            Self::CronJob => "cronjobs",
            Self::Service => "services",
            Self::Node => "nodes",
            Self::Namespace => "namespaces",
            Self::Event => "events",
        }
    }

    #[must_use]
    pub fn is_namespaced(self) -> bool {
        !matches!(self, Self::Node | Self::Namespace)
    }

    /// Collection path. `None` (or a cluster-scoped kind) lists across all
    /// namespaces.
    #[must_use]
    pub fn collection_path(self, namespace: Option<&str>) -> String {
        match namespace.filter(|ns| !ns.is_empty() && self.is_namespaced()) {
            Some(ns) => format!("{}/namespaces/{ns}/{}", self.api_prefix(), self.plural()),
            None => format!("{}/{}", self.api_prefix(), self.plural()),
        }
    }

    #[must_use]
    pub fn object_path(self, namespace: Option<&str>, name: &str) -> String {
        format!("{}/{name}", self.collection_path(namespace))
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether objects of `kind` live in a namespace. Unknown kinds are assumed
/// namespaced.
#[must_use]
pub fn is_namespaced_kind(kind: &str) -> bool {
    !matches!(
        kind.trim().to_ascii_lowercase().as_str(),
        "node" | "namespace" | "persistentvolume"
    )
}

/// Label/field selectors for collection requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub label_selector: Option<String>,
    pub field_selector: Option<String>,
}

impl ListOptions {
    #[must_use]
    pub fn labels(selector: impl Into<String>) -> Self {
        Self {
            label_selector: Some(selector.into()),
            field_selector: None,
        }
    }

    #[must_use]
    pub fn fields(selector: impl Into<String>) -> Self {
        Self {
            label_selector: None,
            field_selector: Some(selector.into()),
        }
    }

    /// Query string (without `?`), percent-encoded.
    #[must_use]
    pub fn query(&self) -> String {
        let mut parts = Vec::new();
        if let Some(labels) = self.label_selector.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!("labelSelector={}", encode_query_value(labels)));
        }
        if let Some(fields) = self.field_selector.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!("fieldSelector={}", encode_query_value(fields)));
        }
        parts.join("&")
    }
}

/// Percent-encodes everything outside the RFC 3986 unreserved set.
#[must_use]
pub fn encode_query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(char::from(byte));
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
