//! Cluster event records and the scope/generation types that tag them.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// Event severity as reported by the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventType {
    Normal,
    Warning,
}

impl EventType {
    /// Parses the upstream `type` field. Anything other than `Warning`
    /// (case-insensitive) is treated as `Normal`.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("warning") {
            Self::Warning
        } else {
            Self::Normal
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Warning => "Warning",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `Kind/Name` reference to the object an event is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceRef {
    pub kind: String,
    pub name: String,
}

impl ResourceRef {
    #[must_use]
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Splits `Kind/Name` at the first `/`. Both halves must be non-empty
    /// after trimming.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let (kind, name) = value.trim().split_once('/')?;
        let kind = kind.trim();
        let name = name.trim();
        if kind.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self::new(kind, name))
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

/// One observed cluster notification. Immutable once recorded; identity is
/// its position in the event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub timestamp: Option<DateTime<Utc>>,
    pub resource: ResourceRef,
    pub event_type: EventType,
    pub reason: String,
    /// Empty for cluster-scoped objects.
    pub namespace: String,
    pub message: String,
}

impl Event {
    /// RFC3339 timestamp, or `-` when upstream carried none.
    #[must_use]
    pub fn timestamp_text(&self) -> String {
        format_timestamp(self.timestamp)
    }
}

/// RFC3339 (seconds, `Z` suffix) or `-` for a missing instant.
#[must_use]
pub fn format_timestamp(timestamp: Option<DateTime<Utc>>) -> String {
    match timestamp {
        Some(ts) => ts.to_rfc3339_opts(SecondsFormat::Secs, true),
        None => "-".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// Namespace scope of the active subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    All,
    Namespace(String),
}

impl Scope {
    /// An empty name means all namespaces.
    #[must_use]
    pub fn from_namespace(name: &str) -> Self {
        let name = name.trim();
        if name.is_empty() {
            Self::All
        } else {
            Self::Namespace(name.to_string())
        }
    }

    #[must_use]
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Namespace(name) => Some(name),
        }
    }

    /// Whether an event from `namespace` belongs to this scope.
    #[must_use]
    pub fn contains(&self, namespace: &str) -> bool {
        match self {
            Self::All => true,
            Self::Namespace(name) => name == namespace,
        }
    }

    /// Human label used in the header.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::All => "All namespaces",
            Self::Namespace(name) => name,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// WatchGeneration
// ---------------------------------------------------------------------------

/// Monotonic tag minted on every scope change. Results carrying an older
/// generation are discarded unread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WatchGeneration(u64);

impl WatchGeneration {
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WatchGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{format_timestamp, EventType, ResourceRef, Scope, WatchGeneration};

    #[test]
    fn event_type_parse_defaults_to_normal() {
        assert_eq!(EventType::parse("Warning"), EventType::Warning);
        assert_eq!(EventType::parse(" warning "), EventType::Warning);
        assert_eq!(EventType::parse("Normal"), EventType::Normal);
        assert_eq!(EventType::parse("Custom"), EventType::Normal);
    }

    #[test]
    fn resource_ref_parse_requires_both_halves() {
        assert_eq!(
            ResourceRef::parse("Pod/web-1"),
            Some(ResourceRef::new("Pod", "web-1"))
        );
        assert_eq!(
            ResourceRef::parse(" Deployment / api "),
            Some(ResourceRef::new("Deployment", "api"))
        );
        assert_eq!(ResourceRef::parse("Pod/"), None);
        assert_eq!(ResourceRef::parse("/web"), None);
        assert_eq!(ResourceRef::parse("Pod"), None);
        assert_eq!(ResourceRef::new("Node", "n1").to_string(), "Node/n1");
    }

    #[test]
    fn timestamp_formats_rfc3339_or_dash() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).single();
        assert_eq!(format_timestamp(ts), "2024-05-01T12:30:00Z");
        assert_eq!(format_timestamp(None), "-");
    }

    #[test]
    fn scope_containment() {
        assert_eq!(Scope::from_namespace(""), Scope::All);
        assert!(Scope::All.contains("anything"));
        let scope = Scope::from_namespace("ns-a");
        assert!(scope.contains("ns-a"));
        assert!(!scope.contains("ns-b"));
        assert_eq!(scope.namespace(), Some("ns-a"));
        assert_eq!(Scope::All.label(), "All namespaces");
    }

    #[test]
    fn generation_is_monotonic() {
        let first = WatchGeneration::default();
        let second = first.next();
        assert!(second > first);
        assert_eq!(second.value(), 1);
        assert_eq!(second.to_string(), "g1");
    }
}
