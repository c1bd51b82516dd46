//! In-memory cluster for tests.
//!
//! Listings, watch scripts, objects and logs are configured up front with the
//! `with_*` builders; every call is recorded.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use kubeve_core::{Event, Scope};
use serde_json::Value;

use crate::error::TransportError;
use crate::kind::{ListOptions, ResourceKind};
use crate::source::{
    ClusterInfo, ClusterSource, EventListing, EventSource, EventStream, LogOptions, ObjectSource,
};

/// A recorded call to the mock cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    ListEvents(Scope),
    Watch { scope: Scope, resume_token: String },
    Get {
        kind: ResourceKind,
        namespace: Option<String>,
        name: String,
    },
    List {
        kind: ResourceKind,
        namespace: Option<String>,
        options: ListOptions,
    },
    Logs { namespace: String, pod: String },
    ClusterInfo,
    Namespaces,
}

/// One scripted watch item: wait `delay`, then yield `item`.
pub type WatchStep = (Duration, Result<Event, TransportError>);

type ObjectKey = (ResourceKind, String, String);

pub struct MockCluster {
    listings: Mutex<HashMap<String, Result<EventListing, TransportError>>>,
    list_delay: Mutex<Duration>,
    watches: Mutex<HashMap<String, VecDeque<Vec<WatchStep>>>>,
    close_watches: Mutex<bool>,
    objects: Mutex<HashMap<ObjectKey, Value>>,
    object_delay: Mutex<Duration>,
    lists: Mutex<HashMap<(ResourceKind, String), Vec<Value>>>,
    logs: Mutex<HashMap<(String, String), String>>,
    cluster: Mutex<ClusterInfo>,
    namespaces: Mutex<Vec<String>>,
    calls: Mutex<Vec<MockCall>>,
}

impl Default for MockCluster {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn scope_key(scope: &Scope) -> String {
    scope.namespace().unwrap_or_default().to_string()
}

impl MockCluster {
    #[must_use]
    pub fn new() -> Self {
        Self {
            listings: Mutex::new(HashMap::new()),
            list_delay: Mutex::new(Duration::ZERO),
            watches: Mutex::new(HashMap::new()),
            close_watches: Mutex::new(false),
            objects: Mutex::new(HashMap::new()),
            object_delay: Mutex::new(Duration::ZERO),
            lists: Mutex::new(HashMap::new()),
            logs: Mutex::new(HashMap::new()),
            cluster: Mutex::new(ClusterInfo {
                context: "mock".to_string(),
                cluster: "mock-cluster".to_string(),
                server_version: "v1.30.0".to_string(),
                default_namespace: "default".to_string(),
            }),
            namespaces: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Initial listing for `scope`.
    #[must_use]
    pub fn with_listing(self, scope: &Scope, events: Vec<Event>, resume_token: &str) -> Self {
        lock(&self.listings).insert(
            scope_key(scope),
            Ok(EventListing {
                events,
                resume_token: resume_token.to_string(),
            }),
        );
        self
    }

    /// Makes the listing for `scope` fail.
    #[must_use]
    pub fn with_list_error(self, scope: &Scope, err: TransportError) -> Self {
        lock(&self.listings).insert(scope_key(scope), Err(err));
        self
    }

    /// Delays every event listing.
    #[must_use]
    pub fn with_list_delay(self, delay: Duration) -> Self {
        *lock(&self.list_delay) = delay;
        self
    }

    /// Queues a script for the next watch of `scope`. Each `watch` call
    /// consumes one script; unscripted watches yield nothing.
    #[must_use]
    pub fn with_watch(self, scope: &Scope, steps: Vec<WatchStep>) -> Self {
        lock(&self.watches)
            .entry(scope_key(scope))
            .or_default()
            .push_back(steps);
        self
    }

    /// Ends watches when their script runs out instead of holding them open.
    #[must_use]
    pub fn with_closing_watches(self) -> Self {
        *lock(&self.close_watches) = true;
        self
    }

    #[must_use]
    pub fn with_object(self, kind: ResourceKind, namespace: &str, name: &str, object: Value) -> Self {
        lock(&self.objects).insert((kind, namespace.to_string(), name.to_string()), object);
        self
    }

    /// Delays every object `get`.
    #[must_use]
    pub fn with_object_delay(self, delay: Duration) -> Self {
        *lock(&self.object_delay) = delay;
        self
    }

    /// Collection contents. Label selectors of the `k=v,...` form are
    /// honoured; field selectors are ignored.
    #[must_use]
    pub fn with_list(self, kind: ResourceKind, namespace: &str, items: Vec<Value>) -> Self {
        lock(&self.lists).insert((kind, namespace.to_string()), items);
        self
    }

    #[must_use]
    pub fn with_logs(self, namespace: &str, pod: &str, text: &str) -> Self {
        lock(&self.logs).insert((namespace.to_string(), pod.to_string()), text.to_string());
        self
    }

    #[must_use]
    pub fn with_cluster_info(self, info: ClusterInfo) -> Self {
        *lock(&self.cluster) = info;
        self
    }

    #[must_use]
    pub fn with_namespaces(self, names: &[&str]) -> Self {
        *lock(&self.namespaces) = names.iter().map(|n| (*n).to_string()).collect();
        self
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    /// Scopes passed to `watch`, in order.
    pub fn watched_scopes(&self) -> Vec<Scope> {
        lock(&self.calls)
            .iter()
            .filter_map(|call| match call {
                MockCall::Watch { scope, .. } => Some(scope.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: MockCall) {
        lock(&self.calls).push(call);
    }
}

fn matches_labels(item: &Value, selector: &str) -> bool {
    selector
        .split(',')
        .filter_map(|part| part.split_once('='))
        .all(|(key, want)| {
            item.pointer("/metadata/labels")
                .and_then(|labels| labels.get(key.trim()))
                .and_then(Value::as_str)
                == Some(want.trim())
        })
}

#[async_trait]
impl EventSource for MockCluster {
    async fn list(&self, scope: &Scope) -> Result<EventListing, TransportError> {
        self.record(MockCall::ListEvents(scope.clone()));
        let delay = *lock(&self.list_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        lock(&self.listings)
            .get(&scope_key(scope))
            .cloned()
            .unwrap_or_else(|| Ok(EventListing::default()))
    }

    async fn watch(
        &self,
        scope: &Scope,
        resume_token: &str,
    ) -> Result<Box<dyn EventStream>, TransportError> {
        self.record(MockCall::Watch {
            scope: scope.clone(),
            resume_token: resume_token.to_string(),
        });
        let steps = lock(&self.watches)
            .get_mut(&scope_key(scope))
            .and_then(VecDeque::pop_front)
            .unwrap_or_default();
        Ok(Box::new(MockWatchStream {
            steps: steps.into(),
            hold_open: !*lock(&self.close_watches),
        }))
    }
}

struct MockWatchStream {
    steps: VecDeque<WatchStep>,
    hold_open: bool,
}

#[async_trait]
impl EventStream for MockWatchStream {
    async fn next(&mut self) -> Option<Result<Event, TransportError>> {
        match self.steps.pop_front() {
            Some((delay, item)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Some(item)
            }
            None if self.hold_open => std::future::pending().await,
            None => None,
        }
    }
}

#[async_trait]
impl ObjectSource for MockCluster {
    async fn get(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Value, TransportError> {
        self.record(MockCall::Get {
            kind,
            namespace: namespace.map(str::to_string),
            name: name.to_string(),
        });
        let delay = *lock(&self.object_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let ns = namespace.unwrap_or_default();
        lock(&self.objects)
            .get(&(kind, ns.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| {
                TransportError::unavailable(format!(
                    "{} {ns}/{name} not found",
                    kind.as_str().to_ascii_lowercase()
                ))
            })
    }

    async fn list(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        options: &ListOptions,
    ) -> Result<Vec<Value>, TransportError> {
        self.record(MockCall::List {
            kind,
            namespace: namespace.map(str::to_string),
            options: options.clone(),
        });
        let items = lock(&self.lists)
            .get(&(kind, namespace.unwrap_or_default().to_string()))
            .cloned()
            .unwrap_or_default();
        Ok(match options.label_selector.as_deref() {
            Some(selector) => items
                .into_iter()
                .filter(|item| matches_labels(item, selector))
                .collect(),
            None => items,
        })
    }

    async fn logs(
        &self,
        namespace: &str,
        pod: &str,
        _options: &LogOptions,
    ) -> Result<String, TransportError> {
        self.record(MockCall::Logs {
            namespace: namespace.to_string(),
            pod: pod.to_string(),
        });
        lock(&self.logs)
            .get(&(namespace.to_string(), pod.to_string()))
            .cloned()
            .ok_or_else(|| TransportError::unavailable(format!("no logs for {namespace}/{pod}")))
    }
}

#[async_trait]
impl ClusterSource for MockCluster {
    async fn cluster_info(&self) -> Result<ClusterInfo, TransportError> {
        self.record(MockCall::ClusterInfo);
        Ok(lock(&self.cluster).clone())
    }

    async fn namespaces(&self) -> Result<Vec<String>, TransportError> {
        self.record(MockCall::Namespaces);
        let mut names = lock(&self.namespaces).clone();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use kubeve_core::{Event, EventType, ResourceRef, Scope};
    use serde_json::json;

    use super::{MockCall, MockCluster};
    use crate::error::TransportError;
    use crate::kind::{ListOptions, ResourceKind};
    use crate::source::{EventSource, ObjectSource};

    fn event(name: &str) -> Event {
        Event {
            timestamp: None,
            resource: ResourceRef::new("Pod", name),
            event_type: EventType::Normal,
            reason: "Created".into(),
            namespace: "shop".into(),
            message: String::new(),
        }
    }

    #[tokio::test]
    async fn scripted_watch_then_close() {
        let scope = Scope::from_namespace("shop");
        let cluster = MockCluster::new()
            .with_listing(&scope, vec![event("a")], "10")
            .with_watch(
                &scope,
                vec![
                    (Duration::ZERO, Ok(event("b"))),
                    (Duration::ZERO, Err(TransportError::unavailable("boom"))),
                ],
            )
            .with_closing_watches();

        let listing = EventSource::list(&cluster, &scope).await.unwrap();
        assert_eq!(listing.resume_token, "10");
        let mut stream = cluster.watch(&scope, &listing.resume_token).await.unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap().resource.name, "b");
        assert!(stream.next().await.unwrap().is_err());
        assert!(stream.next().await.is_none());
        assert_eq!(
            cluster.calls()[1],
            MockCall::Watch {
                scope,
                resume_token: "10".into()
            }
        );
    }

    #[tokio::test]
    async fn label_selectors_filter_lists() {
        let cluster = MockCluster::new().with_list(
            ResourceKind::Pod,
            "shop",
            vec![
                json!({"metadata": {"name": "a", "labels": {"app": "web"}}}),
                json!({"metadata": {"name": "b", "labels": {"app": "db"}}}),
            ],
        );
        let pods = ObjectSource::list(
            &cluster,
            ResourceKind::Pod,
            Some("shop"),
            &ListOptions::labels("app=web"),
        )
        .await
        .unwrap();
        assert_eq!(pods.len(), 1);
        assert_eq!(pods[0]["metadata"]["name"], "a");
    }
}
