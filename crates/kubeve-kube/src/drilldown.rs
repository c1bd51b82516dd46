//! Drill-down text for the object behind an event row: a describe summary,
//! related resources, and a recent log tail.
//!
//! Every transport call is individually bounded by the configured timeout.
//! Failures never propagate; they become explanatory text in the section
//! that could not be built.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::TransportError;
use crate::kind::{is_namespaced_kind, ListOptions, ResourceKind};
use crate::source::{LogOptions, ObjectSource};
use crate::wire::decode_event;

pub const NO_DESCRIBE: &str = "No describe information available.";
pub const NO_RELATED: &str = "No related resources found.";
pub const NO_LOGS: &str = "No logs available for this resource.";

const POD_SUMMARY_LIMIT: usize = 8;
const NODE_POD_LIMIT: usize = 10;
const CRONJOB_JOB_LIMIT: usize = 5;
const OBJECT_EVENT_LIMIT: usize = 6;

/// The three drill-down sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrillDown {
    pub describe: String,
    pub related: String,
    pub logs: String,
}

impl Default for DrillDown {
    fn default() -> Self {
        Self {
            describe: NO_DESCRIBE.to_string(),
            related: NO_RELATED.to_string(),
            logs: NO_LOGS.to_string(),
        }
    }
}

/// What to drill into: the event's involved object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrillDownTarget {
    pub kind: String,
    pub name: String,
    /// Event namespace; empty for cluster-scoped objects.
    pub namespace: String,
}

/// Builds the drill-down for `target`.
pub async fn fetch_drilldown(
    source: &dyn ObjectSource,
    target: &DrillDownTarget,
    timeout: Duration,
) -> DrillDown {
    let mut result = DrillDown::default();
    let kind = target.kind.trim();
    let name = target.name.trim();
    if kind.is_empty() || name.is_empty() {
        result.describe = "Resource kind/name is not available.".to_string();
        return result;
    }

    let namespace = if target.namespace.is_empty() && is_namespaced_kind(kind) {
        "default".to_string()
    } else {
        target.namespace.clone()
    };
    let api = BoundedSource {
        source,
        timeout,
        namespace: &namespace,
    };

    let related = match ResourceKind::parse(kind) {
        Some(ResourceKind::Pod) => {
            result.describe = describe_pod(&api, name).await;
            Some(related_for_pod(&api, name).await)
        }
        Some(ResourceKind::Deployment) => {
            result.describe = describe_deployment(&api, name).await;
            Some(related_for_selected(&api, ResourceKind::Deployment, name).await)
        }
        Some(ResourceKind::ReplicaSet) => {
            result.describe = describe_replicaset(&api, name).await;
            Some(related_for_selected(&api, ResourceKind::ReplicaSet, name).await)
        }
        Some(ResourceKind::StatefulSet) => {
            result.describe = describe_statefulset(&api, name).await;
            Some(related_for_selected(&api, ResourceKind::StatefulSet, name).await)
        }
        Some(ResourceKind::DaemonSet) => {
            result.describe = describe_daemonset(&api, name).await;
            Some(related_for_selected(&api, ResourceKind::DaemonSet, name).await)
        }
        Some(ResourceKind::Job) => {
            result.describe = describe_job(&api, name).await;
            Some(related_for_job(&api, name).await)
        }
        Some(ResourceKind::CronJob) => {
            result.describe = describe_cronjob(&api, name).await;
            Some(related_for_cronjob(&api, name).await)
        }
        Some(ResourceKind::Service) => {
            result.describe = describe_service(&api, name).await;
            Some(related_for_service(&api, name).await)
        }
        Some(ResourceKind::Node) => {
            result.describe = describe_node(&api, name).await;
            Some(related_for_node(&api, name).await)
        }
        Some(ResourceKind::Namespace | ResourceKind::Event) | None => {
            result.describe = format!("No describe adapter for kind {kind:?}.");
            result.related = "No related adapter for this resource kind yet.".to_string();
            None
        }
    };

    if let Some(related) = related {
        result.related = related.text;
        if let Some(pod) = related.log_pod {
            result.logs = pod_logs(&api, &pod).await;
        }
    }

    let events = recent_object_events(&api, &target.namespace, kind, name).await;
    if !events.is_empty() {
        result.describe = format!(
            "{}\n\nRecent object events:\n{events}",
            result.describe.trim()
        );
    }
    result
}

// ---------------------------------------------------------------------------
// Bounded transport
// ---------------------------------------------------------------------------

struct BoundedSource<'a> {
    source: &'a dyn ObjectSource,
    timeout: Duration,
    namespace: &'a str,
}

impl BoundedSource<'_> {
    fn scoped(&self, kind: ResourceKind) -> Option<&str> {
        if kind.is_namespaced() && !self.namespace.is_empty() {
            Some(self.namespace)
        } else {
            None
        }
    }

    async fn bounded<T>(
        &self,
        operation: String,
        call: impl std::future::Future<Output = Result<T, TransportError>>,
    ) -> Result<T, TransportError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout {
                operation,
                after: self.timeout,
            }),
        }
    }

    async fn get(&self, kind: ResourceKind, name: &str) -> Result<Value, TransportError> {
        self.bounded(
            format!("get {} {name}", kind.as_str().to_ascii_lowercase()),
            self.source.get(kind, self.scoped(kind), name),
        )
        .await
    }

    async fn list(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        options: &ListOptions,
    ) -> Result<Vec<Value>, TransportError> {
        self.bounded(
            format!("list {}", kind.as_str().to_ascii_lowercase()),
            self.source.list(kind, namespace, options),
        )
        .await
    }

    async fn logs(&self, pod: &str, options: &LogOptions) -> Result<String, TransportError> {
        self.bounded(
            format!("logs {pod}"),
            self.source.logs(self.namespace, pod, options),
        )
        .await
    }

    async fn pods_by_selector(&self, selector: &str) -> Result<Vec<Value>, TransportError> {
        if selector.trim().is_empty() {
            return Ok(Vec::new());
        }
        let mut pods = self
            .list(
                ResourceKind::Pod,
                self.scoped(ResourceKind::Pod),
                &ListOptions::labels(selector),
            )
            .await?;
        // Running pods first, then by name.
        pods.sort_by(|a, b| {
            let a_running = text(a, "/status/phase") == "Running";
            let b_running = text(b, "/status/phase") == "Running";
            b_running
                .cmp(&a_running)
                .then_with(|| text(a, "/metadata/name").cmp(&text(b, "/metadata/name")))
        });
        Ok(pods)
    }
}

// ---------------------------------------------------------------------------
// JSON helpers
// ---------------------------------------------------------------------------

fn text(value: &Value, pointer: &str) -> String {
    match value.pointer(pointer) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn int(value: &Value, pointer: &str) -> i64 {
    value.pointer(pointer).and_then(Value::as_i64).unwrap_or(0)
}

fn int_or(value: &Value, pointer: &str, fallback: i64) -> i64 {
    value
        .pointer(pointer)
        .and_then(Value::as_i64)
        .unwrap_or(fallback)
}

fn boolean(value: &Value, pointer: &str) -> bool {
    value
        .pointer(pointer)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn time(value: &Value, pointer: &str) -> Option<DateTime<Utc>> {
    let raw = value.pointer(pointer)?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

fn time_text(value: &Value, pointer: &str) -> Option<String> {
    time(value, pointer).map(|ts| ts.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
}

fn owners(value: &Value) -> Vec<(String, String)> {
    value
        .pointer("/metadata/ownerReferences")
        .and_then(Value::as_array)
        .map(|refs| {
            refs.iter()
                .map(|r| (text(r, "/kind"), text(r, "/name")))
                .collect()
        })
        .unwrap_or_default()
}

fn owner_name(value: &Value, kind: &str) -> Option<String> {
    owners(value)
        .into_iter()
        .find(|(owner_kind, _)| owner_kind == kind)
        .map(|(_, name)| name)
}

fn sorted_pairs(map: Option<&Value>) -> Vec<String> {
    let mut pairs: Vec<String> = map
        .and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .map(|(k, v)| format!("{k}={}", v.as_str().unwrap_or_default()))
                .collect()
        })
        .unwrap_or_default();
    pairs.sort();
    pairs
}

/// Renders a LabelSelector (`matchLabels` + `matchExpressions`) in the
/// `kubectl` selector syntax. Empty when the selector selects nothing.
#[must_use]
pub fn format_label_selector(selector: Option<&Value>) -> String {
    let Some(selector) = selector else {
        return String::new();
    };
    let mut parts = sorted_pairs(selector.get("matchLabels"));
    if let Some(exprs) = selector.get("matchExpressions").and_then(Value::as_array) {
        for expr in exprs {
            let key = text(expr, "/key");
            let values: Vec<String> = expr
                .get("values")
                .and_then(Value::as_array)
                .map(|vals| {
                    vals.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            match text(expr, "/operator").as_str() {
                "In" => parts.push(format!("{key} in ({})", values.join(","))),
                "NotIn" => parts.push(format!("{key} notin ({})", values.join(","))),
                "Exists" => parts.push(key),
                "DoesNotExist" => parts.push(format!("!{key}")),
                _ => {}
            }
        }
    }
    parts.join(",")
}

fn selector_text(selector: &str) -> &str {
    if selector.is_empty() {
        "<none>"
    } else {
        selector
    }
}

/// Truncates to `limit` chars, marking the cut with `...`.
fn trim_text(value: &str, limit: usize) -> String {
    if limit <= 3 || value.chars().count() <= limit {
        return value.to_string();
    }
    let mut out: String = value.chars().take(limit - 3).collect();
    out.push_str("...");
    out
}

fn failed(what: &str, err: &TransportError) -> String {
    format!("Failed to load {what}: {err}")
}

// ---------------------------------------------------------------------------
// Describe
// ---------------------------------------------------------------------------

async fn describe_pod(api: &BoundedSource<'_>, name: &str) -> String {
    let pod = match api.get(ResourceKind::Pod, name).await {
        Ok(pod) => pod,
        Err(err) => return failed("pod", &err),
    };
    let mut lines = vec![
        "Kind: Pod".to_string(),
        format!("Name: {}", text(&pod, "/metadata/name")),
        format!("Namespace: {}", text(&pod, "/metadata/namespace")),
        format!("Phase: {}", text(&pod, "/status/phase")),
        format!("Node: {}", text(&pod, "/spec/nodeName")),
        format!("Pod IP: {}", text(&pod, "/status/podIP")),
        format!("Host IP: {}", text(&pod, "/status/hostIP")),
    ];
    if let Some(started) = time_text(&pod, "/status/startTime") {
        lines.push(format!("Started: {started}"));
    }
    let owner_refs = owners(&pod);
    if !owner_refs.is_empty() {
        let joined: Vec<String> = owner_refs
            .iter()
            .map(|(kind, name)| format!("{kind}/{name}"))
            .collect();
        lines.push(format!("Owners: {}", joined.join(", ")));
    }
    if let Some(statuses) = pod
        .pointer("/status/containerStatuses")
        .and_then(Value::as_array)
        .filter(|s| !s.is_empty())
    {
        lines.push("Containers:".to_string());
        for status in statuses {
            lines.push(format!(
                "- {} ready={} restarts={} image={}",
                text(status, "/name"),
                boolean(status, "/ready"),
                int(status, "/restartCount"),
                trim_text(&text(status, "/image"), 70),
            ));
        }
    }
    lines.join("\n")
}

async fn describe_deployment(api: &BoundedSource<'_>, name: &str) -> String {
    let dep = match api.get(ResourceKind::Deployment, name).await {
        Ok(dep) => dep,
        Err(err) => return failed("deployment", &err),
    };
    [
        "Kind: Deployment".to_string(),
        format!("Name: {}", text(&dep, "/metadata/name")),
        format!("Namespace: {}", text(&dep, "/metadata/namespace")),
        format!(
            "Selector: {}",
            selector_text(&format_label_selector(dep.pointer("/spec/selector")))
        ),
        format!(
            "Replicas: desired={} updated={} ready={} available={} unavailable={}",
            int_or(&dep, "/spec/replicas", 1),
            int(&dep, "/status/updatedReplicas"),
            int(&dep, "/status/readyReplicas"),
            int(&dep, "/status/availableReplicas"),
            int(&dep, "/status/unavailableReplicas"),
        ),
        format!("Strategy: {}", text(&dep, "/spec/strategy/type")),
    ]
    .join("\n")
}

async fn describe_replicaset(api: &BoundedSource<'_>, name: &str) -> String {
    let rs = match api.get(ResourceKind::ReplicaSet, name).await {
        Ok(rs) => rs,
        Err(err) => return failed("replicaset", &err),
    };
    [
        "Kind: ReplicaSet".to_string(),
        format!("Name: {}", text(&rs, "/metadata/name")),
        format!("Namespace: {}", text(&rs, "/metadata/namespace")),
        format!(
            "Selector: {}",
            selector_text(&format_label_selector(rs.pointer("/spec/selector")))
        ),
        format!(
            "Replicas: desired={} ready={} available={}",
            int_or(&rs, "/spec/replicas", 1),
            int(&rs, "/status/readyReplicas"),
            int(&rs, "/status/availableReplicas"),
        ),
    ]
    .join("\n")
}

async fn describe_statefulset(api: &BoundedSource<'_>, name: &str) -> String {
    let sts = match api.get(ResourceKind::StatefulSet, name).await {
        Ok(sts) => sts,
        Err(err) => return failed("statefulset", &err),
    };
    [
        "Kind: StatefulSet".to_string(),
        format!("Name: {}", text(&sts, "/metadata/name")),
        format!("Namespace: {}", text(&sts, "/metadata/namespace")),
        format!("Service: {}", text(&sts, "/spec/serviceName")),
        format!(
            "Selector: {}",
            selector_text(&format_label_selector(sts.pointer("/spec/selector")))
        ),
        format!(
            "Replicas: desired={} ready={} current={} updated={}",
            int_or(&sts, "/spec/replicas", 1),
            int(&sts, "/status/readyReplicas"),
            int(&sts, "/status/currentReplicas"),
            int(&sts, "/status/updatedReplicas"),
        ),
    ]
    .join("\n")
}

async fn describe_daemonset(api: &BoundedSource<'_>, name: &str) -> String {
    let ds = match api.get(ResourceKind::DaemonSet, name).await {
        Ok(ds) => ds,
        Err(err) => return failed("daemonset", &err),
    };
    [
        "Kind: DaemonSet".to_string(),
        format!("Name: {}", text(&ds, "/metadata/name")),
        format!("Namespace: {}", text(&ds, "/metadata/namespace")),
        format!(
            "Selector: {}",
            selector_text(&format_label_selector(ds.pointer("/spec/selector")))
        ),
        format!(
            "Pods: desired={} current={} ready={} updated={} available={}",
            int(&ds, "/status/desiredNumberScheduled"),
            int(&ds, "/status/currentNumberScheduled"),
            int(&ds, "/status/numberReady"),
            int(&ds, "/status/updatedNumberScheduled"),
            int(&ds, "/status/numberAvailable"),
        ),
    ]
    .join("\n")
}

async fn describe_job(api: &BoundedSource<'_>, name: &str) -> String {
    let job = match api.get(ResourceKind::Job, name).await {
        Ok(job) => job,
        Err(err) => return failed("job", &err),
    };
    let mut lines = vec![
        "Kind: Job".to_string(),
        format!("Name: {}", text(&job, "/metadata/name")),
        format!("Namespace: {}", text(&job, "/metadata/namespace")),
        format!("Completions: {}", int(&job, "/spec/completions")),
        format!("Parallelism: {}", int(&job, "/spec/parallelism")),
        format!(
            "Status: active={} succeeded={} failed={}",
            int(&job, "/status/active"),
            int(&job, "/status/succeeded"),
            int(&job, "/status/failed"),
        ),
    ];
    if let Some(started) = time_text(&job, "/status/startTime") {
        lines.push(format!("Started: {started}"));
    }
    if let Some(completed) = time_text(&job, "/status/completionTime") {
        lines.push(format!("Completed: {completed}"));
    }
    lines.join("\n")
}

async fn describe_cronjob(api: &BoundedSource<'_>, name: &str) -> String {
    let cron = match api.get(ResourceKind::CronJob, name).await {
        Ok(cron) => cron,
        Err(err) => return failed("cronjob", &err),
    };
    let mut lines = vec![
        "Kind: CronJob".to_string(),
        format!("Name: {}", text(&cron, "/metadata/name")),
        format!("Namespace: {}", text(&cron, "/metadata/namespace")),
        format!("Schedule: {}", text(&cron, "/spec/schedule")),
        format!("Suspend: {}", boolean(&cron, "/spec/suspend")),
        format!("ConcurrencyPolicy: {}", text(&cron, "/spec/concurrencyPolicy")),
    ];
    if let Some(last) = time_text(&cron, "/status/lastScheduleTime") {
        lines.push(format!("Last scheduled: {last}"));
    }
    lines.join("\n")
}

async fn describe_service(api: &BoundedSource<'_>, name: &str) -> String {
    let svc = match api.get(ResourceKind::Service, name).await {
        Ok(svc) => svc,
        Err(err) => return failed("service", &err),
    };
    let mut lines = vec![
        "Kind: Service".to_string(),
        format!("Name: {}", text(&svc, "/metadata/name")),
        format!("Namespace: {}", text(&svc, "/metadata/namespace")),
        format!("Type: {}", text(&svc, "/spec/type")),
        format!("ClusterIP: {}", text(&svc, "/spec/clusterIP")),
    ];
    let selector = sorted_pairs(svc.pointer("/spec/selector"));
    if !selector.is_empty() {
        lines.push(format!("Selector: {}", selector.join(", ")));
    }
    if let Some(ports) = svc
        .pointer("/spec/ports")
        .and_then(Value::as_array)
        .filter(|p| !p.is_empty())
    {
        lines.push("Ports:".to_string());
        for port in ports {
            lines.push(format!(
                "- {} {}->{}/{}",
                text(port, "/name"),
                int(port, "/port"),
                text(port, "/targetPort"),
                text(port, "/protocol"),
            ));
        }
    }
    lines.join("\n")
}

async fn describe_node(api: &BoundedSource<'_>, name: &str) -> String {
    let node = match api.get(ResourceKind::Node, name).await {
        Ok(node) => node,
        Err(err) => return failed("node", &err),
    };
    let mut lines = vec![
        "Kind: Node".to_string(),
        format!("Name: {}", text(&node, "/metadata/name")),
        format!("Kubelet: {}", text(&node, "/status/nodeInfo/kubeletVersion")),
        format!(
            "Container Runtime: {}",
            text(&node, "/status/nodeInfo/containerRuntimeVersion")
        ),
        format!("OS Image: {}", text(&node, "/status/nodeInfo/osImage")),
        format!("Kernel: {}", text(&node, "/status/nodeInfo/kernelVersion")),
    ];
    let mut healthy: Vec<String> = node
        .pointer("/status/conditions")
        .and_then(Value::as_array)
        .map(|conds| {
            conds
                .iter()
                .filter(|c| text(c, "/status") == "True")
                .map(|c| text(c, "/type"))
                .collect()
        })
        .unwrap_or_default();
    if !healthy.is_empty() {
        healthy.sort();
        lines.push(format!("Healthy conditions: {}", healthy.join(", ")));
    }
    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Related resources
// ---------------------------------------------------------------------------

struct Related {
    text: String,
    /// Pod whose logs represent this object.
    log_pod: Option<String>,
}

impl Related {
    fn only(text: String) -> Self {
        Self {
            text,
            log_pod: None,
        }
    }
}

fn summarize_pods(pods: &[Value]) -> Vec<String> {
    if pods.is_empty() {
        return vec!["Pods: none".to_string()];
    }
    let mut lines = vec!["Pods:".to_string()];
    for pod in pods.iter().take(POD_SUMMARY_LIMIT) {
        lines.push(format!(
            "- {} ({})",
            text(pod, "/metadata/name"),
            text(pod, "/status/phase")
        ));
    }
    if pods.len() > POD_SUMMARY_LIMIT {
        lines.push(format!("... +{} more", pods.len() - POD_SUMMARY_LIMIT));
    }
    lines
}

/// First running pod, else the first pod.
fn pick_pod_for_logs(pods: &[Value]) -> Option<String> {
    pods.iter()
        .find(|pod| text(pod, "/status/phase") == "Running")
        .or_else(|| pods.first())
        .map(|pod| text(pod, "/metadata/name"))
        .filter(|name| !name.is_empty())
}

fn with_pods(mut lines: Vec<String>, pods: Result<Vec<Value>, TransportError>) -> Related {
    match pods {
        Ok(pods) => {
            lines.extend(summarize_pods(&pods));
            Related {
                text: lines.join("\n"),
                log_pod: pick_pod_for_logs(&pods),
            }
        }
        Err(err) => {
            lines.push(format!("Pods: failed to list ({err})"));
            Related::only(lines.join("\n"))
        }
    }
}

async fn related_for_pod(api: &BoundedSource<'_>, name: &str) -> Related {
    let pod = match api.get(ResourceKind::Pod, name).await {
        Ok(pod) => pod,
        Err(err) => return Related::only(failed("pod relationship", &err)),
    };
    let mut lines = vec![format!("Pod: {}", text(&pod, "/metadata/name"))];
    for (kind, owner) in owners(&pod) {
        lines.push(format!("Owner: {kind}/{owner}"));
        if kind == "ReplicaSet" {
            if let Ok(rs) = api.get(ResourceKind::ReplicaSet, &owner).await {
                if let Some(dep) = owner_name(&rs, "Deployment") {
                    lines.push(format!("Deployment: {dep}"));
                }
            }
        }
    }
    Related {
        text: lines.join("\n"),
        log_pod: Some(text(&pod, "/metadata/name")).filter(|n| !n.is_empty()),
    }
}

/// Deployment, ReplicaSet, StatefulSet and DaemonSet: pods by label selector.
async fn related_for_selected(api: &BoundedSource<'_>, kind: ResourceKind, name: &str) -> Related {
    let label = kind.as_str();
    let obj = match api.get(kind, name).await {
        Ok(obj) => obj,
        Err(err) => {
            return Related::only(failed(
                &format!("{} relationship", label.to_ascii_lowercase()),
                &err,
            ))
        }
    };
    let obj_name = text(&obj, "/metadata/name");
    let selector = format_label_selector(obj.pointer("/spec/selector"));
    let mut lines = vec![
        format!("{label}: {obj_name}"),
        format!("Selector: {}", selector_text(&selector)),
    ];
    match kind {
        ResourceKind::Deployment => {
            if let Ok(sets) = api
                .list(
                    ResourceKind::ReplicaSet,
                    api.scoped(ResourceKind::ReplicaSet),
                    &ListOptions::default(),
                )
                .await
            {
                let mut owned: Vec<String> = sets
                    .iter()
                    .filter(|rs| owner_name(rs, "Deployment").as_deref() == Some(obj_name.as_str()))
                    .map(|rs| text(rs, "/metadata/name"))
                    .collect();
                owned.sort();
                if !owned.is_empty() {
                    lines.push(format!("ReplicaSets: {}", owned.join(", ")));
                }
            }
        }
        ResourceKind::ReplicaSet => {
            if let Some(dep) = owner_name(&obj, "Deployment") {
                lines.push(format!("Deployment: {dep}"));
            }
        }
        _ => {}
    }
    let pods = api.pods_by_selector(&selector).await;
    with_pods(lines, pods)
}

async fn pods_for_job(api: &BoundedSource<'_>, job: &Value) -> Result<Vec<Value>, TransportError> {
    let selector = format_label_selector(job.pointer("/spec/selector"));
    api.pods_by_selector(&selector).await
}

async fn related_for_job(api: &BoundedSource<'_>, name: &str) -> Related {
    let job = match api.get(ResourceKind::Job, name).await {
        Ok(job) => job,
        Err(err) => return Related::only(failed("job relationship", &err)),
    };
    let lines = vec![format!("Job: {}", text(&job, "/metadata/name"))];
    let pods = pods_for_job(api, &job).await;
    with_pods(lines, pods)
}

async fn related_for_cronjob(api: &BoundedSource<'_>, name: &str) -> Related {
    let cron = match api.get(ResourceKind::CronJob, name).await {
        Ok(cron) => cron,
        Err(err) => return Related::only(failed("cronjob relationship", &err)),
    };
    let cron_name = text(&cron, "/metadata/name");
    let mut lines = vec![format!("CronJob: {cron_name}")];
    let Ok(jobs) = api
        .list(
            ResourceKind::Job,
            api.scoped(ResourceKind::Job),
            &ListOptions::default(),
        )
        .await
    else {
        return Related::only(lines.join("\n"));
    };
    let mut owned: Vec<&Value> = jobs
        .iter()
        .filter(|job| owner_name(job, "CronJob").as_deref() == Some(cron_name.as_str()))
        .collect();
    owned.sort_by(|a, b| {
        time(b, "/metadata/creationTimestamp").cmp(&time(a, "/metadata/creationTimestamp"))
    });
    let Some(latest) = owned.first().copied() else {
        return Related::only(lines.join("\n"));
    };
    lines.push("Recent Jobs:".to_string());
    for job in owned.iter().take(CRONJOB_JOB_LIMIT) {
        lines.push(format!(
            "- {} active={} succeeded={} failed={}",
            text(job, "/metadata/name"),
            int(job, "/status/active"),
            int(job, "/status/succeeded"),
            int(job, "/status/failed"),
        ));
    }
    match pods_for_job(api, latest).await {
        Ok(pods) => with_pods(lines, Ok(pods)),
        Err(_) => Related::only(lines.join("\n")),
    }
}

async fn related_for_service(api: &BoundedSource<'_>, name: &str) -> Related {
    let svc = match api.get(ResourceKind::Service, name).await {
        Ok(svc) => svc,
        Err(err) => return Related::only(failed("service relationship", &err)),
    };
    let mut lines = vec![format!("Service: {}", text(&svc, "/metadata/name"))];
    let pairs = sorted_pairs(svc.pointer("/spec/selector"));
    if pairs.is_empty() {
        lines.push("No selector configured.".to_string());
        return Related::only(lines.join("\n"));
    }
    let selector = pairs.join(",");
    lines.push(format!("Selector: {selector}"));
    let pods = api.pods_by_selector(&selector).await;
    with_pods(lines, pods)
}

async fn related_for_node(api: &BoundedSource<'_>, name: &str) -> Related {
    let pods = match api
        .list(
            ResourceKind::Pod,
            None,
            &ListOptions::fields(format!("spec.nodeName={name}")),
        )
        .await
    {
        Ok(pods) => pods,
        Err(err) => return Related::only(failed("pods on node", &err)),
    };
    let mut lines = vec![format!("Node: {name}")];
    if pods.is_empty() {
        lines.push("No pods scheduled on this node.".to_string());
        return Related::only(lines.join("\n"));
    }
    let mut sorted: Vec<&Value> = pods.iter().collect();
    sorted.sort_by_key(|pod| text(pod, "/metadata/name"));
    lines.push("Pods on node:".to_string());
    for pod in sorted.iter().take(NODE_POD_LIMIT) {
        lines.push(format!(
            "- {}/{} ({})",
            text(pod, "/metadata/namespace"),
            text(pod, "/metadata/name"),
            text(pod, "/status/phase"),
        ));
    }
    if sorted.len() > NODE_POD_LIMIT {
        lines.push(format!("... +{} more", sorted.len() - NODE_POD_LIMIT));
    }
    Related::only(lines.join("\n"))
}

// ---------------------------------------------------------------------------
// Logs and object events
// ---------------------------------------------------------------------------

/// Running container first, else the first declared container.
fn pick_container(pod: &Value) -> Option<String> {
    let running = pod
        .pointer("/status/containerStatuses")
        .and_then(Value::as_array)
        .and_then(|statuses| {
            statuses
                .iter()
                .find(|status| status.pointer("/state/running").is_some())
                .map(|status| text(status, "/name"))
        });
    running
        .or_else(|| {
            pod.pointer("/spec/containers/0")
                .map(|container| text(container, "/name"))
        })
        .filter(|name| !name.is_empty())
}

async fn pod_logs(api: &BoundedSource<'_>, pod_name: &str) -> String {
    let pod = match api.get(ResourceKind::Pod, pod_name).await {
        Ok(pod) => pod,
        Err(err) => return failed("pod for logs", &err),
    };
    let Some(container) = pick_container(&pod) else {
        return "Pod has no containers.".to_string();
    };
    match api.logs(pod_name, &LogOptions::tail(container.clone())).await {
        Ok(logs) if logs.trim().is_empty() => {
            format!("No recent logs in pod {pod_name} (container {container}).")
        }
        Ok(logs) => format!(
            "Pod: {pod_name}\nContainer: {container}\n\n{}",
            logs.trim()
        ),
        Err(err) => format!(
            "Failed to fetch logs for pod {pod_name} (container {container}): {err}"
        ),
    }
}

/// Latest events about the object itself, newest first. Empty on failure.
async fn recent_object_events(
    api: &BoundedSource<'_>,
    namespace: &str,
    kind: &str,
    name: &str,
) -> String {
    let selector = format!("involvedObject.name={name},involvedObject.kind={kind}");
    let scope = Some(namespace).filter(|ns| !ns.is_empty());
    let Ok(items) = api
        .list(ResourceKind::Event, scope, &ListOptions::fields(selector))
        .await
    else {
        return String::new();
    };
    let mut events: Vec<_> = items
        .into_iter()
        .filter_map(|item| decode_event(item).ok())
        .collect();
    events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    events
        .iter()
        .take(OBJECT_EVENT_LIMIT)
        .map(|event| {
            let clock = event
                .timestamp
                .map(|ts| ts.format("%H:%M:%S").to_string())
                .unwrap_or_else(|| "--:--:--".to_string());
            format!(
                "- {clock} {}/{}: {}",
                event.event_type,
                event.reason,
                trim_text(&event.message, 140)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::{fetch_drilldown, format_label_selector, trim_text, DrillDown, DrillDownTarget};
    use crate::kind::ResourceKind;
    use crate::mock::MockCluster;

    fn target(kind: &str, name: &str, namespace: &str) -> DrillDownTarget {
        DrillDownTarget {
            kind: kind.into(),
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    fn pod(name: &str, phase: &str, labels: serde_json::Value) -> serde_json::Value {
        json!({
            "metadata": {"name": name, "namespace": "shop", "labels": labels},
            "spec": {"nodeName": "n1", "containers": [{"name": "app"}]},
            "status": {"phase": phase, "podIP": "10.0.0.5", "hostIP": "192.168.1.2"}
        })
    }

    #[test]
    fn selector_formatting() {
        let selector = json!({
            "matchLabels": {"tier": "web", "app": "shop"},
            "matchExpressions": [
                {"key": "env", "operator": "In", "values": ["prod", "stage"]},
                {"key": "canary", "operator": "DoesNotExist"}
            ]
        });
        assert_eq!(
            format_label_selector(Some(&selector)),
            "app=shop,tier=web,env in (prod,stage),!canary"
        );
        assert_eq!(format_label_selector(None), "");
    }

    #[test]
    fn trim_marks_the_cut() {
        assert_eq!(trim_text("abcdefgh", 6), "abc...");
        assert_eq!(trim_text("abc", 6), "abc");
    }

    #[tokio::test]
    async fn unknown_kind_gets_placeholders() {
        let cluster = MockCluster::new();
        let result = fetch_drilldown(
            &cluster,
            &target("HorizontalPodAutoscaler", "web", "shop"),
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(
            result.describe,
            "No describe adapter for kind \"HorizontalPodAutoscaler\"."
        );
        assert_eq!(result.related, "No related adapter for this resource kind yet.");
        assert_eq!(result.logs, DrillDown::default().logs);
    }

    #[tokio::test]
    async fn missing_name_short_circuits() {
        let cluster = MockCluster::new();
        let result = fetch_drilldown(&cluster, &target("Pod", " ", "shop"), Duration::from_secs(1)).await;
        assert_eq!(result.describe, "Resource kind/name is not available.");
    }

    #[tokio::test]
    async fn deployment_lists_pods_and_tails_running_pod() {
        let cluster = MockCluster::new()
            .with_object(
                ResourceKind::Deployment,
                "shop",
                "web",
                json!({
                    "metadata": {"name": "web", "namespace": "shop"},
                    "spec": {"replicas": 2, "selector": {"matchLabels": {"app": "web"}}, "strategy": {"type": "RollingUpdate"}},
                    "status": {"readyReplicas": 1, "availableReplicas": 1, "updatedReplicas": 2}
                }),
            )
            .with_object(ResourceKind::Pod, "shop", "web-b", pod("web-b", "Running", json!({"app": "web"})))
            .with_list(
                ResourceKind::Pod,
                "shop",
                vec![
                    pod("web-a", "Pending", json!({"app": "web"})),
                    pod("web-b", "Running", json!({"app": "web"})),
                ],
            )
            .with_logs("shop", "web-b", "2024-05-01T12:00:00Z listening on :8080\n");

        let result = fetch_drilldown(&cluster, &target("Deployment", "web", "shop"), Duration::from_secs(1)).await;
        assert!(result.describe.starts_with("Kind: Deployment\nName: web\nNamespace: shop\nSelector: app=web"));
        assert!(result.describe.contains("Replicas: desired=2 updated=2 ready=1 available=1 unavailable=0"));
        assert_eq!(
            result.related,
            "Deployment: web\nSelector: app=web\nPods:\n- web-b (Running)\n- web-a (Pending)"
        );
        assert_eq!(
            result.logs,
            "Pod: web-b\nContainer: app\n\n2024-05-01T12:00:00Z listening on :8080"
        );
    }

    #[tokio::test]
    async fn failures_become_inline_text() {
        let cluster = MockCluster::new();
        let result = fetch_drilldown(&cluster, &target("Pod", "ghost", "shop"), Duration::from_secs(1)).await;
        assert!(result.describe.starts_with("Failed to load pod: "));
        assert!(result.related.starts_with("Failed to load pod relationship: "));
        assert_eq!(result.logs, DrillDown::default().logs);
    }

    #[tokio::test]
    async fn slow_calls_time_out_per_call() {
        let cluster = MockCluster::new()
            .with_object(ResourceKind::Node, "", "n1", json!({"metadata": {"name": "n1"}}))
            .with_object_delay(Duration::from_millis(500));
        let result = fetch_drilldown(&cluster, &target("Node", "n1", ""), Duration::from_millis(20)).await;
        assert_eq!(result.describe, "Failed to load node: get node n1 timed out after 20ms");
    }

    #[tokio::test]
    async fn recent_object_events_are_appended_newest_first() {
        let event = |reason: &str, at: &str| {
            json!({
                "metadata": {"namespace": "shop"},
                "involvedObject": {"kind": "Service", "name": "api"},
                "reason": reason,
                "message": "m",
                "type": "Normal",
                "lastTimestamp": at
            })
        };
        let cluster = MockCluster::new()
            .with_object(
                ResourceKind::Service,
                "shop",
                "api",
                json!({"metadata": {"name": "api", "namespace": "shop"}, "spec": {"type": "ClusterIP", "clusterIP": "10.1.0.1"}}),
            )
            .with_list(
                ResourceKind::Event,
                "shop",
                vec![event("Old", "2024-05-01T10:00:00Z"), event("New", "2024-05-01T11:00:00Z")],
            );
        let result = fetch_drilldown(&cluster, &target("Service", "api", "shop"), Duration::from_secs(1)).await;
        assert!(result.describe.ends_with(
            "Recent object events:\n- 11:00:00 Normal/New: m\n- 10:00:00 Normal/Old: m"
        ));
        assert_eq!(result.related, "Service: api\nNo selector configured.");
    }
}
