//! `kubectl`-backed transport.
//!
//! Every request is a `kubectl` child process. Raw API reads go through
//! `kubectl get --raw`, which streams the response body, so a watch is a
//! long-lived child whose stdout is read line by line. Children are killed
//! when their future or stream is dropped.

use std::process::Stdio;

use async_trait::async_trait;
use kubeve_core::{Event, Scope};
use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::kind::{ListOptions, ResourceKind};
use crate::source::{
    ClusterInfo, ClusterSource, EventListing, EventSource, EventStream, LogOptions, ObjectSource,
};
use crate::wire::{decode_event_list, decode_watch_line, WatchFrame};

/// Connection settings passed to every `kubectl` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KubectlConfig {
    pub program: String,
    pub context: Option<String>,
    pub kubeconfig: Option<String>,
}

impl Default for KubectlConfig {
    fn default() -> Self {
        Self {
            program: "kubectl".to_string(),
            context: None,
            kubeconfig: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct KubectlClient {
    config: KubectlConfig,
}

impl KubectlClient {
    #[must_use]
    pub fn new(config: KubectlConfig) -> Self {
        Self { config }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.config.program);
        if let Some(context) = self.config.context.as_deref() {
            cmd.arg("--context").arg(context);
        }
        if let Some(kubeconfig) = self.config.kubeconfig.as_deref() {
            cmd.arg("--kubeconfig").arg(kubeconfig);
        }
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn describe_command(&self, args: &[&str]) -> String {
        format!("{} {}", self.config.program, args.join(" "))
    }

    /// Runs `kubectl args...` to completion and returns stdout.
    async fn run(&self, args: &[&str]) -> Result<Vec<u8>, TransportError> {
        let child = self.command(args).spawn().map_err(|err| TransportError::Spawn {
            program: self.config.program.clone(),
            message: err.to_string(),
        })?;
        let output = child
            .wait_with_output()
            .await
            .map_err(|err| TransportError::Spawn {
                program: self.config.program.clone(),
                message: err.to_string(),
            })?;
        if !output.status.success() {
            return Err(TransportError::CommandFailed {
                command: self.describe_command(args),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }

    async fn run_text(&self, args: &[&str]) -> Result<String, TransportError> {
        let stdout = self.run(args).await?;
        Ok(String::from_utf8_lossy(&stdout).trim().to_string())
    }

    async fn get_raw(&self, path: &str) -> Result<Vec<u8>, TransportError> {
        self.run(&["get", "--raw", path]).await
    }

    async fn get_json(&self, path: &str) -> Result<Value, TransportError> {
        let body = self.get_raw(path).await?;
        serde_json::from_slice(&body).map_err(|err| TransportError::decode(path, err))
    }
}

fn events_path(scope: &Scope) -> String {
    ResourceKind::Event.collection_path(scope.namespace())
}

#[async_trait]
impl EventSource for KubectlClient {
    async fn list(&self, scope: &Scope) -> Result<EventListing, TransportError> {
        let body = self.get_raw(&events_path(scope)).await?;
        decode_event_list(&body)
    }

    async fn watch(
        &self,
        scope: &Scope,
        resume_token: &str,
    ) -> Result<Box<dyn EventStream>, TransportError> {
        let mut path = format!("{}?watch=1", events_path(scope));
        if !resume_token.is_empty() {
            path.push_str("&resourceVersion=");
            path.push_str(&crate::kind::encode_query_value(resume_token));
        }
        let args = ["get", "--raw", path.as_str()];
        let mut child = self.command(&args).spawn().map_err(|err| TransportError::Spawn {
            program: self.config.program.clone(),
            message: err.to_string(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| TransportError::Spawn {
            program: self.config.program.clone(),
            message: "stdout not captured".to_string(),
        })?;
        let stderr = child
            .stderr
            .take()
            .map(|pipe| tokio::spawn(read_tail(pipe, STDERR_TAIL)));
        debug!(path = %path, "watch started");
        Ok(Box::new(KubectlWatchStream {
            command: self.describe_command(&args),
            child,
            lines: BufReader::new(stdout).lines(),
            stderr,
            finished: false,
        }))
    }
}

/// Bytes of watch stderr kept for the failure message.
const STDERR_TAIL: usize = 4096;

/// Reads `reader` to EOF, keeping only the last `cap` bytes.
async fn read_tail<R>(mut reader: R, cap: usize) -> String
where
    R: AsyncRead + Unpin,
{
    let mut tail = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                tail.extend_from_slice(&buf[..n]);
                if tail.len() > cap {
                    tail.drain(..tail.len() - cap);
                }
            }
            Err(err) => {
                debug!(error = %err, "could not read watch stderr");
                break;
            }
        }
    }
    String::from_utf8_lossy(&tail).into_owned()
}

/// Line-oriented reader over a `kubectl get --raw ...?watch=1` child. Its
/// stderr is drained by a separate task so the child never blocks on it.
struct KubectlWatchStream {
    command: String,
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
    stderr: Option<JoinHandle<String>>,
    finished: bool,
}

impl KubectlWatchStream {
    /// Called once stdout hits EOF: a non-zero exit becomes an error.
    async fn finish(&mut self) -> Option<Result<Event, TransportError>> {
        self.finished = true;
        let status = self.child.wait().await;
        let stderr = match self.stderr.take() {
            Some(handle) => handle.await.unwrap_or_else(|err| {
                debug!(error = %err, "watch stderr reader failed");
                String::new()
            }),
            None => String::new(),
        };
        match status {
            Ok(status) if status.success() => None,
            Ok(status) => Some(Err(TransportError::CommandFailed {
                command: self.command.clone(),
                code: status.code(),
                stderr: stderr.trim().to_string(),
            })),
            Err(err) => Some(Err(TransportError::Spawn {
                program: self.command.clone(),
                message: err.to_string(),
            })),
        }
    }
}

#[async_trait]
impl EventStream for KubectlWatchStream {
    async fn next(&mut self) -> Option<Result<Event, TransportError>> {
        if self.finished {
            return None;
        }
        loop {
            let line = match self.lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return self.finish().await,
                Err(err) => {
                    self.finished = true;
                    return Some(Err(TransportError::decode("watch stream", err)));
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match decode_watch_line(&line) {
                Ok(WatchFrame::Event(event)) => return Some(Ok(event)),
                Ok(WatchFrame::Skip) => continue,
                Ok(WatchFrame::Rejected(err)) => {
                    self.finished = true;
                    return Some(Err(err));
                }
                Err(err) => {
                    debug!(error = %err, "skipping undecodable watch line");
                    continue;
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawList {
    #[serde(default)]
    items: Vec<Value>,
}

#[async_trait]
impl ObjectSource for KubectlClient {
    async fn get(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Value, TransportError> {
        self.get_json(&kind.object_path(namespace, name)).await
    }

    async fn list(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        options: &ListOptions,
    ) -> Result<Vec<Value>, TransportError> {
        let mut path = kind.collection_path(namespace);
        let query = options.query();
        if !query.is_empty() {
            path.push('?');
            path.push_str(&query);
        }
        let body = self.get_raw(&path).await?;
        let list: RawList =
            serde_json::from_slice(&body).map_err(|err| TransportError::decode(&path, err))?;
        Ok(list.items)
    }

    async fn logs(
        &self,
        namespace: &str,
        pod: &str,
        options: &LogOptions,
    ) -> Result<String, TransportError> {
        let tail = format!("--tail={}", options.tail_lines);
        let limit = format!("--limit-bytes={}", options.limit_bytes);
        let timestamps = format!("--timestamps={}", options.timestamps);
        let args = [
            "logs",
            "-n",
            namespace,
            pod,
            "-c",
            options.container.as_str(),
            tail.as_str(),
            limit.as_str(),
            timestamps.as_str(),
        ];
        let stdout = self.run(&args).await?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct VersionInfo {
    git_version: String,
}

#[async_trait]
impl ClusterSource for KubectlClient {
    async fn cluster_info(&self) -> Result<ClusterInfo, TransportError> {
        let context = self.run_text(&["config", "current-context"]).await?;
        let cluster = self
            .run_text(&["config", "view", "--minify", "-o", "jsonpath={.clusters[0].name}"])
            .await?;
        let namespace = self
            .run_text(&[
                "config",
                "view",
                "--minify",
                "-o",
                "jsonpath={.contexts[0].context.namespace}",
            ])
            .await
            .unwrap_or_else(|err| {
                warn!(error = %err, "could not read context namespace");
                String::new()
            });
        let version: VersionInfo = serde_json::from_value(self.get_json("/version").await?)
            .map_err(|err| TransportError::decode("/version", err))?;
        Ok(ClusterInfo {
            context,
            cluster,
            server_version: version.git_version,
            default_namespace: if namespace.is_empty() {
                "default".to_string()
            } else {
                namespace
            },
        })
    }

    async fn namespaces(&self) -> Result<Vec<String>, TransportError> {
        let items = ObjectSource::list(self, ResourceKind::Namespace, None, &ListOptions::default())
            .await?;
        let mut names: Vec<String> = items
            .iter()
            .filter_map(|item| item.pointer("/metadata/name").and_then(Value::as_str))
            .map(str::to_string)
            .collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use kubeve_core::Scope;

    use tokio::io::AsyncWriteExt;

    use super::{events_path, read_tail, KubectlClient, KubectlConfig};

    #[tokio::test]
    async fn stderr_tail_keeps_a_chatty_writer_moving() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let drain = tokio::spawn(read_tail(reader, 20));
        let noise = "warning: token refreshed\n".repeat(4000);
        writer.write_all(noise.as_bytes()).await.unwrap();
        writer.write_all(b"error: Unauthorized\n").await.unwrap();
        drop(writer);
        assert_eq!(drain.await.unwrap(), "error: Unauthorized\n");
    }

    #[test]
    fn events_path_respects_scope() {
        assert_eq!(events_path(&Scope::All), "/api/v1/events");
        assert_eq!(
            events_path(&Scope::from_namespace("shop")),
            "/api/v1/namespaces/shop/events"
        );
    }

    #[test]
    fn connection_flags_precede_arguments() {
        let client = KubectlClient::new(KubectlConfig {
            program: "kubectl".into(),
            context: Some("staging".into()),
            kubeconfig: Some("/tmp/kc".into()),
        });
        let cmd = client.command(&["get", "--raw", "/version"]);
        let args: Vec<String> = cmd
            .as_std()
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            ["--context", "staging", "--kubeconfig", "/tmp/kc", "get", "--raw", "/version"]
        );
    }

    #[test]
    fn command_description_is_readable() {
        let client = KubectlClient::default();
        assert_eq!(
            client.describe_command(&["get", "--raw", "/api/v1/events"]),
            "kubectl get --raw /api/v1/events"
        );
    }
}
