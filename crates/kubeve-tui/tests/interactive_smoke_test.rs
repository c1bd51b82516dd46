#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use kubeve_core::config::{self, Config};
use kubeve_core::{Event, EventType, ResourceRef, Scope};
use kubeve_kube::mock::{MockCall, MockCluster};
use kubeve_kube::{ClusterInfo, ResourceKind};
use kubeve_render::input::{InputEvent, Key, KeyEvent, ResizeEvent};
use kubeve_render::snapshot::assert_frame_contains;
use kubeve_tui::layout::Column;
use kubeve_tui::{App, Session, UiMode};
use serde_json::json;

fn cluster_info() -> ClusterInfo {
    ClusterInfo {
        context: "kind-dev".into(),
        cluster: "kind-dev".into(),
        server_version: "v1.30.0".into(),
        default_namespace: "default".into(),
    }
}

fn event(kind: &str, name: &str, event_type: EventType, reason: &str, secs: i64) -> Event {
    Event {
        timestamp: Utc.timestamp_opt(1_714_564_800 + secs, 0).single(),
        resource: ResourceRef::new(kind, name),
        event_type,
        reason: reason.into(),
        namespace: "default".into(),
        message: format!("{reason} {name}"),
    }
}

fn key(ch: char) -> InputEvent {
    InputEvent::Key(KeyEvent::plain(Key::Char(ch)))
}

fn special(k: Key) -> InputEvent {
    InputEvent::Key(KeyEvent::plain(k))
}

fn type_text(session: &mut Session, text: &str) {
    for ch in text.chars() {
        session.handle_input(key(ch));
    }
}

async fn pump_until(session: &mut Session, done: impl Fn(&App) -> bool) {
    tokio::time::timeout(Duration::from_secs(30), async {
        while !done(session.app()) {
            session.next_update().await;
        }
    })
    .await
    .unwrap();
}

fn seeded_cluster() -> Arc<MockCluster> {
    let scope = Scope::from_namespace("default");
    Arc::new(
        MockCluster::new()
            .with_namespaces(&["default", "kube-system"])
            .with_watch(
                &scope,
                vec![
                    (
                        Duration::ZERO,
                        Ok(event("Pod", "web-1", EventType::Warning, "BackOff", 1)),
                    ),
                    (
                        Duration::ZERO,
                        Ok(event("Deployment", "pd-worker", EventType::Normal, "ScalingReplicaSet", 2)),
                    ),
                    (
                        Duration::ZERO,
                        Ok(event("Pod", "web-1", EventType::Warning, "BackOff", 3)),
                    ),
                ],
            )
            .with_object(
                ResourceKind::Pod,
                "default",
                "web-1",
                json!({
                    "metadata": {"name": "web-1", "namespace": "default"},
                    "spec": {"nodeName": "node-a"},
                    "status": {"phase": "Running"}
                }),
            ),
    )
}

async fn started_session(cluster: &Arc<MockCluster>, config: Config) -> Session {
    let mut app = App::new(cluster_info(), &config);
    app.set_namespaces(vec!["default".into(), "kube-system".into()]);
    let mut session = Session::new(app, cluster.clone(), cluster.clone(), config);
    session.handle_input(InputEvent::Resize(ResizeEvent {
        width: 160,
        height: 30,
    }));
    session.start(Scope::from_namespace("default"));
    pump_until(&mut session, |app| app.view().event_log().len() == 3).await;
    session
}

#[tokio::test]
async fn live_events_render_and_filter() {
    let cluster = seeded_cluster();
    let mut session = started_session(&cluster, Config::default()).await;

    assert_eq!(session.app().selected_row(), 2);
    let frame = session.app().render();
    assert_frame_contains("header", &frame, "Namespace: default");
    assert_frame_contains("row", &frame, "Deployment/pd-worker");

    session.handle_input(key('/'));
    type_text(&mut session, "Warn");
    session.handle_input(special(Key::Enter));
    assert_eq!(session.app().view().rows().len(), 2);
    assert!(session.app().title().starts_with("[Filter: Warn]"));

    session.handle_input(key('/'));
    type_text(&mut session, "web");
    session.handle_input(special(Key::Enter));
    session.handle_input(key('G'));
    let rows = session.app().view().rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].cell(Column::Status), Some("2"));
}

#[tokio::test]
async fn palette_jump_prefers_substring_match() {
    let cluster = seeded_cluster();
    let mut session = started_session(&cluster, Config::default()).await;

    session.handle_input(key(':'));
    type_text(&mut session, "jump pd");
    session.handle_input(special(Key::Enter));
    assert_eq!(session.app().mode(), UiMode::Main);
    assert_eq!(session.app().selected_row(), 1);
}

#[tokio::test]
async fn drilldown_loads_from_object_source() {
    let cluster = seeded_cluster();
    let mut session = started_session(&cluster, Config::default()).await;

    session.handle_input(special(Key::Home));
    assert!(session.handle_input(special(Key::Enter)));
    assert_eq!(session.app().mode(), UiMode::Details);
    assert!(session.app().details().unwrap().is_loading());

    pump_until(&mut session, |app| {
        app.details().is_some_and(|details| !details.is_loading())
    })
    .await;
    assert_frame_contains("describe", &session.app().render(), "Phase: Running");
    let lines: Vec<String> = session
        .app()
        .details()
        .unwrap()
        .lines()
        .iter()
        .map(|line| line.rendered())
        .collect();
    assert!(lines.iter().any(|line| line == "Related Resources"));
    assert!(lines.iter().any(|line| line == "Node: node-a"));
    assert!(cluster.calls().contains(&MockCall::Get {
        kind: ResourceKind::Pod,
        namespace: Some("default".into()),
        name: "web-1".into(),
    }));

    session.handle_input(special(Key::Escape));
    assert_eq!(session.app().mode(), UiMode::Main);
    assert!(!session.handle_input(key('q')));
    assert!(session.app().quitting());
}

#[tokio::test]
async fn theme_command_writes_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    let cluster = seeded_cluster();
    let mut session = started_session(&cluster, Config::default())
        .await
        .with_config_path(path.clone());

    session.handle_input(key(':'));
    type_text(&mut session, "theme ember");
    session.handle_input(special(Key::Enter));
    assert_eq!(session.config().theme.name, "ember");
    assert_eq!(config::load_from(&path).unwrap().theme.name, "ember");
}
