//! Glue between the [`App`] state machine and the background work it asks
//! for: watch subscriptions, drill-down fetches and config writes.
//!
//! The session is driven from the single update loop. Background tasks only
//! talk back through channels, which [`Session::drain`] empties without
//! waiting.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use kubeve_core::config::{self, Config};
use kubeve_core::{Scope, WatchGeneration};
use kubeve_kube::{fetch_drilldown, DrillDown, DrillDownTarget, EventSource, ObjectSource};
use kubeve_render::input::InputEvent;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::app::{App, Command};
use crate::watch::{WatchController, WatchEnvelope, WatchOptions, WatchPayload};

/// A finished drill-down fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrillDownResult {
    pub request_id: u64,
    pub drilldown: DrillDown,
}

struct PendingDrillDown {
    request_id: u64,
    cancel: CancellationToken,
}

pub struct Session {
    app: App,
    watch: WatchController,
    watch_rx: mpsc::UnboundedReceiver<WatchEnvelope>,
    objects: Arc<dyn ObjectSource>,
    drill_tx: mpsc::UnboundedSender<DrillDownResult>,
    drill_rx: mpsc::UnboundedReceiver<DrillDownResult>,
    pending: Option<PendingDrillDown>,
    drill_timeout: Duration,
    config: Config,
    config_path: Option<PathBuf>,
}

impl Session {
    #[must_use]
    pub fn new(
        app: App,
        events: Arc<dyn EventSource>,
        objects: Arc<dyn ObjectSource>,
        config: Config,
    ) -> Self {
        let options = WatchOptions {
            include_history: config.flags.include_history,
            ..WatchOptions::default()
        };
        Self::with_watch_options(app, events, objects, config, options)
    }

    #[must_use]
    pub fn with_watch_options(
        app: App,
        events: Arc<dyn EventSource>,
        objects: Arc<dyn ObjectSource>,
        config: Config,
        options: WatchOptions,
    ) -> Self {
        let (watch, watch_rx) = WatchController::new(events, options);
        let (drill_tx, drill_rx) = mpsc::unbounded_channel();
        Self {
            app,
            watch,
            watch_rx,
            objects,
            drill_tx,
            drill_rx,
            pending: None,
            drill_timeout: config.drilldown.timeout(),
            config,
            config_path: None,
        }
    }

    /// Writes theme changes to `path` instead of the default location.
    #[must_use]
    pub fn with_config_path(mut self, path: PathBuf) -> Self {
        self.config_path = Some(path);
        self
    }

    /// Starts the first subscription.
    pub fn start(&mut self, scope: Scope) {
        self.apply(Command::SetScope(scope));
    }

    #[must_use]
    pub fn app(&self) -> &App {
        &self.app
    }

    #[must_use]
    pub fn generation(&self) -> WatchGeneration {
        self.watch.generation()
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Feeds one input event through the app and performs what it asks for.
    /// Returns false once the app wants to quit.
    pub fn handle_input(&mut self, event: InputEvent) -> bool {
        let command = self.app.update(event);
        self.apply(command)
    }

    /// Performs a command. Returns false for [`Command::Quit`].
    pub fn apply(&mut self, command: Command) -> bool {
        match command {
            Command::None => {}
            Command::Quit => {
                self.cancel_drilldown();
                self.watch.stop();
                return false;
            }
            Command::SetScope(scope) => {
                let generation = self.watch.set_scope(scope.clone());
                self.app.scope_started(scope, generation);
            }
            Command::FetchDrillDown { request_id, target } => {
                self.spawn_drilldown(request_id, target);
            }
            Command::CancelDrillDown { request_id } => {
                if self
                    .pending
                    .as_ref()
                    .is_some_and(|pending| pending.request_id == request_id)
                {
                    self.cancel_drilldown();
                }
            }
            Command::PersistTheme(theme) => {
                self.config.theme = theme;
                self.persist_config();
            }
        }
        true
    }

    /// Applies everything background tasks have delivered so far. Returns
    /// whether anything visible may have changed.
    pub fn drain(&mut self) -> bool {
        let mut changed = false;
        while let Ok(envelope) = self.watch_rx.try_recv() {
            changed |= self.handle_envelope(envelope);
        }
        while let Ok(result) = self.drill_rx.try_recv() {
            changed |= self.handle_drilldown(result);
        }
        changed
    }

    /// Waits for the next background delivery and applies it. Returns
    /// whether it changed anything.
    pub async fn next_update(&mut self) -> bool {
        tokio::select! {
            Some(envelope) = self.watch_rx.recv() => self.handle_envelope(envelope),
            Some(result) = self.drill_rx.recv() => self.handle_drilldown(result),
            else => false,
        }
    }

    fn handle_envelope(&mut self, envelope: WatchEnvelope) -> bool {
        if !self.watch.accept(&envelope) {
            tracing::trace!(
                stale = %envelope.generation,
                current = %self.watch.generation(),
                "discarding stale watch result"
            );
            return false;
        }
        match envelope.payload {
            WatchPayload::Event(event) => self.app.on_event(event),
            WatchPayload::Failed(err) => self.app.on_watch_failed(&err),
        }
        true
    }

    fn handle_drilldown(&mut self, result: DrillDownResult) -> bool {
        if self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.request_id == result.request_id)
        {
            self.pending = None;
        }
        let applied = self.app.on_drilldown(result.request_id, result.drilldown);
        if !applied {
            tracing::debug!(request_id = result.request_id, "discarding late drill-down");
        }
        applied
    }

    fn spawn_drilldown(&mut self, request_id: u64, target: DrillDownTarget) {
        self.cancel_drilldown();
        let cancel = CancellationToken::new();
        let objects = Arc::clone(&self.objects);
        let tx = self.drill_tx.clone();
        let timeout = self.drill_timeout;
        let token = cancel.clone();
        tracing::debug!(request_id, kind = %target.kind, name = %target.name, "fetching drill-down");

        tokio::spawn(async move {
            let drilldown = tokio::select! {
                biased;
                () = token.cancelled() => return,
                drilldown = fetch_drilldown(objects.as_ref(), &target, timeout) => drilldown,
            };
            let _ = tx.send(DrillDownResult {
                request_id,
                drilldown,
            });
        });
        self.pending = Some(PendingDrillDown { request_id, cancel });
    }

    fn cancel_drilldown(&mut self) {
        if let Some(pending) = self.pending.take() {
            tracing::debug!(request_id = pending.request_id, "cancelling drill-down");
            pending.cancel.cancel();
        }
    }

    fn persist_config(&self) {
        let result = match &self.config_path {
            Some(path) => config::save_to(path, &self.config).map(|()| path.clone()),
            None => config::save(&self.config),
        };
        match result {
            Ok(path) => tracing::info!(path = %path.display(), "saved config"),
            Err(err) => tracing::warn!(error = %err, "failed to save config"),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel_drilldown();
    }
}
