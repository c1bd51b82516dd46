//! Watch session controller.
//!
//! Owns at most one background subscription task. Every scope change
//! cancels the running task, mints a new [`WatchGeneration`] and spawns a
//! fresh task bound to it. Tasks report through one ordered channel; the
//! update loop drops any envelope whose generation is not current.

use std::sync::Arc;
use std::time::Duration;

use kubeve_core::{Event, Scope, WatchGeneration};
use kubeve_kube::{EventSource, TransportError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Pause before re-listing after the server ends a watch.
pub const DEFAULT_RESTART_BACKOFF: Duration = Duration::from_secs(1);

/// HTTP status the API server uses when a resume token has expired.
const GONE: i64 = 410;

/// A result from a subscription task, tagged with the generation it ran for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEnvelope {
    pub generation: WatchGeneration,
    pub payload: WatchPayload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchPayload {
    Event(Event),
    /// Terminal failure; the task has stopped.
    Failed(TransportError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    /// Deliver the events returned by the initial listing.
    pub include_history: bool,
    pub restart_backoff: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            include_history: false,
            restart_backoff: DEFAULT_RESTART_BACKOFF,
        }
    }
}

// ---------------------------------------------------------------------------
// WatchController
// ---------------------------------------------------------------------------

pub struct WatchController {
    source: Arc<dyn EventSource>,
    tx: mpsc::UnboundedSender<WatchEnvelope>,
    options: WatchOptions,
    generation: WatchGeneration,
    scope: Option<Scope>,
    cancel: Option<CancellationToken>,
}

impl WatchController {
    /// Creates an idle controller and the receiving end of its channel.
    #[must_use]
    pub fn new(
        source: Arc<dyn EventSource>,
        options: WatchOptions,
    ) -> (Self, mpsc::UnboundedReceiver<WatchEnvelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let controller = Self {
            source,
            tx,
            options,
            generation: WatchGeneration::default(),
            scope: None,
            cancel: None,
        };
        (controller, rx)
    }

    /// Tears down the running subscription and starts one for `scope`.
    /// Must be called from within a tokio runtime.
    pub fn set_scope(&mut self, scope: Scope) -> WatchGeneration {
        self.stop();
        self.generation = self.generation.next();
        let cancel = CancellationToken::new();
        tracing::info!(scope = %scope, generation = %self.generation, "starting watch");

        tokio::spawn(run_subscription(
            Arc::clone(&self.source),
            scope.clone(),
            self.generation,
            self.options,
            cancel.clone(),
            self.tx.clone(),
        ));
        self.scope = Some(scope);
        self.cancel = Some(cancel);
        self.generation
    }

    /// Cancels the running subscription, if any.
    pub fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            tracing::debug!(generation = %self.generation, "cancelling watch");
            cancel.cancel();
        }
    }

    /// Whether `envelope` belongs to the current subscription.
    #[must_use]
    pub fn accept(&self, envelope: &WatchEnvelope) -> bool {
        envelope.generation == self.generation
    }

    #[must_use]
    pub fn generation(&self) -> WatchGeneration {
        self.generation
    }

    #[must_use]
    pub fn scope(&self) -> Option<&Scope> {
        self.scope.as_ref()
    }
}

impl Drop for WatchController {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// Subscription task
// ---------------------------------------------------------------------------

async fn run_subscription(
    source: Arc<dyn EventSource>,
    scope: Scope,
    generation: WatchGeneration,
    options: WatchOptions,
    cancel: CancellationToken,
    tx: mpsc::UnboundedSender<WatchEnvelope>,
) {
    let send = |payload: WatchPayload| {
        tx.send(WatchEnvelope {
            generation,
            payload,
        })
        .is_ok()
    };
    let mut first_pass = true;

    loop {
        let listing = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            result = source.list(&scope) => result,
        };
        let listing = match listing {
            Ok(listing) => listing,
            Err(err) => {
                tracing::warn!(scope = %scope, error = %err, "event listing failed");
                send(WatchPayload::Failed(err));
                return;
            }
        };
        if first_pass && options.include_history {
            for event in listing.events {
                if cancel.is_cancelled() || !send(WatchPayload::Event(event)) {
                    return;
                }
            }
        }
        first_pass = false;

        let stream = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            result = source.watch(&scope, &listing.resume_token) => result,
        };
        let mut stream = match stream {
            Ok(stream) => stream,
            Err(err) => {
                tracing::warn!(scope = %scope, error = %err, "watch failed to start");
                send(WatchPayload::Failed(err));
                return;
            }
        };

        loop {
            let item = tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                item = stream.next() => item,
            };
            match item {
                Some(Ok(event)) => {
                    if !send(WatchPayload::Event(event)) {
                        return;
                    }
                }
                Some(Err(TransportError::WatchRejected {
                    code: Some(GONE), ..
                })) => {
                    tracing::debug!(scope = %scope, "resume token expired, re-listing");
                    break;
                }
                Some(Err(err)) => {
                    tracing::warn!(scope = %scope, error = %err, "watch ended with error");
                    send(WatchPayload::Failed(err));
                    return;
                }
                None => {
                    tracing::debug!(scope = %scope, "watch closed, restarting");
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => return,
                        () = tokio::time::sleep(options.restart_backoff) => {}
                    }
                    break;
                }
            }
        }
    }
}
