use std::sync::Arc;

use futures::StreamExt as _;
use serde_json::Value;
use tokio::sync::watch;
use tracing::debug;

use crate::envelope::{EventEnvelope, EventKind, Severity};
use crate::errors::TaskError;
use crate::framer::EventFramer;
use crate::transport::StreamTransport;

pub(crate) const CANCELLED_MESSAGE: &str = "Cancelled by user";

/// Callbacks invoked by a stream session, in envelope arrival order.
///
/// For one session, `on_error`, `on_complete`, and `on_cancelled` are
/// mutually exclusive and invoked at most once; `on_event` is never invoked
/// again after any of them fired. Cancellation is not an error and never
/// reaches `on_error`.
pub trait TaskObserver: Send + 'static {
    /// One decoded or locally-synthesized envelope.
    fn on_event(&mut self, envelope: EventEnvelope);
    /// Terminal validation or transport failure.
    fn on_error(&mut self, error: TaskError);
    /// The stream ended, via a `done` envelope or natural end-of-stream.
    fn on_complete(&mut self);
    /// The run was torn down by the abort handle.
    fn on_cancelled(&mut self) {}
}

/// Lifecycle of one in-flight session, tracked for log correlation.
///
/// A session starts connecting the moment it is dispatched; terminal states
/// are sticky and no dispatch happens after one is reached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SessionState {
    Connecting,
    Streaming,
    Completed,
    Errored,
    Cancelled,
}

/// Handle used to request cancellation of a running session.
///
/// `abort()` is idempotent: calling it twice, or after the session already
/// reached a terminal state, is a no-op.
#[derive(Clone)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    pub(crate) fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, rx)
    }

    /// Handle for a run that never started a session (validation failure).
    pub(crate) fn released() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Requests cancellation. Safe before the first byte, mid-stream, and
    /// after completion.
    pub fn abort(&self) {
        let _ = self.tx.send(true);
    }
}

pub(crate) fn spawn_session(
    transport: Arc<dyn StreamTransport>,
    endpoint: String,
    body: Value,
    observer: impl TaskObserver,
    run_id: uuid::Uuid,
) -> AbortHandle {
    let (handle, abort_rx) = AbortHandle::new();
    // The task holds a clone so the watch channel outlives a dropped caller
    // handle.
    let guard = handle.clone();
    tokio::spawn(session_task(
        transport, endpoint, body, observer, abort_rx, guard, run_id,
    ));
    handle
}

async fn session_task(
    transport: Arc<dyn StreamTransport>,
    endpoint: String,
    body: Value,
    mut observer: impl TaskObserver,
    mut abort_rx: watch::Receiver<bool>,
    _guard: AbortHandle,
    run_id: uuid::Uuid,
) {
    let mut state = SessionState::Connecting;
    debug!(run_id = %run_id, endpoint = %endpoint, "opening task stream");

    let open = transport.open(&endpoint, &body);
    tokio::pin!(open);
    let opened = loop {
        tokio::select! {
            biased;
            _ = abort_rx.changed() => {
                if *abort_rx.borrow() {
                    finish_cancelled(&mut observer, &mut state, run_id);
                    return;
                }
            }
            result = &mut open => break result,
        }
    };

    let mut bytes = match opened {
        Ok(stream) => stream,
        Err(error) => {
            state = SessionState::Errored;
            debug!(run_id = %run_id, %error, state = ?state, "task stream failed to open");
            observer.on_error(error);
            return;
        }
    };

    let mut framer = EventFramer::default();
    loop {
        tokio::select! {
            biased;
            _ = abort_rx.changed() => {
                // The partial buffer is discarded along with the framer.
                if *abort_rx.borrow() {
                    finish_cancelled(&mut observer, &mut state, run_id);
                    return;
                }
            }
            next = bytes.next() => {
                match next {
                    Some(Ok(chunk)) => {
                        if state == SessionState::Connecting {
                            state = SessionState::Streaming;
                            debug!(run_id = %run_id, "task stream receiving");
                        }
                        for envelope in framer.push_chunk(&chunk) {
                            let is_done = envelope.kind == EventKind::Done;
                            observer.on_event(envelope);
                            if is_done {
                                // Terminal signal; anything still buffered or
                                // in flight is discarded.
                                state = SessionState::Completed;
                                debug!(
                                    run_id = %run_id,
                                    state = ?state,
                                    decoded = framer.decoded(),
                                    dropped = framer.dropped(),
                                    "task stream completed"
                                );
                                observer.on_complete();
                                return;
                            }
                        }
                    }
                    Some(Err(error)) => {
                        state = SessionState::Errored;
                        debug!(run_id = %run_id, state = ?state, %error, "task stream read failed");
                        observer.on_error(error);
                        return;
                    }
                    None => {
                        if framer.has_residual() {
                            debug!(
                                run_id = %run_id,
                                residual = framer.residual_len(),
                                "discarding incomplete trailing line"
                            );
                        }
                        state = SessionState::Completed;
                        debug!(
                            run_id = %run_id,
                            state = ?state,
                            decoded = framer.decoded(),
                            dropped = framer.dropped(),
                            "task stream ended"
                        );
                        observer.on_complete();
                        return;
                    }
                }
            }
        }
    }
}

fn finish_cancelled(
    observer: &mut impl TaskObserver,
    state: &mut SessionState,
    run_id: uuid::Uuid,
) {
    observer.on_event(EventEnvelope::local(Severity::Warn, CANCELLED_MESSAGE));
    *state = SessionState::Cancelled;
    debug!(run_id = %run_id, "task stream cancelled");
    observer.on_cancelled();
}
