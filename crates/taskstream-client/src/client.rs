use std::sync::Arc;

use tracing::debug;

use crate::config::ClientConfig;
use crate::errors::TaskError;
use crate::session::{self, AbortHandle, TaskObserver};
use crate::task::TaskRequest;
use crate::transport::{HttpTransport, StreamTransport};

/// Entry point for dispatching task runs against one service.
///
/// Cheap to clone; all methods require a Tokio runtime because each dispatch
/// spawns the session pump task.
#[derive(Clone)]
pub struct TaskClient {
    transport: Arc<dyn StreamTransport>,
    config: ClientConfig,
}

impl TaskClient {
    pub fn new(config: ClientConfig) -> Result<Self, TaskError> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        Ok(Self::with_transport(config, transport))
    }

    pub(crate) fn with_transport(config: ClientConfig, transport: Arc<dyn StreamTransport>) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Validates the request, starts a stream session, and returns its abort
    /// handle.
    ///
    /// Validation failure makes no network call: the observer receives a
    /// single `on_error` and the returned handle is a no-op. Otherwise the
    /// session's handle is returned unmodified, giving the caller one
    /// cancellation surface per run regardless of mode.
    pub fn dispatch(&self, request: TaskRequest, mut observer: impl TaskObserver) -> AbortHandle {
        if let Err(error) = request.validate() {
            debug!(mode = request.mode(), %error, "rejecting task before dispatch");
            observer.on_error(error);
            return AbortHandle::released();
        }

        let run_id = uuid::Uuid::new_v4();
        let endpoint = self.config.endpoint(request.endpoint_path());
        let body = request.request_body();
        debug!(
            run_id = %run_id,
            mode = request.mode(),
            max_steps = request.effective_max_steps(),
            "dispatching task"
        );
        session::spawn_session(self.transport.clone(), endpoint, body, observer, run_id)
    }
}
