/// Errors surfaced by the client API.
///
/// Cancellation is deliberately not represented here: aborting a run is a
/// clean terminal path reported through `TaskObserver::on_cancelled`, never
/// through `on_error`. Malformed single data lines are absorbed by the framer
/// and never become a `TaskError`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid task parameters, caught before any network call.
    #[error("validation error: {0}")]
    Validation(String),
    /// Network or stream I/O failed.
    #[error("transport error: {0}")]
    Transport(String),
    /// The service rejected the task-start request.
    #[error("task service returned status {status}: {message}")]
    Status { status: u16, message: String },
}

impl TaskError {
    pub(crate) fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
