//! Streaming client for a remote browser-automation task service.
//!
//! A run is started with one HTTP POST per task mode; the service answers
//! with a newline-delimited event stream that this crate decodes
//! incrementally and folds into an ordered execution log plus a live
//! progress snapshot. Cancellation is deterministic: aborting a run tears
//! down the in-flight request and guarantees no further event delivery.
//!
//! # Quick start
//!
//! ```no_run
//! use taskstream_client::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), TaskError> {
//! let client = TaskClient::new(ClientConfig::from_env())?;
//! let run = client.start(TaskRequest::basic("Open example.com and read the headline").max_steps(20));
//!
//! while !run.state().is_terminal() {
//!     tokio::time::sleep(std::time::Duration::from_millis(200)).await;
//! }
//! for entry in run.log() {
//!     println!("[{}] {}", entry.severity, entry.message);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Callers needing event-by-event delivery implement [`TaskObserver`] and use
//! [`TaskClient::dispatch`] directly.

/// Client entry point and dispatch operation.
pub mod client;
/// Service endpoint configuration.
pub mod config;
/// Decoded stream events.
pub mod envelope;
/// Public error types.
pub mod errors;
/// Incremental chunk-to-envelope decoding.
pub mod framer;
/// Common imports for typical usage.
pub mod prelude;
/// Execution log and progress folding.
pub mod reducer;
/// Per-run handle with read-only snapshots.
pub mod run;
/// Stream session pump, observer contract, and cancellation.
pub mod session;
/// Task modes, validation, and request bodies.
pub mod task;
/// Transport seam between the session and the network.
pub mod transport;

pub use client::TaskClient;
pub use config::ClientConfig;
pub use envelope::{EventEnvelope, EventKind, Origin, Severity};
pub use errors::TaskError;
pub use framer::EventFramer;
pub use reducer::{BrowserState, ProgressSnapshot, RunReducer, RunState, TerminalResult};
pub use run::TaskRun;
pub use session::{AbortHandle, TaskObserver};
pub use task::{ResearchDepth, TaskRequest, TaskSpec};
pub use transport::{ByteStream, HttpTransport, StreamTransport};
