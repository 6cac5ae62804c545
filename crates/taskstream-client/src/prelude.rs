//! Common imports for typical client usage.
//!
//! This module intentionally exports the most frequently used types so
//! examples and application code need fewer import lines.
pub use crate::{
    AbortHandle, BrowserState, ClientConfig, EventEnvelope, EventKind, Origin, ProgressSnapshot,
    ResearchDepth, RunState, Severity, TaskClient, TaskError, TaskObserver, TaskRequest, TaskRun,
    TaskSpec, TerminalResult,
};
