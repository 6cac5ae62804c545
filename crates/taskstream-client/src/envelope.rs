use std::fmt;

use serde_json::Value;

/// Kind tag for a stream event.
///
/// Wire kinds map to the closed set below; kinds this crate does not know yet
/// decode as `Other` so new server-side kinds never fail a session. `System`
/// is reserved for locally-synthesized entries and is never produced from a
/// wire line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// A new agent step began.
    StepStarted,
    /// Agent reasoning text for the current step.
    StepThinking,
    /// The agent is executing a browser action.
    StepAction,
    /// Outcome of a step.
    StepResult,
    /// Snapshot of the page the agent is currently on.
    BrowserState,
    /// Generic progress/status message.
    Progress,
    /// Application-level error reported by the service. Not terminal.
    Error,
    /// Terminal event carrying the run result.
    Done,
    /// Locally-synthesized entry (cancellation, failures, URL echoes).
    System,
    /// Unrecognized wire kind, preserved verbatim.
    Other(String),
}

impl EventKind {
    pub(crate) fn from_wire(value: &str) -> Self {
        match value {
            "step_start" => Self::StepStarted,
            "step_thinking" => Self::StepThinking,
            "step_action" => Self::StepAction,
            "step_result" => Self::StepResult,
            "browser_state" => Self::BrowserState,
            "progress" => Self::Progress,
            "error" => Self::Error,
            "done" => Self::Done,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Returns the wire-style name for this kind.
    pub fn name(&self) -> &str {
        match self {
            Self::StepStarted => "step_start",
            Self::StepThinking => "step_thinking",
            Self::StepAction => "step_action",
            Self::StepResult => "step_result",
            Self::BrowserState => "browser_state",
            Self::Progress => "progress",
            Self::Error => "error",
            Self::Done => "done",
            Self::System => "system",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Log severity carried by an event, independent of its kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warn,
    Error,
    Debug,
}

impl Severity {
    pub(crate) fn from_wire(value: &str) -> Self {
        match value {
            "success" => Self::Success,
            "warn" => Self::Warn,
            "error" => Self::Error,
            "debug" => Self::Debug,
            _ => Self::Info,
        }
    }

    /// Returns the wire-style name for this severity.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Debug => "debug",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether an envelope was decoded from the wire or synthesized locally.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    /// Decoded from a data line of the event stream.
    Server,
    /// Synthesized by this client (cancellation feedback, errors).
    Local,
}

/// One decoded unit of the event stream.
///
/// Immutable once constructed; the wire line that produced a `Server`
/// envelope is its sole source of truth.
#[derive(Clone, Debug, PartialEq)]
pub struct EventEnvelope {
    pub kind: EventKind,
    pub severity: Severity,
    /// Human-readable text. Always present, may be empty.
    pub message: String,
    /// Server-side timestamp, passed through verbatim.
    pub timestamp: Option<String>,
    /// Step counter hint. Retries may repeat a step number.
    pub step: Option<u32>,
    /// Open mapping of event-specific values, opaque to the framer.
    pub payload: Option<Value>,
    pub origin: Origin,
}

impl EventEnvelope {
    /// Creates a locally-synthesized system envelope.
    pub(crate) fn local(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind: EventKind::System,
            severity,
            message: message.into(),
            timestamp: None,
            step: None,
            payload: None,
            origin: Origin::Local,
        }
    }
}

#[derive(serde::Deserialize)]
struct WireEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    level: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    step: Option<u32>,
    #[serde(default)]
    data: Option<Value>,
}

/// Decodes the JSON remainder of a data line into an envelope.
pub(crate) fn decode_wire(payload: &str) -> Result<EventEnvelope, serde_json::Error> {
    let wire: WireEvent = serde_json::from_str(payload)?;
    Ok(EventEnvelope {
        kind: EventKind::from_wire(&wire.kind),
        severity: wire
            .level
            .as_deref()
            .map(Severity::from_wire)
            .unwrap_or(Severity::Info),
        message: wire.message.unwrap_or_default(),
        timestamp: wire.timestamp,
        step: wire.step,
        payload: wire.data,
        origin: Origin::Server,
    })
}
