use serde_json::Value;

use crate::envelope::{EventEnvelope, EventKind, Origin, Severity};
use crate::errors::TaskError;

/// Run lifecycle as observed by a caller.
///
/// `Initializing` is a local sub-state shown before the first network byte
/// arrives; it has no network effect and is promoted to `Running` by the
/// first server envelope or after [`INIT_GRACE`](crate::run::INIT_GRACE),
/// whichever comes first. Terminal states are sticky.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Initializing,
    Running,
    Completed { success: bool },
    Cancelled,
    Errored,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Cancelled | Self::Errored)
    }
}

/// Latest-known snapshot of what the remote execution engine is doing.
///
/// Fields are merged in from `browser_state` and `step_action` envelopes;
/// an update never clears a field the envelope did not carry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BrowserState {
    pub url: Option<String>,
    pub title: Option<String>,
    pub current_step: Option<u32>,
    pub current_action: Option<String>,
    pub action_params: Option<Value>,
}

/// Result carried by the `done` envelope.
#[derive(Clone, Debug, PartialEq)]
pub struct TerminalResult {
    pub success: bool,
    pub summary: String,
    pub data: Option<Value>,
}

/// Read-only view of a run's progress.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressSnapshot {
    /// Last non-null step seen on any envelope.
    pub current_step: u32,
    /// Caller-supplied ceiling, never derived from the stream.
    pub max_steps: u32,
    pub terminal: Option<TerminalResult>,
    pub browser: BrowserState,
}

/// Folds incoming envelopes into an ordered log and a progress model.
///
/// One reducer instance per run; nothing carries over between runs. The log
/// is append-only and preserves arrival order exactly, including the
/// deliberate secondary URL line after each `browser_state` update.
pub struct RunReducer {
    log: Vec<EventEnvelope>,
    current_step: u32,
    max_steps: u32,
    terminal: Option<TerminalResult>,
    browser: BrowserState,
    state: RunState,
}

impl RunReducer {
    pub fn new(max_steps: u32) -> Self {
        Self {
            log: Vec::new(),
            current_step: 0,
            max_steps,
            terminal: None,
            browser: BrowserState::default(),
            state: RunState::Idle,
        }
    }

    /// Marks the run as preparing to connect.
    pub fn begin(&mut self) {
        if self.state == RunState::Idle {
            self.state = RunState::Initializing;
        }
    }

    /// Promotes `Initializing` to `Running`. No-op in any other state.
    pub fn mark_running(&mut self) {
        if matches!(self.state, RunState::Idle | RunState::Initializing) {
            self.state = RunState::Running;
        }
    }

    /// Applies one envelope. Ignored after a terminal state.
    pub fn apply(&mut self, mut envelope: EventEnvelope) {
        if self.state.is_terminal() {
            return;
        }
        if envelope.origin == Origin::Server {
            self.mark_running();
        }
        if let Some(step) = envelope.step {
            self.current_step = step;
            self.browser.current_step = Some(step);
        }

        match envelope.kind {
            EventKind::BrowserState => {
                let url = payload_str(envelope.payload.as_ref(), "url");
                if let Some(url) = url.clone() {
                    self.browser.url = Some(url);
                }
                if let Some(title) = payload_str(envelope.payload.as_ref(), "title") {
                    self.browser.title = Some(title);
                }
                self.log.push(envelope);
                // Readability: echo the bare URL as its own log line.
                if let Some(url) = url {
                    self.log.push(EventEnvelope::local(Severity::Info, url));
                }
            }
            EventKind::StepAction => {
                if let Some(action) = payload_str(envelope.payload.as_ref(), "action") {
                    self.browser.current_action = Some(action);
                }
                if let Some(params) = envelope
                    .payload
                    .as_ref()
                    .and_then(|data| data.get("params"))
                    .filter(|params| !params.is_null())
                {
                    self.browser.action_params = Some(params.clone());
                }
                self.log.push(envelope);
            }
            EventKind::Done => {
                let success = envelope
                    .payload
                    .as_ref()
                    .and_then(|data| data.get("success"))
                    .and_then(Value::as_bool)
                    .unwrap_or(true);
                envelope.severity = if success {
                    Severity::Success
                } else {
                    Severity::Error
                };
                self.terminal = Some(TerminalResult {
                    success,
                    summary: envelope.message.clone(),
                    data: envelope.payload.clone(),
                });
                self.log.push(envelope);
            }
            // Everything else, known or not, is appended with its own
            // message and severity.
            _ => self.log.push(envelope),
        }
    }

    /// Ends the run after a `done` envelope or natural end-of-stream.
    ///
    /// Without a terminal result (EOF before `done`) the run counts as
    /// successful with `terminal` left `None`.
    pub fn complete(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        let success = self.terminal.as_ref().map(|t| t.success).unwrap_or(true);
        self.state = RunState::Completed { success };
    }

    /// Ends the run with a validation or transport failure.
    pub fn fail(&mut self, error: &TaskError) {
        if self.state.is_terminal() {
            return;
        }
        self.log
            .push(EventEnvelope::local(Severity::Error, error.to_string()));
        self.state = RunState::Errored;
    }

    /// Ends the run after user cancellation.
    pub fn cancel(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.state = RunState::Cancelled;
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// The execution log in arrival order.
    pub fn log(&self) -> &[EventEnvelope] {
        &self.log
    }

    pub fn progress(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            current_step: self.current_step,
            max_steps: self.max_steps,
            terminal: self.terminal.clone(),
            browser: self.browser.clone(),
        }
    }
}

fn payload_str(payload: Option<&Value>, key: &str) -> Option<String> {
    payload
        .and_then(|data| data.get(key))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(kind: EventKind, message: &str, step: Option<u32>, payload: Option<Value>) -> EventEnvelope {
        EventEnvelope {
            kind,
            severity: Severity::Info,
            message: message.into(),
            timestamp: None,
            step,
            payload,
            origin: Origin::Server,
        }
    }

    #[test]
    fn folds_step_action_done_scenario() {
        let mut reducer = RunReducer::new(30);
        reducer.begin();
        reducer.apply(server(EventKind::StepStarted, "Starting step 1", Some(1), None));
        reducer.apply(server(
            EventKind::StepAction,
            "Executing: click",
            Some(1),
            Some(serde_json::json!({"action": "click"})),
        ));
        reducer.apply(server(
            EventKind::Done,
            "all good",
            None,
            Some(serde_json::json!({"success": true, "total_steps": 1})),
        ));
        reducer.complete();

        assert_eq!(reducer.log().len(), 3);
        let progress = reducer.progress();
        assert_eq!(progress.current_step, 1);
        assert_eq!(progress.max_steps, 30);
        assert_eq!(progress.browser.current_action.as_deref(), Some("click"));
        let terminal = progress.terminal.expect("terminal result");
        assert!(terminal.success);
        assert_eq!(terminal.summary, "all good");
        assert_eq!(reducer.state(), RunState::Completed { success: true });
    }

    #[test]
    fn browser_state_merges_and_echoes_url_line() {
        let mut reducer = RunReducer::new(30);
        reducer.apply(server(
            EventKind::BrowserState,
            "Page: Example",
            Some(2),
            Some(serde_json::json!({"url": "https://example.com", "title": "Example"})),
        ));

        assert_eq!(reducer.log().len(), 2);
        assert_eq!(reducer.log()[1].message, "https://example.com");
        assert_eq!(reducer.log()[1].origin, Origin::Local);

        // A later update without a title keeps the previous one.
        reducer.apply(server(
            EventKind::BrowserState,
            "Page: ?",
            Some(3),
            Some(serde_json::json!({"url": "https://example.com/next"})),
        ));
        let browser = reducer.progress().browser;
        assert_eq!(browser.url.as_deref(), Some("https://example.com/next"));
        assert_eq!(browser.title.as_deref(), Some("Example"));
        assert_eq!(browser.current_step, Some(3));
    }

    #[test]
    fn browser_state_without_url_appends_single_entry() {
        let mut reducer = RunReducer::new(30);
        reducer.apply(server(
            EventKind::BrowserState,
            "Page: unknown",
            None,
            Some(serde_json::json!({"title": "t"})),
        ));
        assert_eq!(reducer.log().len(), 1);
    }

    #[test]
    fn error_envelope_does_not_end_the_run() {
        let mut reducer = RunReducer::new(30);
        reducer.apply(server(EventKind::Error, "Browser error: timeout", None, None));
        assert_eq!(reducer.state(), RunState::Running);
        assert_eq!(reducer.log().len(), 1);
        assert!(reducer.progress().terminal.is_none());
    }

    #[test]
    fn done_with_failure_flag_derives_error_severity() {
        let mut reducer = RunReducer::new(30);
        reducer.apply(server(
            EventKind::Done,
            "could not finish",
            None,
            Some(serde_json::json!({"success": false})),
        ));
        reducer.complete();

        assert_eq!(reducer.log()[0].severity, Severity::Error);
        assert_eq!(reducer.state(), RunState::Completed { success: false });
        assert!(!reducer.progress().terminal.expect("terminal").success);
    }

    #[test]
    fn done_without_success_flag_defaults_to_success() {
        let mut reducer = RunReducer::new(30);
        reducer.apply(server(EventKind::Done, "Stream ended", None, None));
        assert_eq!(reducer.log()[0].severity, Severity::Success);
        assert!(reducer.progress().terminal.expect("terminal").success);
    }

    #[test]
    fn unknown_kind_is_appended_as_is() {
        let mut reducer = RunReducer::new(30);
        reducer.apply(server(
            EventKind::Other("screenshot_ready".into()),
            "shot taken",
            Some(4),
            None,
        ));
        assert_eq!(reducer.log().len(), 1);
        assert_eq!(reducer.progress().current_step, 4);
    }

    #[test]
    fn step_updates_counter_regardless_of_kind() {
        let mut reducer = RunReducer::new(30);
        reducer.apply(server(EventKind::Progress, "working", Some(7), None));
        assert_eq!(reducer.progress().current_step, 7);
        // Retries may repeat or lower a step number.
        reducer.apply(server(EventKind::StepStarted, "retry", Some(7), None));
        assert_eq!(reducer.progress().current_step, 7);
        reducer.apply(server(EventKind::Progress, "no step", None, None));
        assert_eq!(reducer.progress().current_step, 7);
    }

    #[test]
    fn eof_without_done_completes_with_no_terminal_result() {
        let mut reducer = RunReducer::new(30);
        reducer.begin();
        reducer.apply(server(EventKind::Progress, "working", None, None));
        reducer.complete();
        assert_eq!(reducer.state(), RunState::Completed { success: true });
        assert!(reducer.progress().terminal.is_none());
    }

    #[test]
    fn fail_appends_system_entry_and_is_terminal() {
        let mut reducer = RunReducer::new(30);
        reducer.begin();
        reducer.fail(&TaskError::validation("task instruction must not be empty"));

        assert_eq!(reducer.state(), RunState::Errored);
        assert_eq!(reducer.log().len(), 1);
        assert_eq!(reducer.log()[0].origin, Origin::Local);
        assert_eq!(reducer.log()[0].severity, Severity::Error);

        // Terminal states are sticky.
        reducer.apply(server(EventKind::Progress, "late", Some(1), None));
        reducer.complete();
        reducer.cancel();
        assert_eq!(reducer.state(), RunState::Errored);
        assert_eq!(reducer.log().len(), 1);
    }

    #[test]
    fn first_server_envelope_promotes_initializing_to_running() {
        let mut reducer = RunReducer::new(30);
        reducer.begin();
        assert_eq!(reducer.state(), RunState::Initializing);
        reducer.apply(EventEnvelope::local(Severity::Info, "local note"));
        assert_eq!(reducer.state(), RunState::Initializing);
        reducer.apply(server(EventKind::Progress, "working", None, None));
        assert_eq!(reducer.state(), RunState::Running);
    }
}
