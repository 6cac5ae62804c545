use std::time::Duration;

/// Configuration for the task service client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the task-execution service.
    pub base_url: String,
    /// Connection establishment timeout.
    ///
    /// There is no whole-request timeout: streams are long-lived by design.
    /// Callers wanting a run ceiling should layer a timer over the abort
    /// handle instead.
    pub connect_timeout: Duration,
}

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

impl ClientConfig {
    /// Creates a config pointing at an explicit base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Builds a config from `TASKSTREAM_BASE_URL`, falling back to the local
    /// development default.
    pub fn from_env() -> Self {
        let base_url = std::env::var("TASKSTREAM_BASE_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self::new(base_url)
    }

    /// Overrides the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slash() {
        let config = ClientConfig::new("http://localhost:8000/");
        assert_eq!(
            config.endpoint("/stream/basic-task"),
            "http://localhost:8000/stream/basic-task"
        );
    }
}
