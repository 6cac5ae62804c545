use serde_json::Value;

use crate::errors::TaskError;

/// How thoroughly a research task should explore its topic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResearchDepth {
    Shallow,
    #[default]
    Moderate,
    Deep,
}

impl ResearchDepth {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shallow => "shallow",
            Self::Moderate => "moderate",
            Self::Deep => "deep",
        }
    }
}

/// Mode-specific task parameters.
///
/// Each variant maps to one service endpoint and one request body shape.
#[derive(Clone, Debug, PartialEq)]
pub enum TaskSpec {
    /// Free-form browser automation instruction.
    Basic { task: String },
    /// Structured data extraction from a single page.
    ExtractData {
        url: String,
        data_schema: Value,
        max_items: Option<u32>,
    },
    /// Multi-source topic research.
    Research {
        topic: String,
        depth: ResearchDepth,
        max_sources: u32,
    },
    /// Product comparison across the given aspects.
    CompareProducts {
        products: Vec<String>,
        aspects: Vec<String>,
    },
    /// Page comparison against free-form criteria.
    ComparePages {
        urls: Vec<String>,
        comparison_criteria: String,
    },
}

impl TaskSpec {
    /// Creates a basic automation task.
    pub fn basic(task: impl Into<String>) -> Self {
        Self::Basic { task: task.into() }
    }

    /// Creates an extraction task for `url` with the given schema.
    pub fn extract_data(url: impl Into<String>, data_schema: Value) -> Self {
        Self::ExtractData {
            url: url.into(),
            data_schema,
            max_items: None,
        }
    }

    /// Creates a research task with default depth and source count.
    pub fn research(topic: impl Into<String>) -> Self {
        Self::Research {
            topic: topic.into(),
            depth: ResearchDepth::default(),
            max_sources: 5,
        }
    }

    /// Short mode name used for logs.
    pub fn mode(&self) -> &'static str {
        match self {
            Self::Basic { .. } => "basic",
            Self::ExtractData { .. } => "extract-data",
            Self::Research { .. } => "research-topic",
            Self::CompareProducts { .. } => "compare-products",
            Self::ComparePages { .. } => "compare-pages",
        }
    }

    /// Endpoint path for this mode.
    pub fn endpoint_path(&self) -> &'static str {
        match self {
            Self::Basic { .. } => "/stream/basic-task",
            Self::ExtractData { .. } => "/stream/extract-data",
            Self::Research { .. } => "/stream/research-topic",
            Self::CompareProducts { .. } => "/stream/compare-products",
            Self::ComparePages { .. } => "/stream/compare-pages",
        }
    }

    /// Per-mode default for the step ceiling.
    pub fn default_max_steps(&self) -> u32 {
        match self {
            Self::Basic { .. } | Self::ComparePages { .. } => 30,
            Self::ExtractData { .. } => 40,
            Self::Research { .. } => 50,
            Self::CompareProducts { .. } => 60,
        }
    }

    fn validate(&self) -> Result<(), TaskError> {
        match self {
            Self::Basic { task } => {
                if task.trim().is_empty() {
                    return Err(TaskError::validation("task instruction must not be empty"));
                }
            }
            Self::ExtractData {
                url, data_schema, ..
            } => {
                if url.trim().is_empty() {
                    return Err(TaskError::validation("extraction url must not be empty"));
                }
                if !data_schema.is_object() {
                    return Err(TaskError::validation("data_schema must be a JSON object"));
                }
            }
            Self::Research {
                topic, max_sources, ..
            } => {
                if topic.trim().is_empty() {
                    return Err(TaskError::validation("research topic must not be empty"));
                }
                if *max_sources == 0 {
                    return Err(TaskError::validation("max_sources must be greater than 0"));
                }
            }
            Self::CompareProducts { products, aspects } => {
                if products.is_empty() {
                    return Err(TaskError::validation("at least one product is required"));
                }
                if aspects.is_empty() {
                    return Err(TaskError::validation(
                        "at least one comparison aspect is required",
                    ));
                }
            }
            Self::ComparePages {
                urls,
                comparison_criteria,
            } => {
                if urls.is_empty() {
                    return Err(TaskError::validation("at least one url is required"));
                }
                if comparison_criteria.trim().is_empty() {
                    return Err(TaskError::validation(
                        "comparison criteria must not be empty",
                    ));
                }
            }
        }
        Ok(())
    }

    fn body_fields(&self) -> Value {
        match self {
            Self::Basic { task } => serde_json::json!({ "task": task }),
            Self::ExtractData {
                url,
                data_schema,
                max_items,
            } => {
                let mut body = serde_json::json!({
                    "url": url,
                    "data_schema": data_schema,
                });
                if let Some(max_items) = max_items {
                    body["max_items"] = serde_json::json!(max_items);
                }
                body
            }
            Self::Research {
                topic,
                depth,
                max_sources,
            } => serde_json::json!({
                "topic": topic,
                "depth": depth.as_str(),
                "max_sources": max_sources,
            }),
            Self::CompareProducts { products, aspects } => serde_json::json!({
                "products": products,
                "aspects": aspects,
            }),
            Self::ComparePages {
                urls,
                comparison_criteria,
            } => serde_json::json!({
                "urls": urls,
                "comparison_criteria": comparison_criteria,
            }),
        }
    }
}

/// A task spec plus the cross-mode run limits sent with every request.
#[derive(Clone, Debug, PartialEq)]
pub struct TaskRequest {
    pub spec: TaskSpec,
    max_steps: Option<u32>,
    headless: bool,
}

impl TaskRequest {
    /// Wraps a spec with default limits (per-mode step ceiling, visible
    /// browser).
    pub fn new(spec: TaskSpec) -> Self {
        Self {
            spec,
            max_steps: None,
            headless: false,
        }
    }

    /// Shorthand for a basic automation task.
    pub fn basic(task: impl Into<String>) -> Self {
        Self::new(TaskSpec::basic(task))
    }

    /// Overrides the per-mode default step ceiling.
    pub fn max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    /// Runs the remote browser headless. Defaults to visible.
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn mode(&self) -> &'static str {
        self.spec.mode()
    }

    pub fn endpoint_path(&self) -> &'static str {
        self.spec.endpoint_path()
    }

    /// The step ceiling that will be sent with this request.
    pub fn effective_max_steps(&self) -> u32 {
        self.max_steps.unwrap_or(self.spec.default_max_steps())
    }

    pub(crate) fn validate(&self) -> Result<(), TaskError> {
        if self.max_steps == Some(0) {
            return Err(TaskError::validation("max_steps must be greater than 0"));
        }
        self.spec.validate()
    }

    pub(crate) fn request_body(&self) -> Value {
        let mut body = self.spec.body_fields();
        body["max_steps"] = serde_json::json!(self.effective_max_steps());
        body["headless"] = serde_json::json!(self.headless);
        body
    }
}
