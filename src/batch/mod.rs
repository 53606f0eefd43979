//! Ordered execution of heterogeneous tool steps
//!
//! A [`BatchExecutionRequest`] lists steps that run strictly one after the
//! other against the same page. Each step's failure policy is decided by its
//! own `continueOnError` flag and the batch-wide `stopOnFirstError` flag; the
//! outcome of every attempted step lands in a [`BatchReport`].

pub mod executor;
pub mod report;

pub use executor::BatchExecutor;
pub use report::{BatchReport, BatchStepResult, StepOutcome};

use crate::expectation::ExpectationConfig;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One tool call inside a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchStep {
    /// Tool name, e.g. `navigate` or `click`
    pub tool: String,

    /// The tool's arguments
    #[serde(default)]
    pub arguments: Map<String, Value>,

    /// Expectation for this step only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expectation: Option<ExpectationConfig>,

    /// Keep going when this step fails (default: false)
    #[serde(default)]
    pub continue_on_error: bool,
}

impl BatchStep {
    pub fn new(tool: impl Into<String>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            tool: tool.into(),
            arguments,
            expectation: None,
            continue_on_error: false,
        }
    }

    pub fn continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    pub fn with_expectation(mut self, expectation: ExpectationConfig) -> Self {
        self.expectation = Some(expectation);
        self
    }
}

/// Steps to run plus batch-wide options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchExecutionRequest {
    /// Steps, executed in order
    pub steps: Vec<BatchStep>,

    /// Stop at the first failing step that does not set `continueOnError` (default: false)
    #[serde(default)]
    pub stop_on_first_error: bool,

    /// Expectation applied to every step below the step's own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_expectation: Option<ExpectationConfig>,
}

impl BatchExecutionRequest {
    pub fn new(steps: Vec<BatchStep>) -> Self {
        Self {
            steps,
            stop_on_first_error: false,
            global_expectation: None,
        }
    }

    pub fn stop_on_first_error(mut self, stop: bool) -> Self {
        self.stop_on_first_error = stop;
        self
    }

    pub fn with_global_expectation(mut self, expectation: ExpectationConfig) -> Self {
        self.global_expectation = Some(expectation);
        self
    }
}

/// Lifecycle of a batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BatchState {
    Pending,
    Running,
    Completed,
    StoppedOnError,
}

impl BatchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchState::Completed | BatchState::StoppedOnError)
    }
}
