//! Request lifecycle types.
//!
//! A request moves through the stages of [`RequestStage`] and ends in one
//! terminal stage. [`RunOutcome`] covers the validate-and-execute half of
//! the cycle; [`RequestOutcome`] covers the whole cycle, starting from a
//! natural-language request.

use std::fmt;

use serde::Serialize;

use crate::{
    executor::ExecutionResult,
    query::{GeneratedQuery, ValidatedQuery},
    validator::ValidationResult
};

/// Why a request ended in [`RequestStage::Failed`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The engine rejected the statement
    Execution,
    /// The model produced no usable completion
    Generation,
    /// The database could not be opened or introspected
    Connection
}

/// Stages of one request cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStage {
    Idle,
    SchemaLoaded,
    PromptSent,
    ResponseSanitized,
    Validated,
    Executed,
    Rejected,
    Failed(FailureKind)
}

impl RequestStage {
    /// Whether the cycle ends in this stage
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Executed | Self::Rejected | Self::Failed(_))
    }
}

impl fmt::Display for RequestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "IDLE",
            Self::SchemaLoaded => "SCHEMA_LOADED",
            Self::PromptSent => "PROMPT_SENT",
            Self::ResponseSanitized => "RESPONSE_SANITIZED",
            Self::Validated => "VALIDATED",
            Self::Executed => "EXECUTED",
            Self::Rejected => "REJECTED",
            Self::Failed(FailureKind::Execution) => "FAILED(execution error)",
            Self::Failed(FailureKind::Generation) => "FAILED(generation error)",
            Self::Failed(FailureKind::Connection) => "FAILED(connection error)"
        };
        f.write_str(name)
    }
}

/// Result of validating and executing one SQL text
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Statement passed validation and was handed to the engine
    Executed {
        query:  ValidatedQuery,
        result: ExecutionResult
    },
    /// Statement failed the syntax check and was not executed
    Rejected {
        sql:        String,
        validation: ValidationResult
    }
}

impl RunOutcome {
    pub fn stage(&self) -> RequestStage {
        match self {
            Self::Executed {
                result, ..
            } if result.is_success() => RequestStage::Executed,
            Self::Executed {
                ..
            } => RequestStage::Failed(FailureKind::Execution),
            Self::Rejected {
                ..
            } => RequestStage::Rejected
        }
    }

    pub fn is_success(&self) -> bool {
        self.stage() == RequestStage::Executed
    }

    pub fn result(&self) -> Option<&ExecutionResult> {
        match self {
            Self::Executed {
                result, ..
            } => Some(result),
            Self::Rejected {
                ..
            } => None
        }
    }
}

/// Terminal result of a full request cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RequestOutcome {
    /// SQL was generated; `outcome` tells whether it ran
    Completed {
        generated: GeneratedQuery,
        outcome:   RunOutcome
    },
    /// The model could not produce SQL
    GenerationFailed { message: String },
    /// The database could not be read
    ConnectionFailed { message: String }
}

impl RequestOutcome {
    pub fn stage(&self) -> RequestStage {
        match self {
            Self::Completed {
                outcome, ..
            } => outcome.stage(),
            Self::GenerationFailed {
                ..
            } => RequestStage::Failed(FailureKind::Generation),
            Self::ConnectionFailed {
                ..
            } => RequestStage::Failed(FailureKind::Connection)
        }
    }

    pub fn is_success(&self) -> bool {
        self.stage() == RequestStage::Executed
    }

    pub fn generated(&self) -> Option<&GeneratedQuery> {
        match self {
            Self::Completed {
                generated, ..
            } => Some(generated),
            _ => None
        }
    }
}

/// Rendered result of one CLI command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout:    String
}

impl CommandOutput {
    pub fn success(stdout: String) -> Self {
        Self {
            exit_code: 0,
            stdout
        }
    }
}
