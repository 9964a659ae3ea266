use coderun_common::types::Language;
use std::time::Duration;
use thiserror::Error;

/// Failures talking to the judge
#[derive(Error, Debug)]
pub enum JudgeError {
    #[error("judge request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("judge API error: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("failed to decode judge response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("timeout waiting for result after {0:?}")]
    Timeout(Duration),

    #[error("execution cancelled")]
    Cancelled,
}

/// Failures of a single execution, as seen by callers of the orchestrator
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("judge not available and language {0} cannot run locally; configure a judge")]
    JudgeUnavailable(Language),

    #[error("judge execution: {0}")]
    Judge(#[source] JudgeError),

    #[error("timeout waiting for result after {0:?}")]
    Timeout(Duration),

    #[error("execution cancelled")]
    Cancelled,

    #[error("local execution: {0}")]
    LocalExecution(#[from] std::io::Error),
}

// Timeouts and cancellations keep their own variants so callers can tell
// "judge overloaded" apart from "judge rejected".
impl From<JudgeError> for ExecError {
    fn from(err: JudgeError) -> Self {
        match err {
            JudgeError::Timeout(d) => ExecError::Timeout(d),
            JudgeError::Cancelled => ExecError::Cancelled,
            other => ExecError::Judge(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExecError>;
