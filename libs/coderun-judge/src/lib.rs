pub mod engine;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod judge;

#[cfg(test)]
mod test_support;

pub use engine::{ExecutionEngine, LocalGoEngine};
pub use error::{ExecError, JudgeError, Result};
pub use evaluator::{grade, outputs_match};
pub use executor::{normalize, Backend, ExecutionLimits, Executor, FALLBACK_LANGUAGE};
pub use judge::{HttpJudgeClient, JobHandle, JudgeClient, JudgeStatus, RawJudgeResult, SubmissionSpec};
