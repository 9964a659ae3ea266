pub mod types;
pub mod redis;
pub mod config;

// Re-export commonly used types for convenience
pub use types::{
    AggregateResult, ExecuteResponse, Execution, ExecutionRequest, ExecutionResult, Job,
    JobRecord, JobStatus, Language, TestCase, TestResult,
};
pub use config::Config;
