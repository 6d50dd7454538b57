//! # Grading Orchestration
//!
//! This crate drives batch AI grading for one task: it fans out one oracle
//! call per selected student, rescales each result from the rubric's natural
//! scale to the task's configured maximum, commits the outcome through the
//! submission ledger, and reports per-student successes and failures so the
//! caller can render "N of M graded" with itemized errors.
//!
//! ## Key Concepts
//! - **GradingOracle**: pluggable capability behind the per-criterion scoring
//!   call; the production implementation speaks a JSON contract over HTTP.
//! - **GradingOrchestrator**: the batch driver. Structural preconditions fail
//!   the whole batch before any oracle call; per-student failures never do.
//! - **Score scaling**: `round(raw_total / original_max * configured_max)`,
//!   rounding half away from zero.

pub mod error;
pub mod http_oracle;
pub mod oracle;
pub mod orchestrator;
pub mod score;

pub use error::{GradeError, OracleError, StudentGradeError};
pub use http_oracle::HttpGradingOracle;
pub use oracle::{GradingOracle, OracleResponse};
pub use orchestrator::{AlertRecipient, GradingOrchestrator, GradingReport};
pub use score::{round_half_away_from_zero, scale_score};
