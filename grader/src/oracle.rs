use crate::error::OracleError;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use store::RubricCriterion;

/// Parsed oracle reply: per-criterion scores on the rubric's natural scale,
/// a total on the same scale, and narrative feedback.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OracleResponse {
    pub score_details: HashMap<String, f64>,
    pub total_score: f64,
    pub feedback: String,
}

/// Capability interface for the external grading oracle.
///
/// Modeled as a trait so orchestration tests can substitute a double without
/// touching the batch logic.
#[async_trait]
pub trait GradingOracle: Send + Sync {
    async fn grade(
        &self,
        rubric: &[RubricCriterion],
        submission_content: &str,
    ) -> Result<OracleResponse, OracleError>;
}
