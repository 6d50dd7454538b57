use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A student's submission for a specific task.
///
/// At most one submission exists per `(task_id, student_id)` pair; a
/// resubmission updates the existing record in place, keeping `id` and
/// `submitted_at` unless explicitly overridden.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    /// Primary key of the submission.
    pub id: i64,
    /// ID of the related task.
    pub task_id: i64,
    /// ID of the student who submitted.
    pub student_id: i64,
    /// Timestamp of the first submission for this pair.
    pub submitted_at: DateTime<Utc>,
    /// Submitted text, if any.
    pub content: Option<String>,
    /// Fingerprint of `content`; present only when content is.
    pub content_hash: Option<String>,
    /// Oracle total on the rubric's natural scale.
    pub raw_score: Option<f64>,
    /// Raw score rescaled to the task's configured max score.
    pub scaled_score: Option<i64>,
    /// Oracle score per rubric criterion id.
    pub per_criterion_scores: HashMap<String, f64>,
    /// Narrative feedback from the oracle.
    pub feedback: Option<String>,
    /// Timestamp when the submission was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Submission {
    pub fn new(id: i64, task_id: i64, student_id: i64, submitted_at: DateTime<Utc>) -> Self {
        Self {
            id,
            task_id,
            student_id,
            submitted_at,
            content: None,
            content_hash: None,
            raw_score: None,
            scaled_score: None,
            per_criterion_scores: HashMap::new(),
            feedback: None,
            updated_at: submitted_at,
        }
    }

    pub fn is_graded(&self) -> bool {
        self.raw_score.is_some()
    }
}
