//! Alert email delivery for tutors and parents.
//!
//! Sending is fire-and-forget from the caller's point of view: a failed send
//! is reported (and logged) but never rolls back any grading or ledger state.

pub mod smtp;

use async_trait::async_trait;
use thiserror::Error;

/// Fields of a grade alert email.
#[derive(Debug, Clone)]
pub struct GradeAlert {
    pub recipient_email: String,
    pub student_name: String,
    pub task_title: String,
    pub scaled_score: i64,
    pub max_score: i64,
}

/// Fields of a plagiarism alert email.
#[derive(Debug, Clone)]
pub struct PlagiarismAlert {
    pub recipient_email: String,
    pub student_name: String,
    pub task_title: String,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid email address: {0}")]
    Address(String),
    #[error("failed to compose message: {0}")]
    Compose(String),
    #[error("failed to send message: {0}")]
    Transport(String),
}

/// Capability interface for alert delivery, substitutable in tests.
#[async_trait]
pub trait AlertNotifier: Send + Sync {
    async fn send_grade_alert(&self, alert: &GradeAlert) -> Result<(), NotifyError>;

    async fn send_plagiarism_alert(&self, alert: &PlagiarismAlert) -> Result<(), NotifyError>;
}
