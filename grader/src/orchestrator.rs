use crate::error::{GradeError, OracleError, StudentGradeError};
use crate::oracle::{GradingOracle, OracleResponse};
use crate::score::{round_half_away_from_zero, scale_score};
use futures::future::join_all;
use ledger::{LedgerError, SubmissionFields, SubmissionLedger};
use notifier::{AlertNotifier, GradeAlert, PlagiarismAlert};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use store::{RecordStore, RubricCriterion, Submission, Task};
use tokio::time::timeout;

/// Where grade alerts for a student should go.
#[derive(Debug, Clone)]
pub struct AlertRecipient {
    pub email: String,
    pub student_name: String,
}

/// Outcome of one batch grading run.
///
/// `succeeded + failed == students selected`; per-student errors are keyed by
/// student id so the caller can itemize them. Alert delivery failures are
/// counted separately and never affect the grading outcome.
#[derive(Debug, Default)]
pub struct GradingReport {
    pub succeeded: usize,
    pub failed: usize,
    pub per_student_errors: HashMap<i64, StudentGradeError>,
    pub alerts_failed: usize,
}

/// Drives batch grading of one task through the oracle and the ledger.
///
/// Oracle calls for the selected students run concurrently; the ledger
/// serializes the resulting writes per task. One student's failure never
/// blocks or rolls back another's.
pub struct GradingOrchestrator<S> {
    ledger: Arc<SubmissionLedger<S>>,
    oracle: Arc<dyn GradingOracle>,
    oracle_timeout: Duration,
    notifier: Option<Arc<dyn AlertNotifier>>,
    alert_recipients: HashMap<i64, AlertRecipient>,
}

impl<S: RecordStore> GradingOrchestrator<S> {
    pub fn new(ledger: Arc<SubmissionLedger<S>>, oracle: Arc<dyn GradingOracle>) -> Self {
        Self {
            ledger,
            oracle,
            oracle_timeout: Duration::from_secs(30),
            notifier: None,
            alert_recipients: HashMap::new(),
        }
    }

    /// Caller-supplied ceiling for each oracle call. A timed-out call counts
    /// as a per-student transient failure, not a fatal batch error.
    pub fn with_oracle_timeout(mut self, oracle_timeout: Duration) -> Self {
        self.oracle_timeout = oracle_timeout;
        self
    }

    /// Attach an alert notifier and the roster of recipients. Students without
    /// a recipient entry are graded normally and produce no alert.
    pub fn with_alerts(
        mut self,
        notifier: Arc<dyn AlertNotifier>,
        alert_recipients: HashMap<i64, AlertRecipient>,
    ) -> Self {
        self.notifier = Some(notifier);
        self.alert_recipients = alert_recipients;
        self
    }

    /// Grade a batch of selected students on one task.
    ///
    /// Structural preconditions (`NoRubric`, `NoStudentsSelected`) fail the
    /// whole batch before any oracle call is made. Everything after that is
    /// per-student: oracle failures, malformed responses and ledger rejections
    /// land in the report, and successfully graded students are committed
    /// regardless of their peers.
    pub async fn grade_students(
        &self,
        task_id: i64,
        student_ids: &[i64],
        configured_max_score: f64,
    ) -> Result<GradingReport, GradeError> {
        let task = match self.ledger.task(task_id).await {
            Ok(task) => task,
            Err(LedgerError::UnknownTask(id)) => return Err(GradeError::UnknownTask(id)),
            Err(e) => {
                tracing::error!(task_id, error = %e, "failed to load task for grading");
                return Err(GradeError::UnknownTask(task_id));
            }
        };

        if task.rubric.is_empty() {
            return Err(GradeError::NoRubric);
        }
        if student_ids.is_empty() {
            return Err(GradeError::NoStudentsSelected);
        }

        let original_max_score = task.original_max_score();

        let task_ref = &task;
        let outcomes = join_all(student_ids.iter().map(|&student_id| async move {
            let outcome = self
                .grade_one(task_ref, student_id, original_max_score, configured_max_score)
                .await;
            (student_id, outcome)
        }))
        .await;

        let mut report = GradingReport::default();
        for (student_id, outcome) in outcomes {
            match outcome {
                Ok(submission) => {
                    report.succeeded += 1;
                    if !self
                        .notify_graded(&task, &submission, configured_max_score)
                        .await
                    {
                        report.alerts_failed += 1;
                    }
                }
                Err(error) => {
                    tracing::warn!(task_id, student_id, error = %error, "grading failed for student");
                    report.failed += 1;
                    report.per_student_errors.insert(student_id, error);
                }
            }
        }

        tracing::info!(
            task_id,
            succeeded = report.succeeded,
            failed = report.failed,
            "batch grading finished"
        );
        Ok(report)
    }

    /// Record a student's submitted work through the ledger.
    ///
    /// When the stored content matches another student's submission the ledger
    /// flags the task, and a plagiarism alert goes out to the submitting
    /// student's recipient on file. Alert delivery is best-effort; the
    /// submission is already committed either way.
    pub async fn record_submission(
        &self,
        task_id: i64,
        student_id: i64,
        content: impl Into<String>,
    ) -> Result<Submission, LedgerError> {
        let submission = self
            .ledger
            .upsert_submission(task_id, student_id, SubmissionFields::with_content(content))
            .await?;

        if let Some(hash) = &submission.content_hash {
            if self.ledger.detect_plagiarism(task_id, student_id, hash).await? {
                let task = self.ledger.task(task_id).await?;
                self.notify_plagiarized(&task, student_id).await;
            }
        }

        Ok(submission)
    }

    async fn grade_one(
        &self,
        task: &Task,
        student_id: i64,
        original_max_score: f64,
        configured_max_score: f64,
    ) -> Result<Submission, StudentGradeError> {
        let prior = self.ledger.submission(task.id, student_id).await?;
        let content = prior.and_then(|s| s.content);

        let response = self
            .call_oracle(&task.rubric, content.as_deref().unwrap_or_default())
            .await?;

        self.sanity_check_scores(task, student_id, &response);

        let scaled_score = scale_score(
            response.total_score,
            original_max_score,
            configured_max_score,
        );

        let fields = SubmissionFields {
            content,
            raw_score: Some(response.total_score),
            scaled_score: Some(scaled_score),
            per_criterion_scores: response.score_details,
            feedback: Some(response.feedback),
            submitted_at: None,
        };

        Ok(self
            .ledger
            .upsert_submission(task.id, student_id, fields)
            .await?)
    }

    /// One bounded retry for transient oracle failures. Malformed responses
    /// are deterministic and returned as-is.
    async fn call_oracle(
        &self,
        rubric: &[RubricCriterion],
        content: &str,
    ) -> Result<OracleResponse, OracleError> {
        match self.call_oracle_once(rubric, content).await {
            Err(error) if error.is_transient() => {
                tracing::warn!(error = %error, "transient oracle failure, retrying once");
                self.call_oracle_once(rubric, content).await
            }
            other => other,
        }
    }

    async fn call_oracle_once(
        &self,
        rubric: &[RubricCriterion],
        content: &str,
    ) -> Result<OracleResponse, OracleError> {
        timeout(self.oracle_timeout, self.oracle.grade(rubric, content))
            .await
            .map_err(|_| OracleError::Timeout(self.oracle_timeout))?
    }

    /// The orchestrator trusts the oracle's per-criterion scores but flags the
    /// ones exceeding a criterion's maximum.
    fn sanity_check_scores(&self, task: &Task, student_id: i64, response: &OracleResponse) {
        for criterion in &task.rubric {
            if let Some(&score) = response.score_details.get(&criterion.id) {
                if score > criterion.max_points {
                    tracing::warn!(
                        task_id = task.id,
                        student_id,
                        criterion = %criterion.id,
                        score,
                        max_points = criterion.max_points,
                        "oracle score exceeds criterion maximum"
                    );
                }
            }
        }
    }

    /// Best-effort grade alert; returns false when a send was attempted and
    /// failed. Never affects ledger state.
    async fn notify_graded(
        &self,
        task: &Task,
        submission: &Submission,
        configured_max_score: f64,
    ) -> bool {
        let (Some(notifier), Some(recipient)) = (
            self.notifier.as_ref(),
            self.alert_recipients.get(&submission.student_id),
        ) else {
            return true;
        };

        let alert = GradeAlert {
            recipient_email: recipient.email.clone(),
            student_name: recipient.student_name.clone(),
            task_title: task.title.clone(),
            scaled_score: submission.scaled_score.unwrap_or_default(),
            max_score: round_half_away_from_zero(configured_max_score),
        };

        match notifier.send_grade_alert(&alert).await {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(
                    student_id = submission.student_id,
                    error = %error,
                    "grade alert delivery failed"
                );
                false
            }
        }
    }

    /// Best-effort plagiarism alert for the submitting student's recipient.
    async fn notify_plagiarized(&self, task: &Task, student_id: i64) {
        let (Some(notifier), Some(recipient)) =
            (self.notifier.as_ref(), self.alert_recipients.get(&student_id))
        else {
            return;
        };

        let alert = PlagiarismAlert {
            recipient_email: recipient.email.clone(),
            student_name: recipient.student_name.clone(),
            task_title: task.title.clone(),
        };

        if let Err(error) = notifier.send_plagiarism_alert(&alert).await {
            tracing::warn!(
                task_id = task.id,
                student_id,
                error = %error,
                "plagiarism alert delivery failed"
            );
        }
    }
}
