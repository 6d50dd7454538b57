use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Represents the status of a task throughout its lifecycle.
///
/// Status is owned by the submission ledger: apart from creation and
/// administrative edits it only changes as a side effect of submission
/// creation/update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// No submissions yet.
    Pending,
    /// Manually marked as being worked on.
    InProgress,
    /// At least one non-plagiarized submission stored.
    Submitted,
    /// Grades committed by an explicit administrative action.
    Graded,
    /// Duplicate content detected across different students.
    Plagiarized,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status_str = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Submitted => "submitted",
            TaskStatus::Graded => "graded",
            TaskStatus::Plagiarized => "plagiarized",
        };
        write!(f, "{}", status_str)
    }
}

/// A single rubric criterion with its point allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricCriterion {
    /// Stable identifier used to key per-criterion scores.
    pub id: String,
    /// What the criterion assesses, shown to the grading oracle.
    pub description: String,
    /// Maximum points for this criterion.
    pub max_points: f64,
}

/// A gradeable task assigned to a set of students.
///
/// The rubric defines the task's natural scale: the sum of criterion
/// `max_points` is the `original_max_score` oracle totals are reported
/// against, falling back to 100 for an empty or zero-valued rubric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Primary key of the task.
    pub id: i64,
    /// Title shown to students and staff.
    pub title: String,
    /// Ordered rubric criteria.
    pub rubric: Vec<RubricCriterion>,
    /// Students allowed to submit to this task.
    pub assigned_student_ids: HashSet<i64>,
    /// Current lifecycle status, derived from submissions.
    pub status: TaskStatus,
    /// Whether new submissions are accepted after the due date.
    pub allow_late_submissions: bool,
    /// Optional deadline.
    pub due_date: Option<DateTime<Utc>>,
    /// Timestamp when the task was created.
    pub created_at: DateTime<Utc>,
    /// Timestamp when the task was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// The rubric's natural scale: sum of criterion max points, or 100 when
    /// the rubric is empty or sums to zero.
    pub fn original_max_score(&self) -> f64 {
        let sum: f64 = self.rubric.iter().map(|c| c.max_points).sum();
        if sum > 0.0 { sum } else { 100.0 }
    }

    pub fn is_assigned(&self, student_id: i64) -> bool {
        self.assigned_student_ids.contains(&student_id)
    }

    /// True when the deadline has passed and late submissions are disallowed.
    pub fn rejects_submissions_at(&self, now: DateTime<Utc>) -> bool {
        match self.due_date {
            Some(due) => !self.allow_late_submissions && now > due,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn task_with_rubric(rubric: Vec<RubricCriterion>) -> Task {
        let now = Utc::now();
        Task {
            id: 1,
            title: "Essay".to_string(),
            rubric,
            assigned_student_ids: HashSet::from([10]),
            status: TaskStatus::default(),
            allow_late_submissions: true,
            due_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn criterion(id: &str, max_points: f64) -> RubricCriterion {
        RubricCriterion {
            id: id.to_string(),
            description: format!("criterion {id}"),
            max_points,
        }
    }

    #[test]
    fn original_max_score_sums_rubric() {
        let task = task_with_rubric(vec![criterion("a", 60.0), criterion("b", 40.0)]);
        assert_eq!(task.original_max_score(), 100.0);
    }

    #[test]
    fn original_max_score_falls_back_to_100() {
        assert_eq!(task_with_rubric(vec![]).original_max_score(), 100.0);
        assert_eq!(
            task_with_rubric(vec![criterion("a", 0.0)]).original_max_score(),
            100.0
        );
    }

    #[test]
    fn late_rejection_requires_due_date_and_flag() {
        let now = Utc::now();
        let mut task = task_with_rubric(vec![]);
        assert!(!task.rejects_submissions_at(now));

        task.due_date = Some(now - Duration::hours(1));
        assert!(!task.rejects_submissions_at(now));

        task.allow_late_submissions = false;
        assert!(task.rejects_submissions_at(now));
        assert!(!task.rejects_submissions_at(now - Duration::hours(2)));
    }

    #[test]
    fn status_display_matches_wire_values() {
        assert_eq!(TaskStatus::Pending.to_string(), "pending");
        assert_eq!(TaskStatus::Plagiarized.to_string(), "plagiarized");
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
    }
}
