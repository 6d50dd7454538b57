//! Score scaling between the rubric's natural scale and a task's configured
//! maximum.

/// Round to the nearest integer, ties away from zero.
///
/// This is the documented convention for user-visible scores (0.5 becomes 1,
/// 1.5 becomes 2), which is exactly what [`f64::round`] implements. Spelled
/// out here so the convention is pinned rather than implicit.
pub fn round_half_away_from_zero(x: f64) -> i64 {
    x.round() as i64
}

/// Rescale an oracle total from the rubric's natural scale to the task's
/// configured maximum.
///
/// `original_max_score` comes from [`store::Task::original_max_score`] and is
/// always positive (it falls back to 100 for degenerate rubrics).
pub fn scale_score(raw_total: f64, original_max_score: f64, configured_max_score: f64) -> i64 {
    round_half_away_from_zero(raw_total / original_max_score * configured_max_score)
}
