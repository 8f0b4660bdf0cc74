use chrono::{DateTime, Utc};

use crate::models::{ModuleProgress, ProgressStatus, TrackingStatus};

/// completion_percentage
///
/// Completed modules over total modules, rounded down and clamped to 0..=100.
/// A course without modules reports 0.
pub fn completion_percentage(completed: i64, total: i64) -> i32 {
    if total <= 0 {
        return 0;
    }
    (completed.clamp(0, total) * 100 / total) as i32
}

pub fn tracking_status(percentage: i32) -> TrackingStatus {
    match percentage {
        p if p >= 100 => TrackingStatus::Completed,
        p if p > 0 => TrackingStatus::InProgress,
        _ => TrackingStatus::Enrolled,
    }
}

/// The timestamps a `module_progress` row should carry after a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressTimestamps {
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// transition
///
/// `started_at` is stamped the first time a module leaves `NotStarted` and kept after
/// that; resetting to `NotStarted` clears both stamps. `completed_at` survives only while
/// the module stays completed.
pub fn transition(
    previous: Option<&ModuleProgress>,
    status: ProgressStatus,
    now: DateTime<Utc>,
) -> ProgressTimestamps {
    let previous_started = previous.and_then(|p| p.started_at);
    let previous_completed = previous
        .filter(|p| p.status == ProgressStatus::Completed)
        .and_then(|p| p.completed_at);

    match status {
        ProgressStatus::NotStarted => ProgressTimestamps {
            started_at: None,
            completed_at: None,
        },
        ProgressStatus::InProgress => ProgressTimestamps {
            started_at: previous_started.or(Some(now)),
            completed_at: None,
        },
        ProgressStatus::Completed => ProgressTimestamps {
            started_at: previous_started.or(Some(now)),
            completed_at: previous_completed.or(Some(now)),
        },
    }
}

/// tracking_completed_at
///
/// Keeps the first completion time while a course stays complete.
pub fn tracking_completed_at(
    status: TrackingStatus,
    previous: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match status {
        TrackingStatus::Completed => previous.or(Some(now)),
        _ => None,
    }
}
