use chrono::{DateTime, NaiveTime, Utc};

use crate::model::attendance::AttendanceStatus;

/// Decides the status a record gets at check-in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusPolicy {
    #[default]
    AlwaysPresent,
    /// Check-ins strictly after this UTC time of day are `Late`.
    LateAfter(NaiveTime),
}

impl StatusPolicy {
    pub fn from_cutoff(cutoff: Option<NaiveTime>) -> Self {
        cutoff.map_or(StatusPolicy::AlwaysPresent, StatusPolicy::LateAfter)
    }

    pub fn assign(&self, checkin: DateTime<Utc>) -> AttendanceStatus {
        match self {
            StatusPolicy::AlwaysPresent => AttendanceStatus::Present,
            StatusPolicy::LateAfter(cutoff) if checkin.time() > *cutoff => AttendanceStatus::Late,
            StatusPolicy::LateAfter(_) => AttendanceStatus::Present,
        }
    }
}
