pub mod lifecycle;
pub mod sessions;

pub use lifecycle::AttendanceService;
pub use sessions::{
    CleanupReport, JoinOutcome, LeaveOutcome, ResumableSession, ResumeOutcome,
};

use rollcall_config::AttendanceSettings;
use thiserror::Error;

use crate::dao::base::DaoError;

/// Named window constants driving the lifecycle heuristics. Loaded from
/// settings; defaults match the product behavior (10 min resume grace,
/// 30 s noise floor).
#[derive(Debug, Clone, Copy)]
pub struct AttendancePolicy {
    pub resume_window_secs: i64,
    pub min_meaningful_secs: i64,
}

impl Default for AttendancePolicy {
    fn default() -> Self {
        Self {
            resume_window_secs: 600,
            min_meaningful_secs: 30,
        }
    }
}

impl From<&AttendanceSettings> for AttendancePolicy {
    fn from(settings: &AttendanceSettings) -> Self {
        Self {
            resume_window_secs: settings.resume_window_secs as i64,
            min_meaningful_secs: settings.min_meaningful_secs as i64,
        }
    }
}

#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("Meeting not found")]
    MeetingNotFound,
    #[error("Session not found in this meeting")]
    SessionNotFound,
    #[error("Session is too old to resume")]
    ResumeWindowExpired,
    #[error(transparent)]
    Dao(#[from] DaoError),
}

pub type AttendanceResult<T> = Result<T, AttendanceError>;
