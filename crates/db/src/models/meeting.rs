use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// The meeting aggregate root. Attendance sessions live embedded in the
/// document and are loaded/saved with it as a single unit; no session
/// exists independently of its meeting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub room_id: String,
    pub title: String,
    pub course_id: Option<ObjectId>,
    pub lecturer_id: Option<ObjectId>,
    pub created_by: ObjectId,
    #[serde(default)]
    pub status: MeetingStatus,
    pub scheduled_at: Option<DateTime>,
    pub duration_minutes: Option<u32>,
    /// Every user who has ever joined. Grows monotonically; inserts are
    /// idempotent.
    #[serde(default)]
    pub participants: Vec<ObjectId>,
    #[serde(default)]
    pub attendance_sessions: Vec<AttendanceSession>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MeetingStatus {
    #[default]
    Scheduled,
    Active,
    Ended,
}

/// One continuous (or resumed) presence interval for one user.
///
/// A session is active while `leave_time` is absent. `duration_minutes`
/// is only present on ended sessions and is recomputed from the two
/// timestamps on every write, never trusted from a prior write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceSession {
    pub id: ObjectId,
    pub user_id: ObjectId,
    pub user_name: String,
    pub join_time: DateTime,
    pub leave_time: Option<DateTime>,
    pub duration_minutes: Option<u32>,
}

impl AttendanceSession {
    pub fn new(user_id: ObjectId, user_name: String, join_time: DateTime) -> Self {
        Self {
            id: ObjectId::new(),
            user_id,
            user_name,
            join_time,
            leave_time: None,
            duration_minutes: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.leave_time.is_none()
    }

    /// Invariant check: `leave_time`, when present, never precedes
    /// `join_time`. Sessions violating this are repaired away by cleanup.
    pub fn is_valid(&self) -> bool {
        match self.leave_time {
            Some(leave) => leave >= self.join_time,
            None => true,
        }
    }

    /// Seconds between `join_time` and `leave_time`, or until `now` for an
    /// active session.
    pub fn elapsed_secs(&self, now: DateTime) -> i64 {
        let end = self.leave_time.unwrap_or(now);
        (end.timestamp_millis() - self.join_time.timestamp_millis()) / 1000
    }
}

impl Meeting {
    pub const COLLECTION: &'static str = "meetings";

    pub fn session(&self, session_id: ObjectId) -> Option<&AttendanceSession> {
        self.attendance_sessions.iter().find(|s| s.id == session_id)
    }

    pub fn session_mut(&mut self, session_id: ObjectId) -> Option<&mut AttendanceSession> {
        self.attendance_sessions
            .iter_mut()
            .find(|s| s.id == session_id)
    }

    /// Idempotent participant insert.
    pub fn add_participant(&mut self, user_id: ObjectId) {
        if !self.participants.contains(&user_id) {
            self.participants.push(user_id);
        }
    }
}
