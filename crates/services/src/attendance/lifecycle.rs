use std::sync::Arc;

use bson::oid::ObjectId;
use dashmap::DashMap;
use rollcall_db::models::{AttendanceSession, Meeting, MeetingStatus};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

use super::sessions::{
    self, CleanupReport, JoinOutcome, LeaveOutcome, ResumableSession, ResumeError, ResumeOutcome,
};
use super::{AttendanceError, AttendancePolicy, AttendanceResult};
use crate::clock::Clock;
use crate::dao::base::DaoError;
use crate::dao::meeting::MeetingDao;

/// The session lifecycle engine.
///
/// Every mutating operation is a read-modify-write of the whole meeting
/// aggregate, so writers for the same meeting serialize through a
/// per-meeting async mutex; two users joining at once can no longer lose
/// each other's session. `cleanup` stays available as the repair pass for
/// histories written before this discipline (or by other writers).
pub struct AttendanceService {
    meetings: Arc<MeetingDao>,
    clock: Arc<dyn Clock>,
    policy: AttendancePolicy,
    locks: MeetingLocks,
}

/// Lock table keyed by meeting id. An entry lives only while some writer
/// holds or awaits its mutex; the last guard out removes it, so the map
/// does not accumulate one entry per meeting ever touched.
#[derive(Default)]
struct MeetingLocks {
    map: DashMap<ObjectId, Arc<Mutex<()>>>,
}

struct MeetingLockGuard<'a> {
    locks: &'a MeetingLocks,
    meeting_id: ObjectId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl MeetingLocks {
    async fn acquire(&self, meeting_id: ObjectId) -> MeetingLockGuard<'_> {
        let lock = self.map.entry(meeting_id).or_default().clone();
        let guard = lock.lock_owned().await;
        MeetingLockGuard {
            locks: self,
            meeting_id,
            guard: Some(guard),
        }
    }
}

impl Drop for MeetingLockGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        // Waiters hold their own Arc clone, so a count of one means the
        // map reference is the last; remove_if checks it under the shard
        // lock that acquire also takes.
        self.locks
            .map
            .remove_if(&self.meeting_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl AttendanceService {
    pub fn new(meetings: Arc<MeetingDao>, clock: Arc<dyn Clock>, policy: AttendancePolicy) -> Self {
        Self {
            meetings,
            clock,
            policy,
            locks: MeetingLocks::default(),
        }
    }

    pub fn policy(&self) -> &AttendancePolicy {
        &self.policy
    }

    async fn load(&self, meeting_id: ObjectId) -> AttendanceResult<Meeting> {
        self.meetings.load(meeting_id).await.map_err(|e| match e {
            DaoError::NotFound => AttendanceError::MeetingNotFound,
            other => AttendanceError::Dao(other),
        })
    }

    pub async fn join(
        &self,
        meeting_id: ObjectId,
        user_id: ObjectId,
        user_name: &str,
    ) -> AttendanceResult<JoinOutcome> {
        let _lock = self.locks.acquire(meeting_id).await;

        let mut meeting = self.load(meeting_id).await?;
        let now = self.clock.now();
        let outcome = sessions::apply_join(&mut meeting, user_id, user_name, now, &self.policy);
        self.meetings.save(&mut meeting).await?;

        debug!(
            meeting = %meeting_id,
            session = %outcome.session_id,
            resumed = outcome.resumed,
            "User joined"
        );
        Ok(outcome)
    }

    pub async fn leave(
        &self,
        meeting_id: ObjectId,
        session_id: ObjectId,
    ) -> AttendanceResult<LeaveOutcome> {
        let _lock = self.locks.acquire(meeting_id).await;

        let mut meeting = self.load(meeting_id).await?;
        let now = self.clock.now();
        let outcome = sessions::apply_leave(&mut meeting, session_id, now)
            .ok_or(AttendanceError::SessionNotFound)?;

        // Duplicate leave signals are answered from the stored record.
        if !outcome.already_left {
            self.meetings.save(&mut meeting).await?;
        }

        debug!(
            meeting = %meeting_id,
            session = %session_id,
            already_left = outcome.already_left,
            duration_minutes = outcome.duration_minutes,
            "User left"
        );
        Ok(outcome)
    }

    /// Read-only liveness/duration probe. A missing or ended session is a
    /// soft miss (`Ok(None)`), never an error, so polling clients are not
    /// disrupted by transient lookup failures.
    pub async fn heartbeat(
        &self,
        meeting_id: ObjectId,
        session_id: ObjectId,
    ) -> AttendanceResult<Option<i64>> {
        let meeting = match self.load(meeting_id).await {
            Ok(meeting) => meeting,
            Err(AttendanceError::MeetingNotFound) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(sessions::live_duration_secs(
            &meeting,
            session_id,
            self.clock.now(),
        ))
    }

    pub async fn check_resumable(
        &self,
        meeting_id: ObjectId,
        user_id: ObjectId,
    ) -> AttendanceResult<Option<ResumableSession>> {
        let meeting = self.load(meeting_id).await?;
        Ok(sessions::check_resumable(
            &meeting,
            user_id,
            self.clock.now(),
            &self.policy,
        ))
    }

    pub async fn resume(
        &self,
        meeting_id: ObjectId,
        session_id: ObjectId,
    ) -> AttendanceResult<ResumeOutcome> {
        let _lock = self.locks.acquire(meeting_id).await;

        let mut meeting = self.load(meeting_id).await?;
        let now = self.clock.now();
        let outcome = sessions::apply_resume(&mut meeting, session_id, now, &self.policy)
            .map_err(|e| match e {
                ResumeError::NotFound => AttendanceError::SessionNotFound,
                ResumeError::WindowExpired => AttendanceError::ResumeWindowExpired,
            })?;

        if !outcome.already_active {
            self.meetings.save(&mut meeting).await?;
        }

        debug!(
            meeting = %meeting_id,
            session = %session_id,
            already_active = outcome.already_active,
            "Session resumed"
        );
        Ok(outcome)
    }

    pub async fn active_sessions(
        &self,
        meeting_id: ObjectId,
    ) -> AttendanceResult<Vec<AttendanceSession>> {
        let meeting = self.load(meeting_id).await?;
        Ok(sessions::active_sessions(&meeting)
            .into_iter()
            .cloned()
            .collect())
    }

    pub async fn history(
        &self,
        meeting_id: ObjectId,
    ) -> AttendanceResult<Vec<AttendanceSession>> {
        let meeting = self.load(meeting_id).await?;
        Ok(sessions::history(&meeting, &self.policy)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Transition the meeting to `Ended` and close every active session,
    /// in one aggregate write.
    pub async fn end_meeting(&self, meeting_id: ObjectId) -> AttendanceResult<usize> {
        let _lock = self.locks.acquire(meeting_id).await;

        let mut meeting = self.load(meeting_id).await?;
        let ended = sessions::end_all_active(&mut meeting, self.clock.now());
        meeting.status = MeetingStatus::Ended;
        self.meetings.save(&mut meeting).await?;

        info!(meeting = %meeting_id, sessions_ended = ended, "Meeting ended");
        Ok(ended)
    }

    /// Explicit maintenance pass; see `sessions::cleanup_and_dedupe`.
    pub async fn cleanup(&self, meeting_id: ObjectId) -> AttendanceResult<CleanupReport> {
        let _lock = self.locks.acquire(meeting_id).await;

        let mut meeting = self.load(meeting_id).await?;
        let report = sessions::cleanup_and_dedupe(&mut meeting, &self.policy);
        self.meetings.save(&mut meeting).await?;

        info!(
            meeting = %meeting_id,
            recomputed = report.recomputed,
            dropped_invalid = report.dropped_invalid,
            dropped_noise = report.dropped_noise,
            merged_duplicates = report.merged_duplicates,
            "Attendance cleanup finished"
        );
        Ok(report)
    }
}
