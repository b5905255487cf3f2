//! Pure state transitions over the meeting aggregate.
//!
//! Everything here takes the aggregate, the current time, and the policy
//! windows as inputs and mutates (or inspects) the embedded session list.
//! The service layer wraps these in load/save; keeping the rules free of
//! I/O is what makes the timing behavior testable.

use bson::{DateTime, oid::ObjectId};
use rollcall_db::models::{AttendanceSession, Meeting};
use std::collections::HashMap;

use super::AttendancePolicy;

/// Rounded to the nearest whole minute, matching what gets persisted in
/// `duration_minutes`.
pub fn round_minutes(secs: i64) -> u32 {
    ((secs.max(0) + 30) / 60) as u32
}

/// Active sessions always count; ended sessions only once they clear the
/// noise floor.
pub fn is_meaningful(session: &AttendanceSession, policy: &AttendancePolicy) -> bool {
    match session.leave_time {
        None => true,
        Some(_) => ended_secs(session).unwrap_or(0) >= policy.min_meaningful_secs,
    }
}

fn ended_secs(session: &AttendanceSession) -> Option<i64> {
    session
        .leave_time
        .map(|leave| (leave.timestamp_millis() - session.join_time.timestamp_millis()) / 1000)
}

fn within_resume_window(
    session: &AttendanceSession,
    now: DateTime,
    policy: &AttendancePolicy,
) -> bool {
    match session.leave_time {
        Some(leave) => {
            (now.timestamp_millis() - leave.timestamp_millis()) / 1000
                <= policy.resume_window_secs
        }
        None => false,
    }
}

/// The ended session a rejoining user would get back: valid, meaningful,
/// left within the resume window, most recent departure first.
pub fn find_resumable<'a>(
    meeting: &'a Meeting,
    user_id: ObjectId,
    now: DateTime,
    policy: &AttendancePolicy,
) -> Option<&'a AttendanceSession> {
    meeting
        .attendance_sessions
        .iter()
        .filter(|s| s.user_id == user_id && !s.is_active() && s.is_valid())
        .filter(|s| is_meaningful(s, policy) && within_resume_window(s, now, policy))
        .max_by_key(|s| s.leave_time)
}

#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub session_id: ObjectId,
    pub join_time: DateTime,
    pub user_name: String,
    pub resumed: bool,
    /// Minutes the session had accumulated before it was resumed.
    pub previous_duration_minutes: Option<u32>,
}

/// Join: idempotent participant add, then either reactivate a recently
/// ended session (original `join_time` kept, so the eventual duration
/// reflects cumulative presence) or append a fresh one.
pub fn apply_join(
    meeting: &mut Meeting,
    user_id: ObjectId,
    user_name: &str,
    now: DateTime,
    policy: &AttendancePolicy,
) -> JoinOutcome {
    meeting.add_participant(user_id);

    let resumable = find_resumable(meeting, user_id, now, policy).map(|s| s.id);
    if let Some(session_id) = resumable {
        if let Some(session) = meeting.session_mut(session_id) {
            let previous = session
                .duration_minutes
                .or_else(|| ended_secs(session).map(round_minutes));
            session.leave_time = None;
            session.duration_minutes = None;
            return JoinOutcome {
                session_id: session.id,
                join_time: session.join_time,
                user_name: session.user_name.clone(),
                resumed: true,
                previous_duration_minutes: previous,
            };
        }
    }

    let session = AttendanceSession::new(user_id, user_name.to_string(), now);
    let outcome = JoinOutcome {
        session_id: session.id,
        join_time: session.join_time,
        user_name: session.user_name.clone(),
        resumed: false,
        previous_duration_minutes: None,
    };
    meeting.attendance_sessions.push(session);
    outcome
}

#[derive(Debug, Clone)]
pub struct LeaveOutcome {
    pub session_id: ObjectId,
    pub leave_time: DateTime,
    pub duration_minutes: u32,
    pub duration_secs: i64,
    /// Duplicate leave signal: the stored values were returned untouched.
    pub already_left: bool,
}

/// Leave is idempotent: a second signal for an ended session reports the
/// recorded departure without mutating anything.
pub fn apply_leave(
    meeting: &mut Meeting,
    session_id: ObjectId,
    now: DateTime,
) -> Option<LeaveOutcome> {
    let session = meeting.session_mut(session_id)?;

    if let Some(leave) = session.leave_time {
        let secs = ended_secs(session).unwrap_or(0);
        return Some(LeaveOutcome {
            session_id: session.id,
            leave_time: leave,
            duration_minutes: session.duration_minutes.unwrap_or_else(|| round_minutes(secs)),
            duration_secs: secs,
            already_left: true,
        });
    }

    session.leave_time = Some(now);
    let secs = session.elapsed_secs(now);
    let minutes = round_minutes(secs);
    session.duration_minutes = Some(minutes);

    Some(LeaveOutcome {
        session_id: session.id,
        leave_time: now,
        duration_minutes: minutes,
        duration_secs: secs,
        already_left: false,
    })
}

/// Live duration of an active session, or `None` when the session is
/// missing or already ended (reported as a soft failure upstream, never
/// an error).
pub fn live_duration_secs(meeting: &Meeting, session_id: ObjectId, now: DateTime) -> Option<i64> {
    meeting
        .session(session_id)
        .filter(|s| s.is_active())
        .map(|s| s.elapsed_secs(now))
}

#[derive(Debug, Clone)]
pub struct ResumableSession {
    pub session_id: ObjectId,
    pub last_left: DateTime,
    pub previous_duration_minutes: u32,
}

/// Read-only twin of the join-time resumption search, so clients can
/// prompt the user before committing.
pub fn check_resumable(
    meeting: &Meeting,
    user_id: ObjectId,
    now: DateTime,
    policy: &AttendancePolicy,
) -> Option<ResumableSession> {
    find_resumable(meeting, user_id, now, policy).map(|s| ResumableSession {
        session_id: s.id,
        last_left: s.leave_time.unwrap_or(s.join_time),
        previous_duration_minutes: s
            .duration_minutes
            .or_else(|| ended_secs(s).map(round_minutes))
            .unwrap_or(0),
    })
}

#[derive(Debug, Clone)]
pub struct ResumeOutcome {
    pub session_id: ObjectId,
    pub join_time: DateTime,
    pub user_name: String,
    pub already_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeError {
    NotFound,
    WindowExpired,
}

/// Explicit resume of a known session. Resuming an already-active session
/// is a no-op; resuming past the window fails and the session stays ended.
pub fn apply_resume(
    meeting: &mut Meeting,
    session_id: ObjectId,
    now: DateTime,
    policy: &AttendancePolicy,
) -> Result<ResumeOutcome, ResumeError> {
    let session = meeting.session_mut(session_id).ok_or(ResumeError::NotFound)?;

    if session.is_active() {
        return Ok(ResumeOutcome {
            session_id: session.id,
            join_time: session.join_time,
            user_name: session.user_name.clone(),
            already_active: true,
        });
    }

    if !within_resume_window(session, now, policy) {
        return Err(ResumeError::WindowExpired);
    }

    session.leave_time = None;
    session.duration_minutes = None;

    Ok(ResumeOutcome {
        session_id: session.id,
        join_time: session.join_time,
        user_name: session.user_name.clone(),
        already_active: false,
    })
}

pub fn active_sessions(meeting: &Meeting) -> Vec<&AttendanceSession> {
    meeting
        .attendance_sessions
        .iter()
        .filter(|s| s.is_active() && s.is_valid())
        .collect()
}

pub fn history<'a>(meeting: &'a Meeting, policy: &AttendancePolicy) -> Vec<&'a AttendanceSession> {
    let mut sessions: Vec<&AttendanceSession> = meeting
        .attendance_sessions
        .iter()
        .filter(|s| s.is_valid() && is_meaningful(s, policy))
        .collect();
    sessions.sort_by_key(|s| s.join_time);
    sessions
}

/// Close every active session; called when the meeting ends so nothing is
/// left "present forever". Returns how many were closed.
pub fn end_all_active(meeting: &mut Meeting, now: DateTime) -> usize {
    let mut ended = 0;
    for session in meeting
        .attendance_sessions
        .iter_mut()
        .filter(|s| s.is_active())
    {
        session.leave_time = Some(now);
        session.duration_minutes = Some(round_minutes(session.elapsed_secs(now)));
        ended += 1;
    }
    ended
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub recomputed: usize,
    pub dropped_invalid: usize,
    pub dropped_noise: usize,
    pub merged_duplicates: usize,
}

/// The reconciliation pass: re-derive durations, drop broken and
/// too-short ended records, and merge overlapping ended sessions per
/// user, keeping the longest. Active sessions are never dropped or
/// merged here, whatever their age.
pub fn cleanup_and_dedupe(meeting: &mut Meeting, policy: &AttendancePolicy) -> CleanupReport {
    let mut report = CleanupReport::default();

    // 1. Defensive duration re-derivation for every ended session.
    for session in &mut meeting.attendance_sessions {
        if session.leave_time.is_some() {
            let minutes = ended_secs(session).map(round_minutes);
            if session.duration_minutes != minutes {
                report.recomputed += 1;
            }
            session.duration_minutes = minutes;
        }
    }

    // 2. Drop invalid records (leave before join).
    let before = meeting.attendance_sessions.len();
    meeting.attendance_sessions.retain(|s| s.is_valid());
    report.dropped_invalid = before - meeting.attendance_sessions.len();

    // 3. Drop ended sessions below the noise floor.
    let before = meeting.attendance_sessions.len();
    meeting
        .attendance_sessions
        .retain(|s| is_meaningful(s, policy));
    report.dropped_noise = before - meeting.attendance_sessions.len();

    // 4. Per user, merge overlapping ended sessions: longest wins.
    let mut by_user: HashMap<ObjectId, Vec<&AttendanceSession>> = HashMap::new();
    for session in meeting
        .attendance_sessions
        .iter()
        .filter(|s| !s.is_active())
    {
        by_user.entry(session.user_id).or_default().push(session);
    }

    let mut drop_ids: Vec<ObjectId> = Vec::new();
    for (_, mut group) in by_user {
        group.sort_by(|a, b| {
            ended_secs(b)
                .cmp(&ended_secs(a))
                .then_with(|| a.join_time.cmp(&b.join_time))
        });

        let mut kept: Vec<&AttendanceSession> = Vec::new();
        for session in group {
            if kept.iter().any(|k| overlaps(k, session)) {
                drop_ids.push(session.id);
            } else {
                kept.push(session);
            }
        }
    }

    report.merged_duplicates = drop_ids.len();
    meeting
        .attendance_sessions
        .retain(|s| !drop_ids.contains(&s.id));

    report
}

fn overlaps(a: &AttendanceSession, b: &AttendanceSession) -> bool {
    match (a.leave_time, b.leave_time) {
        (Some(a_leave), Some(b_leave)) => a.join_time <= b_leave && b.join_time <= a_leave,
        _ => false,
    }
}
