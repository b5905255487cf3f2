use axum::{
    Json,
    extract::{Path, State},
};
use bson::DateTime;
use rollcall_db::models::AttendanceSession;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::routes::meeting::parse_object_id;
use crate::state::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct JoinRequest {
    /// Display name to record on the session; defaults to the caller's.
    pub user_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LeaveRequest {
    pub session_id: String,
    /// Client-reported cause ("navigation", "tab_closed", ...); echoed
    /// back, not stored.
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HeartbeatRequest {
    pub session_id: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct CheckRecentSessionRequest {
    /// Defaults to the authenticated caller.
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResumeSessionRequest {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub join_time: String,
    pub leave_time: Option<String>,
    pub duration_minutes: Option<u32>,
    pub duration_seconds: i64,
    pub is_active: bool,
}

impl SessionResponse {
    fn from_session(session: &AttendanceSession, now: DateTime) -> Self {
        Self {
            id: session.id.to_hex(),
            user_id: session.user_id.to_hex(),
            user_name: session.user_name.clone(),
            join_time: rfc3339(session.join_time),
            leave_time: session.leave_time.map(rfc3339),
            duration_minutes: session.duration_minutes,
            duration_seconds: session.elapsed_secs(now),
            is_active: session.is_active(),
        }
    }
}

fn rfc3339(dt: DateTime) -> String {
    dt.try_to_rfc3339_string().unwrap_or_default()
}

pub async fn join(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(meeting_id): Path<String>,
    body: Option<Json<JoinRequest>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let meeting_id = parse_object_id(&meeting_id, "meeting")?;
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let user_name = req.user_name.unwrap_or_else(|| auth_user.display_name.clone());

    let outcome = state
        .attendance
        .join(meeting_id, auth_user.user_id, &user_name)
        .await?;

    Ok(Json(serde_json::json!({
        "id": outcome.session_id.to_hex(),
        "join_time": rfc3339(outcome.join_time),
        "status": if outcome.resumed { "resumed" } else { "joined" },
        "user_name": outcome.user_name,
        "is_existing_session": outcome.resumed,
        "previous_duration": outcome.previous_duration_minutes,
    })))
}

pub async fn leave(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(meeting_id): Path<String>,
    Json(req): Json<LeaveRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let meeting_id = parse_object_id(&meeting_id, "meeting")?;
    let session_id = parse_object_id(&req.session_id, "session")?;

    let outcome = state.attendance.leave(meeting_id, session_id).await?;

    Ok(Json(serde_json::json!({
        "status": if outcome.already_left { "already_left" } else { "left" },
        "session_id": outcome.session_id.to_hex(),
        "leave_time": rfc3339(outcome.leave_time),
        "duration_minutes": outcome.duration_minutes,
        "duration_seconds": outcome.duration_secs,
        "reason": req.reason,
    })))
}

/// Liveness probe for an active session. Always answers 200; a session
/// that cannot be found reports `session_not_found` rather than failing,
/// so a polling client never tears down its UI over a transient miss.
pub async fn heartbeat(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(meeting_id): Path<String>,
    Json(req): Json<HeartbeatRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let meeting_id = parse_object_id(&meeting_id, "meeting")?;
    let session_id = parse_object_id(&req.session_id, "session")?;

    let body = match state.attendance.heartbeat(meeting_id, session_id).await? {
        Some(current_duration) => serde_json::json!({
            "status": "success",
            "session_id": session_id.to_hex(),
            "current_duration": current_duration,
        }),
        None => serde_json::json!({
            "status": "session_not_found",
            "session_id": session_id.to_hex(),
            "current_duration": null,
        }),
    };
    Ok(Json(body))
}

pub async fn check_recent_session(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(meeting_id): Path<String>,
    body: Option<Json<CheckRecentSessionRequest>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let meeting_id = parse_object_id(&meeting_id, "meeting")?;
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let user_id = match req.user_id.as_deref() {
        Some(id) => parse_object_id(id, "user")?,
        None => auth_user.user_id,
    };

    let body = match state.attendance.check_resumable(meeting_id, user_id).await? {
        Some(resumable) => serde_json::json!({
            "can_resume": true,
            "session_id": resumable.session_id.to_hex(),
            "last_left": rfc3339(resumable.last_left),
            "previous_duration": resumable.previous_duration_minutes,
        }),
        None => serde_json::json!({ "can_resume": false }),
    };
    Ok(Json(body))
}

pub async fn resume_session(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(meeting_id): Path<String>,
    Json(req): Json<ResumeSessionRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let meeting_id = parse_object_id(&meeting_id, "meeting")?;
    let session_id = parse_object_id(&req.session_id, "session")?;

    let outcome = state.attendance.resume(meeting_id, session_id).await?;

    Ok(Json(serde_json::json!({
        "status": if outcome.already_active { "already_active" } else { "resumed" },
        "id": outcome.session_id.to_hex(),
        "join_time": rfc3339(outcome.join_time),
        "user_name": outcome.user_name,
        "is_existing_session": true,
    })))
}

pub async fn active_sessions(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(meeting_id): Path<String>,
) -> Result<Json<Vec<SessionResponse>>, ApiError> {
    let meeting_id = parse_object_id(&meeting_id, "meeting")?;
    let sessions = state.attendance.active_sessions(meeting_id).await?;

    let now = state.clock.now();
    Ok(Json(
        sessions
            .iter()
            .map(|s| SessionResponse::from_session(s, now))
            .collect(),
    ))
}

pub async fn history(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(meeting_id): Path<String>,
) -> Result<Json<Vec<SessionResponse>>, ApiError> {
    let meeting_id = parse_object_id(&meeting_id, "meeting")?;
    let sessions = state.attendance.history(meeting_id).await?;

    let now = state.clock.now();
    Ok(Json(
        sessions
            .iter()
            .map(|s| SessionResponse::from_session(s, now))
            .collect(),
    ))
}

pub async fn cleanup(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(meeting_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let meeting_id = parse_object_id(&meeting_id, "meeting")?;
    let report = state.attendance.cleanup(meeting_id).await?;

    Ok(Json(serde_json::json!({
        "status": "cleaned",
        "recomputed": report.recomputed,
        "dropped_invalid": report.dropped_invalid,
        "dropped_noise": report.dropped_noise,
        "merged_duplicates": report.merged_duplicates,
    })))
}
