use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use bson::{DateTime, oid::ObjectId};
use rollcall_db::models::{Meeting, MeetingStatus};
use rollcall_services::dao::base::{PaginatedResult, PaginationParams};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateMeetingRequest {
    pub title: String,
    pub course_id: Option<String>,
    pub lecturer_id: Option<String>,
    /// RFC 3339 timestamp.
    pub scheduled_at: Option<String>,
    pub duration_minutes: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct MeetingResponse {
    pub id: String,
    pub room_id: String,
    pub title: String,
    pub status: MeetingStatus,
    pub created_by: String,
    pub course_id: Option<String>,
    pub lecturer_id: Option<String>,
    pub scheduled_at: Option<String>,
    pub duration_minutes: Option<u32>,
    pub participant_count: usize,
    pub created_at: String,
}

impl From<&Meeting> for MeetingResponse {
    fn from(meeting: &Meeting) -> Self {
        Self {
            id: meeting.id.map(|id| id.to_hex()).unwrap_or_default(),
            room_id: meeting.room_id.clone(),
            title: meeting.title.clone(),
            status: meeting.status.clone(),
            created_by: meeting.created_by.to_hex(),
            course_id: meeting.course_id.map(|id| id.to_hex()),
            lecturer_id: meeting.lecturer_id.map(|id| id.to_hex()),
            scheduled_at: meeting.scheduled_at.map(rfc3339),
            duration_minutes: meeting.duration_minutes,
            participant_count: meeting.participants.len(),
            created_at: rfc3339(meeting.created_at),
        }
    }
}

fn rfc3339(dt: DateTime) -> String {
    dt.try_to_rfc3339_string().unwrap_or_default()
}

pub fn parse_object_id(value: &str, what: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(value).map_err(|_| ApiError::BadRequest(format!("Invalid {what} id")))
}

pub async fn list(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PaginatedResult<MeetingResponse>>, ApiError> {
    let page = state.meetings.list_for_user(auth_user.user_id, &params).await?;
    Ok(Json(PaginatedResult {
        items: page.items.iter().map(MeetingResponse::from).collect(),
        total: page.total,
        page: page.page,
        per_page: page.per_page,
        total_pages: page.total_pages,
    }))
}

pub async fn create(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(req): Json<CreateMeetingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Title is required".to_string()));
    }

    let course_id = req
        .course_id
        .as_deref()
        .map(|id| parse_object_id(id, "course"))
        .transpose()?;
    let lecturer_id = req
        .lecturer_id
        .as_deref()
        .map(|id| parse_object_id(id, "lecturer"))
        .transpose()?;
    let scheduled_at = req
        .scheduled_at
        .as_deref()
        .map(|s| {
            DateTime::parse_rfc3339_str(s)
                .map_err(|_| ApiError::BadRequest("Invalid scheduled_at timestamp".to_string()))
        })
        .transpose()?;

    let meeting = state
        .meetings
        .create(
            auth_user.user_id,
            req.title,
            course_id,
            lecturer_id,
            scheduled_at,
            req.duration_minutes,
        )
        .await?;

    info!(meeting = %meeting.room_id, "Meeting created");
    Ok((StatusCode::CREATED, Json(MeetingResponse::from(&meeting))))
}

pub async fn get(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(meeting_id): Path<String>,
) -> Result<Json<MeetingResponse>, ApiError> {
    let id = parse_object_id(&meeting_id, "meeting")?;
    let meeting = state.meetings.load(id).await?;
    Ok(Json(MeetingResponse::from(&meeting)))
}

pub async fn start(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(meeting_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_object_id(&meeting_id, "meeting")?;
    if !state.meetings.start(id).await? {
        return Err(ApiError::NotFound("Meeting not found".to_string()));
    }
    info!(meeting = %meeting_id, "Meeting started");
    Ok(Json(serde_json::json!({ "status": "active" })))
}

pub async fn end(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(meeting_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_object_id(&meeting_id, "meeting")?;
    let sessions_ended = state.attendance.end_meeting(id).await?;
    Ok(Json(serde_json::json!({
        "status": "ended",
        "sessions_ended": sessions_ended,
    })))
}

pub async fn delete(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(meeting_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_object_id(&meeting_id, "meeting")?;
    let meeting = state.meetings.load(id).await?;
    if meeting.created_by != auth_user.user_id {
        return Err(ApiError::Unauthorized(
            "Only the creator can delete a meeting".to_string(),
        ));
    }

    if !state.meetings.delete(id).await? {
        return Err(ApiError::NotFound("Meeting not found".to_string()));
    }
    info!(meeting = %meeting_id, "Meeting deleted");
    Ok(Json(serde_json::json!({ "status": "deleted" })))
}
