use axum::{Json, extract::State, http::StatusCode, http::header, response::IntoResponse};
use rollcall_db::models::{User, UserRole};
use rollcall_services::auth::TokenPair;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub display_name: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<UserRole>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub username: String,
    pub display_name: String,
    pub role: UserRole,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub tokens: TokenPair,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            email: user.email.clone(),
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            role: user.role.clone(),
        }
    }
}

fn access_cookie(tokens: &TokenPair) -> String {
    format!(
        "access_token={}; HttpOnly; Path=/; Max-Age={}; SameSite=Lax",
        tokens.access_token, tokens.expires_in
    )
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let password_hash = state.auth.hash_password(&req.password)?;
    let role = req.role.unwrap_or_default();

    let user = state
        .users
        .create(
            req.email,
            req.username,
            req.display_name,
            role,
            password_hash,
        )
        .await
        .map_err(|e| match e {
            rollcall_services::dao::base::DaoError::DuplicateKey(_) => {
                ApiError::Conflict("Email or username already taken".to_string())
            }
            other => other.into(),
        })?;

    let user_id = user
        .id
        .ok_or_else(|| ApiError::Internal("Created user has no id".to_string()))?;
    let tokens = state.auth.generate_tokens(
        user_id,
        &user.username,
        &user.display_name,
        user.role.clone(),
    )?;

    info!(user = %user.username, "User registered");

    let cookie = access_cookie(&tokens);
    let body = AuthResponse {
        user: UserResponse::from(&user),
        tokens,
    };
    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(body),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // The username field doubles as an email address.
    let lookup = if req.username.contains('@') {
        state.users.find_by_email(&req.username).await
    } else {
        state.users.find_by_username(&req.username).await
    };
    let user = lookup.map_err(|_| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    let hash = user
        .password_hash
        .as_deref()
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;
    if !state.auth.verify_password(&req.password, hash)? {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    let user_id = user
        .id
        .ok_or_else(|| ApiError::Internal("User has no id".to_string()))?;
    let tokens = state.auth.generate_tokens(
        user_id,
        &user.username,
        &user.display_name,
        user.role.clone(),
    )?;

    state.users.touch_last_active(user_id).await?;
    info!(user = %user.username, "User logged in");

    let cookie = access_cookie(&tokens);
    let body = AuthResponse {
        user: UserResponse::from(&user),
        tokens,
    };
    Ok(([(header::SET_COOKIE, cookie)], Json(body)))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let claims = state.auth.verify_refresh_token(&req.refresh_token)?;
    let user = state.users.find_by_username(&claims.username).await?;

    let user_id = user
        .id
        .ok_or_else(|| ApiError::Internal("User has no id".to_string()))?;
    let tokens = state.auth.generate_tokens(
        user_id,
        &user.username,
        &user.display_name,
        user.role.clone(),
    )?;

    let cookie = access_cookie(&tokens);
    let body = AuthResponse {
        user: UserResponse::from(&user),
        tokens,
    };
    Ok(([(header::SET_COOKIE, cookie)], Json(body)))
}

pub async fn logout() -> impl IntoResponse {
    let cookie = "access_token=; HttpOnly; Path=/; Max-Age=0; SameSite=Lax".to_string();
    (
        [(header::SET_COOKIE, cookie)],
        Json(serde_json::json!({ "status": "logged_out" })),
    )
}

pub async fn me(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.users.base.find_by_id(auth_user.user_id).await?;
    Ok(Json(UserResponse::from(&user)))
}
