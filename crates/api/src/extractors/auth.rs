use axum::{extract::FromRequestParts, http::request::Parts};
use bson::oid::ObjectId;
use rollcall_db::models::UserRole;
use rollcall_services::auth::Claims;

use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated caller, extracted from a Bearer token or the
/// `access_token` cookie. Handlers that take an `AuthUser` parameter
/// reject unauthenticated requests with 401.
pub struct AuthUser {
    pub user_id: ObjectId,
    pub username: String,
    pub display_name: String,
    pub role: UserRole,
    pub claims: Claims,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(parts)
            .ok_or_else(|| ApiError::Unauthorized("Missing authentication token".to_string()))?;

        let claims = state.auth.verify_access_token(&token)?;

        let user_id = ObjectId::parse_str(&claims.sub)
            .map_err(|_| ApiError::Unauthorized("Invalid token subject".to_string()))?;

        Ok(AuthUser {
            user_id,
            username: claims.username.clone(),
            display_name: claims.display_name.clone(),
            role: claims.role.clone(),
            claims,
        })
    }
}

fn extract_token(parts: &Parts) -> Option<String> {
    if let Some(auth_header) = parts.headers.get(axum::http::header::AUTHORIZATION) {
        if let Ok(value) = auth_header.to_str() {
            if let Some(token) = value.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }

    // Browser clients carry the token in a cookie instead.
    if let Some(cookie_header) = parts.headers.get(axum::http::header::COOKIE) {
        if let Ok(cookies) = cookie_header.to_str() {
            for cookie in cookies.split(';') {
                let cookie = cookie.trim();
                if let Some(token) = cookie.strip_prefix("access_token=") {
                    return Some(token.to_string());
                }
            }
        }
    }

    None
}
