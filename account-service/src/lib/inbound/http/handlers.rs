use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use crate::user::errors::UserError;
use crate::user::models::AuthenticatedSession;
use crate::user::models::User;

pub mod change_password;
pub mod channel_profile;
pub mod current_user;
pub mod login;
pub mod logout;
pub mod refresh_session;
pub mod register;
pub mod update_account;
pub mod update_avatar;
pub mod update_cover_image;

#[derive(Debug, Clone)]
pub struct ApiSuccess<T: Serialize + PartialEq>(StatusCode, Json<ApiResponseBody<T>>);

impl<T> PartialEq for ApiSuccess<T>
where
    T: Serialize + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 && self.1 .0 == other.1 .0
    }
}

impl<T: Serialize + PartialEq> ApiSuccess<T> {
    pub fn new(status: StatusCode, message: &str, data: T) -> Self {
        ApiSuccess(status, Json(ApiResponseBody::new(status, message, data)))
    }
}

impl<T: Serialize + PartialEq> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    InternalServerError(String),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Unauthorized(String),
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::InternalServerError(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
        };

        (status, Json(ApiErrorBody::new(status, message))).into_response()
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound(_) | UserError::ChannelNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            UserError::AlreadyExists => ApiError::Conflict(err.to_string()),
            UserError::InvalidCredentials | UserError::InvalidRefreshToken(_) => {
                ApiError::Unauthorized(err.to_string())
            }
            UserError::InvalidUserId(_)
            | UserError::InvalidUsername(_)
            | UserError::InvalidEmail(_)
            | UserError::InvalidFullName(_)
            | UserError::Validation(_)
            | UserError::UploadFailed(_) => ApiError::BadRequest(err.to_string()),
            UserError::TokenGeneration(_)
            | UserError::DatabaseError(_)
            | UserError::Unknown(_) => ApiError::InternalServerError(err.to_string()),
        }
    }
}

/// Success envelope: `{status_code, data, message, success: true}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResponseBody<T: Serialize + PartialEq> {
    status_code: u16,
    data: T,
    message: String,
    success: bool,
}

impl<T: Serialize + PartialEq> ApiResponseBody<T> {
    pub fn new(status_code: StatusCode, message: &str, data: T) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data,
            message: message.to_string(),
            success: true,
        }
    }
}

/// Error envelope: `{status_code, message, success: false}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiErrorBody {
    status_code: u16,
    message: String,
    success: bool,
}

impl ApiErrorBody {
    pub fn new(status_code: StatusCode, message: String) -> Self {
        Self {
            status_code: status_code.as_u16(),
            message,
            success: false,
        }
    }
}

/// Sanitized user record for responses.
///
/// Deliberately has no password or refresh-token field, so neither can leak
/// through serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserData {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserData {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            username: user.username.as_str().to_string(),
            email: user.email.as_str().to_string(),
            full_name: user.full_name.as_str().to_string(),
            avatar_url: user.avatar_url.clone(),
            cover_image_url: user.cover_image_url.clone(),
            created_at: user.created_at,
        }
    }
}

/// Sanitized user plus the freshly issued token pair (login and refresh).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionData {
    pub user: UserData,
    pub access_token: String,
    pub refresh_token: String,
}

impl From<&AuthenticatedSession> for SessionData {
    fn from(session: &AuthenticatedSession) -> Self {
        Self {
            user: (&session.user).into(),
            access_token: session.tokens.access_token.clone(),
            refresh_token: session.tokens.refresh_token.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::user::models::EmailAddress;
    use crate::user::models::FullName;
    use crate::user::models::UserId;
    use crate::user::models::Username;

    #[test]
    fn test_user_data_never_serializes_secrets() {
        let user = User {
            id: UserId::new(),
            username: Username::new("chaidev").unwrap(),
            email: EmailAddress::new("chai@example.com").unwrap(),
            full_name: FullName::new("Chai Dev").unwrap(),
            password_hash: "$argon2id$super_secret_hash".to_string(),
            avatar_url: "https://media.example.com/avatar.png".to_string(),
            cover_image_url: Some("https://media.example.com/cover.png".to_string()),
            refresh_token: Some("stored.refresh.token".to_string()),
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&UserData::from(&user)).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("super_secret_hash"));
        assert!(!json.contains("refresh"));
        assert!(json.contains("chaidev"));
    }
}
