use std::path::PathBuf;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use thiserror::Error;

use super::ApiError;
use super::ApiSuccess;
use super::UserData;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::FullName;
use crate::domain::user::models::RegisterUserCommand;
use crate::domain::user::models::Username;
use crate::domain::user::ports::AccountServicePort;
use crate::inbound::http::router::AppState;
use crate::user::errors::EmailError;
use crate::user::errors::FullNameError;
use crate::user::errors::UsernameError;

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterUserRequest>,
) -> Result<ApiSuccess<UserData>, ApiError> {
    state
        .account_service
        .register(body.try_into_command()?)
        .await
        .map_err(ApiError::from)
        .map(|ref user| {
            ApiSuccess::new(
                StatusCode::CREATED,
                "User registered successfully",
                user.into(),
            )
        })
}

/// HTTP request body for registration (raw JSON).
///
/// `avatar` and `cover_image` are staged local paths handed over by the
/// upload intermediary, not raw file content.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisterUserRequest {
    full_name: String,
    email: String,
    username: String,
    password: String,
    avatar: Option<String>,
    cover_image: Option<String>,
}

#[derive(Debug, Clone, Error)]
enum ParseRegisterUserRequestError {
    #[error("all fields are required")]
    MissingFields,

    #[error("Invalid full name: {0}")]
    FullName(#[from] FullNameError),

    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),

    #[error("Invalid username: {0}")]
    Username(#[from] UsernameError),

    #[error("avatar file is required")]
    MissingAvatar,
}

impl RegisterUserRequest {
    fn try_into_command(self) -> Result<RegisterUserCommand, ParseRegisterUserRequestError> {
        if [&self.full_name, &self.email, &self.username, &self.password]
            .iter()
            .any(|field| field.trim().is_empty())
        {
            return Err(ParseRegisterUserRequestError::MissingFields);
        }

        let full_name = FullName::new(&self.full_name)?;
        let email = EmailAddress::new(&self.email)?;
        let username = Username::new(&self.username)?;

        let avatar_path = self
            .avatar
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from)
            .ok_or(ParseRegisterUserRequestError::MissingAvatar)?;

        let cover_image_path = self
            .cover_image
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        Ok(RegisterUserCommand {
            full_name,
            email,
            username,
            password: self.password,
            avatar_path,
            cover_image_path,
        })
    }
}

impl From<ParseRegisterUserRequestError> for ApiError {
    fn from(err: ParseRegisterUserRequestError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RegisterUserRequest {
        RegisterUserRequest {
            full_name: "Chai Dev".to_string(),
            email: "chai@example.com".to_string(),
            username: "ChaiDev".to_string(),
            password: "pass_word!".to_string(),
            avatar: Some("/tmp/staged/avatar.png".to_string()),
            cover_image: None,
        }
    }

    #[test]
    fn test_parses_valid_request() {
        let command = request().try_into_command().unwrap();
        assert_eq!(command.username.as_str(), "chaidev");
        assert_eq!(command.avatar_path, PathBuf::from("/tmp/staged/avatar.png"));
        assert!(command.cover_image_path.is_none());
    }

    #[test]
    fn test_rejects_blank_fields() {
        let mut body = request();
        body.full_name = "   ".to_string();
        assert!(matches!(
            body.try_into_command(),
            Err(ParseRegisterUserRequestError::MissingFields)
        ));
    }

    #[test]
    fn test_rejects_malformed_email() {
        let mut body = request();
        body.email = "not-an-email".to_string();
        assert!(matches!(
            body.try_into_command(),
            Err(ParseRegisterUserRequestError::Email(_))
        ));
    }

    #[test]
    fn test_rejects_missing_avatar() {
        let mut body = request();
        body.avatar = None;
        assert!(matches!(
            body.try_into_command(),
            Err(ParseRegisterUserRequestError::MissingAvatar)
        ));

        let mut body = request();
        body.avatar = Some("  ".to_string());
        assert!(matches!(
            body.try_into_command(),
            Err(ParseRegisterUserRequestError::MissingAvatar)
        ));
    }
}
