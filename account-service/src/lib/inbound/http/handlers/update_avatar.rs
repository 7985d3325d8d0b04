use std::path::PathBuf;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::UserData;
use crate::domain::user::ports::AccountServicePort;
use crate::inbound::http::middleware::AuthenticatedUser;
use crate::inbound::http::router::AppState;

pub async fn update_avatar(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthenticatedUser>,
    Json(body): Json<UpdateAvatarRequestBody>,
) -> Result<ApiSuccess<UserData>, ApiError> {
    let avatar_path = body
        .avatar
        .filter(|path| !path.trim().is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| ApiError::BadRequest("avatar file is required".to_string()))?;

    state
        .account_service
        .update_avatar(&identity.user_id, &avatar_path)
        .await
        .map_err(ApiError::from)
        .map(|ref user| ApiSuccess::new(StatusCode::OK, "Avatar updated", user.into()))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UpdateAvatarRequestBody {
    #[serde(default)]
    avatar: Option<String>,
}
