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

pub async fn update_cover_image(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthenticatedUser>,
    Json(body): Json<UpdateCoverImageRequestBody>,
) -> Result<ApiSuccess<UserData>, ApiError> {
    let cover_image_path = body
        .cover_image
        .filter(|path| !path.trim().is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| ApiError::BadRequest("cover image file is required".to_string()))?;

    state
        .account_service
        .update_cover_image(&identity.user_id, &cover_image_path)
        .await
        .map_err(ApiError::from)
        .map(|ref user| ApiSuccess::new(StatusCode::OK, "Cover image updated", user.into()))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UpdateCoverImageRequestBody {
    #[serde(default)]
    cover_image: Option<String>,
}
