use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::user::models::ChannelProfile;
use crate::domain::user::models::Username;
use crate::domain::user::ports::AccountServicePort;
use crate::inbound::http::middleware::AuthenticatedUser;
use crate::inbound::http::router::AppState;

pub async fn channel_profile(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthenticatedUser>,
    Path(username): Path<String>,
) -> Result<ApiSuccess<ChannelProfileData>, ApiError> {
    if username.trim().is_empty() {
        return Err(ApiError::BadRequest("username is missing".to_string()));
    }

    let username = Username::new(&username)
        .map_err(|e| ApiError::BadRequest(format!("Invalid username: {}", e)))?;

    state
        .account_service
        .channel_profile(&username, Some(&identity.user_id))
        .await
        .map_err(ApiError::from)
        .map(|ref profile| {
            ApiSuccess::new(StatusCode::OK, "Channel profile fetched", profile.into())
        })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelProfileData {
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    pub subscribers_count: i64,
    pub channels_subscribed_to_count: i64,
    pub is_subscribed: bool,
}

impl From<&ChannelProfile> for ChannelProfileData {
    fn from(profile: &ChannelProfile) -> Self {
        Self {
            full_name: profile.full_name.clone(),
            username: profile.username.clone(),
            email: profile.email.clone(),
            avatar_url: profile.avatar_url.clone(),
            cover_image_url: profile.cover_image_url.clone(),
            subscribers_count: profile.subscribers_count,
            channels_subscribed_to_count: profile.channels_subscribed_to_count,
            is_subscribed: profile.is_subscribed,
        }
    }
}
