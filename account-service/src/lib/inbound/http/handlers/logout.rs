use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum_extra::extract::cookie::CookieJar;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::user::ports::AccountServicePort;
use crate::inbound::http::cookies::without_token_cookies;
use crate::inbound::http::middleware::AuthenticatedUser;
use crate::inbound::http::router::AppState;

pub async fn logout(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthenticatedUser>,
    jar: CookieJar,
) -> Result<(CookieJar, ApiSuccess<serde_json::Value>), ApiError> {
    state
        .account_service
        .logout(&identity.user_id)
        .await
        .map_err(ApiError::from)?;

    Ok((
        without_token_cookies(jar),
        ApiSuccess::new(
            StatusCode::OK,
            "User logged out successfully",
            serde_json::json!({}),
        ),
    ))
}
