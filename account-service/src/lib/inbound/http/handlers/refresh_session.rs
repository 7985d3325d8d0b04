use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::SessionData;
use crate::domain::user::ports::AccountServicePort;
use crate::inbound::http::cookies::with_token_cookies;
use crate::inbound::http::cookies::REFRESH_TOKEN_COOKIE;
use crate::inbound::http::router::AppState;

/// Exchange a refresh token for a new pair. The token arrives via cookie
/// or, for non-browser clients, in the request body.
pub async fn refresh_session(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Option<Json<RefreshRequestBody>>,
) -> Result<(CookieJar, ApiSuccess<SessionData>), ApiError> {
    let presented = jar
        .get(REFRESH_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .or_else(|| body.and_then(|Json(body)| body.refresh_token))
        .ok_or_else(|| ApiError::Unauthorized("unauthorized request".to_string()))?;

    let session = state
        .account_service
        .refresh_session(&presented)
        .await
        .map_err(ApiError::from)?;

    let jar = with_token_cookies(jar, &session.tokens);

    Ok((
        jar,
        ApiSuccess::new(
            StatusCode::OK,
            "Access token refreshed",
            (&session).into(),
        ),
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct RefreshRequestBody {
    #[serde(default)]
    refresh_token: Option<String>,
}
