use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::SessionData;
use crate::domain::user::models::LoginCommand;
use crate::domain::user::ports::AccountServicePort;
use crate::inbound::http::cookies::with_token_cookies;
use crate::inbound::http::router::AppState;

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequestBody>,
) -> Result<(CookieJar, ApiSuccess<SessionData>), ApiError> {
    let session = state
        .account_service
        .login(LoginCommand {
            username: body.username,
            email: body.email,
            password: body.password,
        })
        .await
        .map_err(ApiError::from)?;

    let jar = with_token_cookies(jar, &session.tokens);

    Ok((
        jar,
        ApiSuccess::new(
            StatusCode::OK,
            "User logged in successfully",
            (&session).into(),
        ),
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginRequestBody {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    email: Option<String>,
    password: String,
}
