use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use serde::Deserialize;
use thiserror::Error;

use super::ApiError;
use super::ApiSuccess;
use super::UserData;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::FullName;
use crate::domain::user::models::UpdateAccountCommand;
use crate::domain::user::ports::AccountServicePort;
use crate::inbound::http::middleware::AuthenticatedUser;
use crate::inbound::http::router::AppState;
use crate::user::errors::EmailError;
use crate::user::errors::FullNameError;

pub async fn update_account(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthenticatedUser>,
    Json(body): Json<UpdateAccountRequestBody>,
) -> Result<ApiSuccess<UserData>, ApiError> {
    state
        .account_service
        .update_account(&identity.user_id, body.try_into_command()?)
        .await
        .map_err(ApiError::from)
        .map(|ref user| {
            ApiSuccess::new(StatusCode::OK, "Account details updated", user.into())
        })
}

/// Both fields are required; partial updates go through the dedicated
/// avatar/cover endpoints instead.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UpdateAccountRequestBody {
    full_name: String,
    email: String,
}

#[derive(Debug, Clone, Error)]
enum ParseUpdateAccountRequestError {
    #[error("Invalid full name: {0}")]
    FullName(#[from] FullNameError),

    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),
}

impl UpdateAccountRequestBody {
    fn try_into_command(self) -> Result<UpdateAccountCommand, ParseUpdateAccountRequestError> {
        let full_name = FullName::new(&self.full_name)?;
        let email = EmailAddress::new(&self.email)?;
        Ok(UpdateAccountCommand { full_name, email })
    }
}

impl From<ParseUpdateAccountRequestError> for ApiError {
    fn from(err: ParseUpdateAccountRequestError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}
