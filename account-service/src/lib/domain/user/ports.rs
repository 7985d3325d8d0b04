use std::path::Path;

use async_trait::async_trait;

use crate::domain::user::models::AuthenticatedSession;
use crate::domain::user::models::ChangePasswordCommand;
use crate::domain::user::models::ChannelProfile;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::LoginCommand;
use crate::domain::user::models::RegisterUserCommand;
use crate::domain::user::models::UpdateAccountCommand;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::user::errors::MediaStoreError;
use crate::user::errors::UserError;
use crate::user::models::FullName;
use crate::user::models::Username;

/// Port for account service operations.
#[async_trait]
pub trait AccountServicePort: Send + Sync + 'static {
    /// Register a new user, uploading avatar (required) and cover image
    /// (optional, failure tolerated).
    ///
    /// # Errors
    /// * `AlreadyExists` - Email or username is already registered
    /// * `UploadFailed` - Avatar upload yielded no hosted URL
    /// * `Unknown` - The insert succeeded but the confirmation read failed
    async fn register(&self, command: RegisterUserCommand) -> Result<User, UserError>;

    /// Verify credentials and issue a token pair.
    ///
    /// # Errors
    /// * `Validation` - Neither username nor email was supplied
    /// * `NotFound` - No user with the given identifier
    /// * `InvalidCredentials` - Password mismatch
    /// * `TokenGeneration` - Signing or persistence of the pair failed
    async fn login(&self, command: LoginCommand) -> Result<AuthenticatedSession, UserError>;

    /// Clear the user's stored refresh token.
    async fn logout(&self, id: &UserId) -> Result<(), UserError>;

    /// Exchange a refresh token for a new pair, rotating the stored slot.
    ///
    /// # Errors
    /// * `InvalidRefreshToken` - Bad signature, expiry, unknown user, or a
    ///   token that no longer matches the stored slot (single-use rotation)
    async fn refresh_session(&self, presented: &str)
        -> Result<AuthenticatedSession, UserError>;

    /// Change the password after verifying the old one.
    ///
    /// # Errors
    /// * `Validation` - Confirmation mismatch or wrong old password
    async fn change_password(
        &self,
        id: &UserId,
        command: ChangePasswordCommand,
    ) -> Result<(), UserError>;

    /// Fetch the authenticated user's record.
    async fn current_user(&self, id: &UserId) -> Result<User, UserError>;

    /// Update display name and email together.
    async fn update_account(
        &self,
        id: &UserId,
        command: UpdateAccountCommand,
    ) -> Result<User, UserError>;

    /// Upload a new avatar and store its hosted URL.
    async fn update_avatar(&self, id: &UserId, avatar_path: &Path) -> Result<User, UserError>;

    /// Upload a new cover image and store its hosted URL.
    async fn update_cover_image(
        &self,
        id: &UserId,
        cover_image_path: &Path,
    ) -> Result<User, UserError>;

    /// Compute the public channel profile for a username, with subscription
    /// counts and whether `viewer` subscribes to the channel.
    ///
    /// # Errors
    /// * `ChannelNotFound` - No user with this username
    async fn channel_profile(
        &self,
        username: &Username,
        viewer: Option<&UserId>,
    ) -> Result<ChannelProfile, UserError>;
}

/// Persistence operations for the user aggregate.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Persist a new user.
    ///
    /// # Errors
    /// * `AlreadyExists` - Username or email unique constraint violated
    /// * `DatabaseError` - Database operation failed
    async fn create(&self, user: User) -> Result<User, UserError>;

    /// Retrieve a user by identifier.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError>;

    /// Retrieve a user matching the username or the email, whichever is
    /// supplied; both may be supplied (registration duplicate check).
    async fn find_by_username_or_email<'a>(
        &'a self,
        username: Option<&'a str>,
        email: Option<&'a str>,
    ) -> Result<Option<User>, UserError>;

    /// Overwrite the refresh-token slot; `None` clears it. Partial update,
    /// nothing else on the record is touched or re-validated.
    async fn set_refresh_token<'a>(
        &'a self,
        id: &'a UserId,
        refresh_token: Option<&'a str>,
    ) -> Result<(), UserError>;

    /// Atomically swap the refresh-token slot from `current` to `next`.
    ///
    /// Returns false when the slot no longer holds `current`, which is how
    /// a raced or replayed rotation loses.
    async fn rotate_refresh_token(
        &self,
        id: &UserId,
        current: &str,
        next: &str,
    ) -> Result<bool, UserError>;

    /// Overwrite the password hash. Partial update.
    async fn set_password_hash(&self, id: &UserId, password_hash: &str)
        -> Result<(), UserError>;

    /// Update display name and email, returning the updated record.
    async fn update_account_details(
        &self,
        id: &UserId,
        full_name: &FullName,
        email: &EmailAddress,
    ) -> Result<User, UserError>;

    /// Overwrite the avatar URL, returning the updated record.
    async fn set_avatar_url(&self, id: &UserId, url: &str) -> Result<User, UserError>;

    /// Overwrite the cover-image URL, returning the updated record.
    async fn set_cover_image_url(&self, id: &UserId, url: &str) -> Result<User, UserError>;

    /// Run the channel aggregation for a username; `None` when no such
    /// channel exists.
    async fn channel_profile<'a>(
        &'a self,
        username: &'a Username,
        viewer: Option<&'a UserId>,
    ) -> Result<Option<ChannelProfile>, UserError>;
}

/// Hosted URL returned by the media host for an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedMedia {
    pub url: String,
}

/// External media host the service delegates staged files to.
///
/// `Ok(None)` models the host accepting the request but yielding nothing
/// usable; callers decide whether that is fatal (avatar) or not (cover).
#[async_trait]
pub trait MediaStore: Send + Sync + 'static {
    async fn upload(&self, local_path: &Path)
        -> Result<Option<UploadedMedia>, MediaStoreError>;
}
