use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use auth::TokenPair;
use auth::TokenSigner;
use chrono::Utc;

use crate::domain::user::models::AuthenticatedSession;
use crate::domain::user::models::ChangePasswordCommand;
use crate::domain::user::models::ChannelProfile;
use crate::domain::user::models::LoginCommand;
use crate::domain::user::models::RegisterUserCommand;
use crate::domain::user::models::UpdateAccountCommand;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::models::Username;
use crate::user::errors::UserError;
use crate::user::ports::AccountServicePort;
use crate::user::ports::MediaStore;
use crate::user::ports::UserRepository;

/// Domain service implementation for account operations.
///
/// Concrete implementation of AccountServicePort with dependency injection.
pub struct AccountService<UR, MS>
where
    UR: UserRepository,
    MS: MediaStore,
{
    repository: Arc<UR>,
    media_store: Arc<MS>,
    token_signer: Arc<TokenSigner>,
    password_hasher: auth::PasswordHasher,
}

impl<UR, MS> AccountService<UR, MS>
where
    UR: UserRepository,
    MS: MediaStore,
{
    /// Create a new account service with injected dependencies.
    pub fn new(repository: Arc<UR>, media_store: Arc<MS>, token_signer: Arc<TokenSigner>) -> Self {
        Self {
            repository,
            media_store,
            token_signer,
            password_hasher: auth::PasswordHasher::new(),
        }
    }

    /// Issue a fresh token pair for a user and persist the refresh token.
    ///
    /// The write is a partial update of the refresh slot only; issuing a new
    /// pair implicitly revokes whatever refresh token was stored before.
    async fn issue_token_pair(&self, user_id: &UserId) -> Result<TokenPair, UserError> {
        let user = self
            .repository
            .find_by_id(user_id)
            .await?
            .ok_or(UserError::NotFound(user_id.to_string()))?;

        let pair = self
            .token_signer
            .sign_pair(user.id, user.username.as_str())
            .map_err(|e| UserError::TokenGeneration(e.to_string()))?;

        self.repository
            .set_refresh_token(&user.id, Some(&pair.refresh_token))
            .await
            .map_err(|e| UserError::TokenGeneration(e.to_string()))?;

        Ok(pair)
    }

    async fn upload_required(&self, path: &Path, what: &str) -> Result<String, UserError> {
        self.media_store
            .upload(path)
            .await
            .map_err(|e| UserError::UploadFailed(format!("{}: {}", what, e)))?
            .map(|media| media.url)
            .ok_or_else(|| UserError::UploadFailed(format!("{} upload yielded no hosted URL", what)))
    }
}

#[async_trait]
impl<UR, MS> AccountServicePort for AccountService<UR, MS>
where
    UR: UserRepository,
    MS: MediaStore,
{
    async fn register(&self, command: RegisterUserCommand) -> Result<User, UserError> {
        if command.password.trim().is_empty() {
            return Err(UserError::Validation("all fields are required".to_string()));
        }

        let existing = self
            .repository
            .find_by_username_or_email(
                Some(command.username.as_str()),
                Some(command.email.as_str()),
            )
            .await?;
        if existing.is_some() {
            return Err(UserError::AlreadyExists);
        }

        let avatar_url = self.upload_required(&command.avatar_path, "avatar").await?;

        // A cover image is optional and its upload failure is tolerated;
        // the record simply ends up without one.
        let cover_image_url = match &command.cover_image_path {
            Some(path) => match self.media_store.upload(path).await {
                Ok(Some(media)) => Some(media.url),
                Ok(None) => None,
                Err(e) => {
                    tracing::warn!("Cover image upload failed, storing no cover: {}", e);
                    None
                }
            },
            None => None,
        };

        let password_hash = self
            .password_hasher
            .hash(&command.password)
            .map_err(|e| UserError::Unknown(format!("Password hashing failed: {}", e)))?;

        let user = User {
            id: UserId::new(),
            username: command.username,
            email: command.email,
            full_name: command.full_name,
            password_hash,
            avatar_url,
            cover_image_url,
            refresh_token: None,
            created_at: Utc::now(),
        };

        let created = self.repository.create(user).await?;

        // Confirmation read. If it fails the insert has still happened; the
        // caller must treat the whole registration as failed.
        self.repository
            .find_by_id(&created.id)
            .await?
            .ok_or_else(|| {
                UserError::Unknown("something went wrong while registering the user".to_string())
            })
    }

    async fn login(&self, command: LoginCommand) -> Result<AuthenticatedSession, UserError> {
        if command.username.is_none() && command.email.is_none() {
            return Err(UserError::Validation(
                "username or email is required".to_string(),
            ));
        }

        let username = command
            .username
            .as_deref()
            .map(|u| u.trim().to_lowercase());

        let user = self
            .repository
            .find_by_username_or_email(username.as_deref(), command.email.as_deref())
            .await?
            .ok_or_else(|| UserError::NotFound("user does not exist".to_string()))?;

        let is_valid = self
            .password_hasher
            .verify(&command.password, &user.password_hash)
            .map_err(|e| UserError::Unknown(format!("Password verification failed: {}", e)))?;

        if !is_valid {
            return Err(UserError::InvalidCredentials);
        }

        let tokens = self.issue_token_pair(&user.id).await?;

        Ok(AuthenticatedSession { user, tokens })
    }

    async fn logout(&self, id: &UserId) -> Result<(), UserError> {
        self.repository.set_refresh_token(id, None).await
    }

    async fn refresh_session(
        &self,
        presented: &str,
    ) -> Result<AuthenticatedSession, UserError> {
        let claims = self
            .token_signer
            .verify_refresh(presented)
            .map_err(|e| UserError::InvalidRefreshToken(e.to_string()))?;

        let user_id = UserId::from_string(&claims.sub)
            .map_err(|_| UserError::InvalidRefreshToken("invalid refresh token".to_string()))?;

        let user = self
            .repository
            .find_by_id(&user_id)
            .await?
            .ok_or_else(|| {
                UserError::InvalidRefreshToken("invalid refresh token".to_string())
            })?;

        match user.refresh_token.as_deref() {
            Some(stored) if stored == presented => {}
            _ => {
                return Err(UserError::InvalidRefreshToken(
                    "refresh token is expired or used".to_string(),
                ))
            }
        }

        let tokens = self
            .token_signer
            .sign_pair(user.id, user.username.as_str())
            .map_err(|e| UserError::TokenGeneration(e.to_string()))?;

        // Conditional swap on the stored value. A replayed token or a raced
        // second rotation loses here even though the comparison above passed.
        let swapped = self
            .repository
            .rotate_refresh_token(&user.id, presented, &tokens.refresh_token)
            .await?;

        if !swapped {
            return Err(UserError::InvalidRefreshToken(
                "refresh token is expired or used".to_string(),
            ));
        }

        Ok(AuthenticatedSession { user, tokens })
    }

    async fn change_password(
        &self,
        id: &UserId,
        command: ChangePasswordCommand,
    ) -> Result<(), UserError> {
        if command.new_password != command.confirm_password {
            return Err(UserError::Validation(
                "new password and confirmation do not match".to_string(),
            ));
        }

        let user = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id.to_string()))?;

        let old_is_valid = self
            .password_hasher
            .verify(&command.old_password, &user.password_hash)
            .map_err(|e| UserError::Unknown(format!("Password verification failed: {}", e)))?;

        if !old_is_valid {
            return Err(UserError::Validation("invalid old password".to_string()));
        }

        let password_hash = self
            .password_hasher
            .hash(&command.new_password)
            .map_err(|e| UserError::Unknown(format!("Password hashing failed: {}", e)))?;

        self.repository.set_password_hash(id, &password_hash).await
    }

    async fn current_user(&self, id: &UserId) -> Result<User, UserError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id.to_string()))
    }

    async fn update_account(
        &self,
        id: &UserId,
        command: UpdateAccountCommand,
    ) -> Result<User, UserError> {
        self.repository
            .update_account_details(id, &command.full_name, &command.email)
            .await
    }

    async fn update_avatar(&self, id: &UserId, avatar_path: &Path) -> Result<User, UserError> {
        let url = self.upload_required(avatar_path, "avatar").await?;
        self.repository.set_avatar_url(id, &url).await
    }

    async fn update_cover_image(
        &self,
        id: &UserId,
        cover_image_path: &Path,
    ) -> Result<User, UserError> {
        let url = self.upload_required(cover_image_path, "cover image").await?;
        self.repository.set_cover_image_url(id, &url).await
    }

    async fn channel_profile(
        &self,
        username: &Username,
        viewer: Option<&UserId>,
    ) -> Result<ChannelProfile, UserError> {
        self.repository
            .channel_profile(username, viewer)
            .await?
            .ok_or_else(|| UserError::ChannelNotFound(username.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use mockall::mock;
    use mockall::predicate::*;

    use super::*;
    use crate::domain::user::models::EmailAddress;
    use crate::domain::user::models::FullName;
    use crate::user::errors::MediaStoreError;
    use crate::user::ports::UploadedMedia;

    mock! {
        pub TestUserRepository {}

        #[async_trait]
        impl UserRepository for TestUserRepository {
            async fn create(&self, user: User) -> Result<User, UserError>;
            async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError>;
            async fn find_by_username_or_email<'a>(
                &'a self,
                username: Option<&'a str>,
                email: Option<&'a str>,
            ) -> Result<Option<User>, UserError>;
            async fn set_refresh_token<'a>(
                &'a self,
                id: &'a UserId,
                refresh_token: Option<&'a str>,
            ) -> Result<(), UserError>;
            async fn rotate_refresh_token(
                &self,
                id: &UserId,
                current: &str,
                next: &str,
            ) -> Result<bool, UserError>;
            async fn set_password_hash(
                &self,
                id: &UserId,
                password_hash: &str,
            ) -> Result<(), UserError>;
            async fn update_account_details(
                &self,
                id: &UserId,
                full_name: &FullName,
                email: &EmailAddress,
            ) -> Result<User, UserError>;
            async fn set_avatar_url(&self, id: &UserId, url: &str) -> Result<User, UserError>;
            async fn set_cover_image_url(&self, id: &UserId, url: &str) -> Result<User, UserError>;
            async fn channel_profile<'a>(
                &'a self,
                username: &'a Username,
                viewer: Option<&'a UserId>,
            ) -> Result<Option<ChannelProfile>, UserError>;
        }
    }

    mock! {
        pub TestMediaStore {}

        #[async_trait]
        impl MediaStore for TestMediaStore {
            async fn upload(
                &self,
                local_path: &Path,
            ) -> Result<Option<UploadedMedia>, MediaStoreError>;
        }
    }

    fn test_signer() -> Arc<TokenSigner> {
        Arc::new(TokenSigner::new(
            b"access_secret_at_least_32_bytes_ok!",
            b"refresh_secret_at_least_32_bytes_ok",
            15,
            10,
        ))
    }

    fn test_user(password_hash: &str) -> User {
        User {
            id: UserId::new(),
            username: Username::new("chaidev").unwrap(),
            email: EmailAddress::new("chai@example.com").unwrap(),
            full_name: FullName::new("Chai Dev").unwrap(),
            password_hash: password_hash.to_string(),
            avatar_url: "https://media.example.com/avatar.png".to_string(),
            cover_image_url: None,
            refresh_token: None,
            created_at: Utc::now(),
        }
    }

    fn register_command() -> RegisterUserCommand {
        RegisterUserCommand {
            full_name: FullName::new("Chai Dev").unwrap(),
            email: EmailAddress::new("chai@example.com").unwrap(),
            username: Username::new("ChaiDev").unwrap(),
            password: "pass_word!".to_string(),
            avatar_path: PathBuf::from("/tmp/staged/avatar.png"),
            cover_image_path: None,
        }
    }

    fn service(
        repository: MockTestUserRepository,
        media_store: MockTestMediaStore,
    ) -> AccountService<MockTestUserRepository, MockTestMediaStore> {
        AccountService::new(Arc::new(repository), Arc::new(media_store), test_signer())
    }

    #[tokio::test]
    async fn test_register_success() {
        let mut repository = MockTestUserRepository::new();
        let mut media_store = MockTestMediaStore::new();

        repository
            .expect_find_by_username_or_email()
            .withf(|username, email| {
                username == &Some("chaidev") && email == &Some("chai@example.com")
            })
            .times(1)
            .returning(|_, _| Ok(None));

        media_store.expect_upload().times(1).returning(|_| {
            Ok(Some(UploadedMedia {
                url: "https://media.example.com/avatar.png".to_string(),
            }))
        });

        repository
            .expect_create()
            .withf(|user| {
                user.username.as_str() == "chaidev"
                    && user.avatar_url == "https://media.example.com/avatar.png"
                    && user.cover_image_url.is_none()
                    && user.refresh_token.is_none()
                    && user.password_hash.starts_with("$argon2")
            })
            .times(1)
            .returning(|user| Ok(user));

        repository
            .expect_find_by_id()
            .times(1)
            .returning(|id| {
                let mut user = test_user("$argon2id$confirmation");
                user.id = *id;
                Ok(Some(user))
            });

        let service = service(repository, media_store);

        let result = service.register(register_command()).await;
        assert!(result.is_ok());

        let user = result.unwrap();
        assert_eq!(user.username.as_str(), "chaidev");
    }

    #[tokio::test]
    async fn test_register_duplicate_identity() {
        let mut repository = MockTestUserRepository::new();
        let mut media_store = MockTestMediaStore::new();

        repository
            .expect_find_by_username_or_email()
            .times(1)
            .returning(|_, _| Ok(Some(test_user("$argon2id$existing"))));

        media_store.expect_upload().times(0);
        repository.expect_create().times(0);

        let service = service(repository, media_store);

        let result = service.register(register_command()).await;
        assert!(matches!(result.unwrap_err(), UserError::AlreadyExists));
    }

    #[tokio::test]
    async fn test_register_blank_password() {
        let repository = MockTestUserRepository::new();
        let media_store = MockTestMediaStore::new();

        let service = service(repository, media_store);

        let mut command = register_command();
        command.password = "   ".to_string();

        let result = service.register(command).await;
        assert!(matches!(result.unwrap_err(), UserError::Validation(_)));
    }

    #[tokio::test]
    async fn test_register_avatar_upload_yields_nothing() {
        let mut repository = MockTestUserRepository::new();
        let mut media_store = MockTestMediaStore::new();

        repository
            .expect_find_by_username_or_email()
            .times(1)
            .returning(|_, _| Ok(None));

        media_store.expect_upload().times(1).returning(|_| Ok(None));

        repository.expect_create().times(0);

        let service = service(repository, media_store);

        let result = service.register(register_command()).await;
        assert!(matches!(result.unwrap_err(), UserError::UploadFailed(_)));
    }

    #[tokio::test]
    async fn test_register_tolerates_cover_upload_failure() {
        let mut repository = MockTestUserRepository::new();
        let mut media_store = MockTestMediaStore::new();

        repository
            .expect_find_by_username_or_email()
            .times(1)
            .returning(|_, _| Ok(None));

        media_store
            .expect_upload()
            .withf(|path| path.ends_with("avatar.png"))
            .times(1)
            .returning(|_| {
                Ok(Some(UploadedMedia {
                    url: "https://media.example.com/avatar.png".to_string(),
                }))
            });

        media_store
            .expect_upload()
            .withf(|path| path.ends_with("cover.png"))
            .times(1)
            .returning(|_| {
                Err(MediaStoreError::RequestFailed(
                    "connection reset".to_string(),
                ))
            });

        repository
            .expect_create()
            .withf(|user| user.cover_image_url.is_none())
            .times(1)
            .returning(|user| Ok(user));

        repository.expect_find_by_id().times(1).returning(|id| {
            let mut user = test_user("$argon2id$confirmation");
            user.id = *id;
            Ok(Some(user))
        });

        let service = service(repository, media_store);

        let mut command = register_command();
        command.cover_image_path = Some(PathBuf::from("/tmp/staged/cover.png"));

        let result = service.register(command).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_register_confirmation_read_fails() {
        let mut repository = MockTestUserRepository::new();
        let mut media_store = MockTestMediaStore::new();

        repository
            .expect_find_by_username_or_email()
            .times(1)
            .returning(|_, _| Ok(None));

        media_store.expect_upload().times(1).returning(|_| {
            Ok(Some(UploadedMedia {
                url: "https://media.example.com/avatar.png".to_string(),
            }))
        });

        repository
            .expect_create()
            .times(1)
            .returning(|user| Ok(user));

        repository
            .expect_find_by_id()
            .times(1)
            .returning(|_| Ok(None));

        let service = service(repository, media_store);

        let result = service.register(register_command()).await;
        assert!(matches!(result.unwrap_err(), UserError::Unknown(_)));
    }

    #[tokio::test]
    async fn test_login_success_issues_verifiable_pair() {
        let mut repository = MockTestUserRepository::new();
        let media_store = MockTestMediaStore::new();

        let hasher = auth::PasswordHasher::new();
        let user = test_user(&hasher.hash("pass_word!").unwrap());
        let user_id = user.id;

        let lookup_user = user.clone();
        repository
            .expect_find_by_username_or_email()
            .withf(|username, email| username == &Some("chaidev") && email.is_none())
            .times(1)
            .returning(move |_, _| Ok(Some(lookup_user.clone())));

        let reload_user = user.clone();
        repository
            .expect_find_by_id()
            .withf(move |id| *id == user_id)
            .times(1)
            .returning(move |_| Ok(Some(reload_user.clone())));

        repository
            .expect_set_refresh_token()
            .withf(move |id, token| *id == user_id && token.is_some())
            .times(1)
            .returning(|_, _| Ok(()));

        let signer = test_signer();
        let service = AccountService::new(
            Arc::new(repository),
            Arc::new(media_store),
            Arc::clone(&signer),
        );

        let result = service
            .login(LoginCommand {
                username: Some("ChaiDev".to_string()),
                email: None,
                password: "pass_word!".to_string(),
            })
            .await;
        assert!(result.is_ok());

        let session = result.unwrap();
        let access = signer.verify_access(&session.tokens.access_token).unwrap();
        assert_eq!(access.sub, user_id.to_string());
        let refresh = signer
            .verify_refresh(&session.tokens.refresh_token)
            .unwrap();
        assert_eq!(refresh.sub, user_id.to_string());
    }

    #[tokio::test]
    async fn test_login_requires_an_identifier() {
        let repository = MockTestUserRepository::new();
        let media_store = MockTestMediaStore::new();

        let service = service(repository, media_store);

        let result = service
            .login(LoginCommand {
                username: None,
                email: None,
                password: "pass_word!".to_string(),
            })
            .await;
        assert!(matches!(result.unwrap_err(), UserError::Validation(_)));
    }

    #[tokio::test]
    async fn test_login_unknown_user() {
        let mut repository = MockTestUserRepository::new();
        let media_store = MockTestMediaStore::new();

        repository
            .expect_find_by_username_or_email()
            .times(1)
            .returning(|_, _| Ok(None));

        let service = service(repository, media_store);

        let result = service
            .login(LoginCommand {
                username: None,
                email: Some("ghost@example.com".to_string()),
                password: "pass_word!".to_string(),
            })
            .await;
        assert!(matches!(result.unwrap_err(), UserError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let mut repository = MockTestUserRepository::new();
        let media_store = MockTestMediaStore::new();

        let hasher = auth::PasswordHasher::new();
        let user = test_user(&hasher.hash("Correct_Password!").unwrap());

        repository
            .expect_find_by_username_or_email()
            .times(1)
            .returning(move |_, _| Ok(Some(user.clone())));

        repository.expect_set_refresh_token().times(0);

        let service = service(repository, media_store);

        let result = service
            .login(LoginCommand {
                username: Some("chaidev".to_string()),
                email: None,
                password: "Wrong_Password!".to_string(),
            })
            .await;
        assert!(matches!(
            result.unwrap_err(),
            UserError::InvalidCredentials
        ));
    }

    #[tokio::test]
    async fn test_refresh_rotates_stored_token() {
        let mut repository = MockTestUserRepository::new();
        let media_store = MockTestMediaStore::new();

        let signer = test_signer();
        let mut user = test_user("$argon2id$hash");
        let user_id = user.id;
        let pair = signer.sign_pair(user.id, user.username.as_str()).unwrap();
        user.refresh_token = Some(pair.refresh_token.clone());

        let stored_user = user.clone();
        repository
            .expect_find_by_id()
            .withf(move |id| *id == user_id)
            .times(1)
            .returning(move |_| Ok(Some(stored_user.clone())));

        let presented = pair.refresh_token.clone();
        repository
            .expect_rotate_refresh_token()
            .withf(move |id, current, _next| *id == user_id && current == presented)
            .times(1)
            .returning(|_, _, _| Ok(true));

        let service = AccountService::new(
            Arc::new(repository),
            Arc::new(media_store),
            Arc::clone(&signer),
        );

        let result = service.refresh_session(&pair.refresh_token).await;
        assert!(result.is_ok());

        let session = result.unwrap();
        let claims = signer
            .verify_refresh(&session.tokens.refresh_token)
            .unwrap();
        assert_eq!(claims.sub, user_id.to_string());
    }

    #[tokio::test]
    async fn test_refresh_rejects_stale_token() {
        let mut repository = MockTestUserRepository::new();
        let media_store = MockTestMediaStore::new();

        let signer = test_signer();
        let mut user = test_user("$argon2id$hash");
        let user_id = user.id;

        // The slot was rotated since this token was issued.
        let stale = signer.sign_pair(user.id, user.username.as_str()).unwrap();
        user.refresh_token = Some("a.completely.different-token".to_string());

        let stored_user = user.clone();
        repository
            .expect_find_by_id()
            .withf(move |id| *id == user_id)
            .times(1)
            .returning(move |_| Ok(Some(stored_user.clone())));

        repository.expect_rotate_refresh_token().times(0);

        let service = AccountService::new(
            Arc::new(repository),
            Arc::new(media_store),
            Arc::clone(&signer),
        );

        let result = service.refresh_session(&stale.refresh_token).await;
        assert!(matches!(
            result.unwrap_err(),
            UserError::InvalidRefreshToken(_)
        ));
    }

    #[tokio::test]
    async fn test_refresh_rejects_cleared_slot() {
        let mut repository = MockTestUserRepository::new();
        let media_store = MockTestMediaStore::new();

        let signer = test_signer();
        let user = test_user("$argon2id$hash");
        let pair = signer.sign_pair(user.id, user.username.as_str()).unwrap();

        // Logout cleared the slot; the previously valid token must not work.
        let stored_user = user.clone();
        repository
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(stored_user.clone())));

        repository.expect_rotate_refresh_token().times(0);

        let service = AccountService::new(
            Arc::new(repository),
            Arc::new(media_store),
            Arc::clone(&signer),
        );

        let result = service.refresh_session(&pair.refresh_token).await;
        assert!(matches!(
            result.unwrap_err(),
            UserError::InvalidRefreshToken(_)
        ));
    }

    #[tokio::test]
    async fn test_refresh_rejects_garbage_token() {
        let repository = MockTestUserRepository::new();
        let media_store = MockTestMediaStore::new();

        let service = service(repository, media_store);

        let result = service.refresh_session("invalid.token.here").await;
        assert!(matches!(
            result.unwrap_err(),
            UserError::InvalidRefreshToken(_)
        ));
    }

    #[tokio::test]
    async fn test_refresh_rejects_unknown_user() {
        let mut repository = MockTestUserRepository::new();
        let media_store = MockTestMediaStore::new();

        let signer = test_signer();
        let pair = signer.sign_pair(UserId::new(), "ghost").unwrap();

        repository
            .expect_find_by_id()
            .times(1)
            .returning(|_| Ok(None));

        let service = AccountService::new(
            Arc::new(repository),
            Arc::new(media_store),
            Arc::clone(&signer),
        );

        let result = service.refresh_session(&pair.refresh_token).await;
        assert!(matches!(
            result.unwrap_err(),
            UserError::InvalidRefreshToken(_)
        ));
    }

    #[tokio::test]
    async fn test_refresh_loses_conditional_swap() {
        let mut repository = MockTestUserRepository::new();
        let media_store = MockTestMediaStore::new();

        let signer = test_signer();
        let mut user = test_user("$argon2id$hash");
        let pair = signer.sign_pair(user.id, user.username.as_str()).unwrap();
        user.refresh_token = Some(pair.refresh_token.clone());

        let stored_user = user.clone();
        repository
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(stored_user.clone())));

        // Another rotation won between our read and our write.
        repository
            .expect_rotate_refresh_token()
            .times(1)
            .returning(|_, _, _| Ok(false));

        let service = AccountService::new(
            Arc::new(repository),
            Arc::new(media_store),
            Arc::clone(&signer),
        );

        let result = service.refresh_session(&pair.refresh_token).await;
        assert!(matches!(
            result.unwrap_err(),
            UserError::InvalidRefreshToken(_)
        ));
    }

    #[tokio::test]
    async fn test_logout_clears_refresh_slot() {
        let mut repository = MockTestUserRepository::new();
        let media_store = MockTestMediaStore::new();

        let user_id = UserId::new();
        repository
            .expect_set_refresh_token()
            .withf(move |id, token| *id == user_id && token.is_none())
            .times(1)
            .returning(|_, _| Ok(()));

        let service = service(repository, media_store);

        let result = service.logout(&user_id).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_change_password_confirmation_mismatch() {
        let repository = MockTestUserRepository::new();
        let media_store = MockTestMediaStore::new();

        let service = service(repository, media_store);

        let result = service
            .change_password(
                &UserId::new(),
                ChangePasswordCommand {
                    old_password: "old_password".to_string(),
                    new_password: "new_password".to_string(),
                    confirm_password: "different_password".to_string(),
                },
            )
            .await;
        assert!(matches!(result.unwrap_err(), UserError::Validation(_)));
    }

    #[tokio::test]
    async fn test_change_password_wrong_old_password() {
        let mut repository = MockTestUserRepository::new();
        let media_store = MockTestMediaStore::new();

        let hasher = auth::PasswordHasher::new();
        let user = test_user(&hasher.hash("actual_old_password").unwrap());
        let user_id = user.id;

        repository
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));

        repository.expect_set_password_hash().times(0);

        let service = service(repository, media_store);

        let result = service
            .change_password(
                &user_id,
                ChangePasswordCommand {
                    old_password: "wrong_old_password".to_string(),
                    new_password: "new_password".to_string(),
                    confirm_password: "new_password".to_string(),
                },
            )
            .await;
        assert!(matches!(result.unwrap_err(), UserError::Validation(_)));
    }

    #[tokio::test]
    async fn test_change_password_success() {
        let mut repository = MockTestUserRepository::new();
        let media_store = MockTestMediaStore::new();

        let hasher = auth::PasswordHasher::new();
        let user = test_user(&hasher.hash("old_password").unwrap());
        let user_id = user.id;

        repository
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));

        repository
            .expect_set_password_hash()
            .withf(move |id, hash| *id == user_id && hash.starts_with("$argon2"))
            .times(1)
            .returning(|_, _| Ok(()));

        let service = service(repository, media_store);

        let result = service
            .change_password(
                &user_id,
                ChangePasswordCommand {
                    old_password: "old_password".to_string(),
                    new_password: "new_password".to_string(),
                    confirm_password: "new_password".to_string(),
                },
            )
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_current_user_not_found() {
        let mut repository = MockTestUserRepository::new();
        let media_store = MockTestMediaStore::new();

        repository
            .expect_find_by_id()
            .times(1)
            .returning(|_| Ok(None));

        let service = service(repository, media_store);

        let result = service.current_user(&UserId::new()).await;
        assert!(matches!(result.unwrap_err(), UserError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_avatar_requires_hosted_url() {
        let repository = MockTestUserRepository::new();
        let mut media_store = MockTestMediaStore::new();

        media_store.expect_upload().times(1).returning(|_| Ok(None));

        let service = service(repository, media_store);

        let result = service
            .update_avatar(&UserId::new(), Path::new("/tmp/staged/avatar.png"))
            .await;
        assert!(matches!(result.unwrap_err(), UserError::UploadFailed(_)));
    }

    #[tokio::test]
    async fn test_update_avatar_success() {
        let mut repository = MockTestUserRepository::new();
        let mut media_store = MockTestMediaStore::new();

        let user_id = UserId::new();

        media_store.expect_upload().times(1).returning(|_| {
            Ok(Some(UploadedMedia {
                url: "https://media.example.com/new-avatar.png".to_string(),
            }))
        });

        repository
            .expect_set_avatar_url()
            .withf(move |id, url| {
                *id == user_id && url == "https://media.example.com/new-avatar.png"
            })
            .times(1)
            .returning(|id, url| {
                let mut user = test_user("$argon2id$hash");
                user.id = *id;
                user.avatar_url = url.to_string();
                Ok(user)
            });

        let service = service(repository, media_store);

        let result = service
            .update_avatar(&user_id, Path::new("/tmp/staged/avatar.png"))
            .await;
        assert!(result.is_ok());
        assert_eq!(
            result.unwrap().avatar_url,
            "https://media.example.com/new-avatar.png"
        );
    }

    #[tokio::test]
    async fn test_channel_profile_counts_and_membership() {
        let mut repository = MockTestUserRepository::new();
        let media_store = MockTestMediaStore::new();

        let viewer = UserId::new();
        repository
            .expect_channel_profile()
            .withf(move |username, v| {
                username.as_str() == "chaidev" && (*v).map(|u| *u) == Some(viewer)
            })
            .times(1)
            .returning(|username, _| {
                Ok(Some(ChannelProfile {
                    full_name: "Chai Dev".to_string(),
                    username: username.as_str().to_string(),
                    email: "chai@example.com".to_string(),
                    avatar_url: "https://media.example.com/avatar.png".to_string(),
                    cover_image_url: None,
                    subscribers_count: 3,
                    channels_subscribed_to_count: 1,
                    is_subscribed: true,
                }))
            });

        let service = service(repository, media_store);

        let username = Username::new("chaidev").unwrap();
        let result = service.channel_profile(&username, Some(&viewer)).await;
        assert!(result.is_ok());

        let profile = result.unwrap();
        assert_eq!(profile.subscribers_count, 3);
        assert_eq!(profile.channels_subscribed_to_count, 1);
        assert!(profile.is_subscribed);
    }

    #[tokio::test]
    async fn test_channel_profile_not_found() {
        let mut repository = MockTestUserRepository::new();
        let media_store = MockTestMediaStore::new();

        repository
            .expect_channel_profile()
            .times(1)
            .returning(|_, _| Ok(None));

        let service = service(repository, media_store);

        let username = Username::new("nonexistent").unwrap();
        let result = service.channel_profile(&username, None).await;
        assert!(matches!(
            result.unwrap_err(),
            UserError::ChannelNotFound(_)
        ));
    }
}
