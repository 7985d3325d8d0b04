use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use sqlx::Row;

use crate::domain::user::models::ChannelProfile;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::FullName;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::models::Username;
use crate::domain::user::ports::UserRepository;
use crate::user::errors::UserError;

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn database_error(e: sqlx::Error) -> UserError {
    UserError::DatabaseError(e.to_string())
}

fn unique_violation_or_database_error(e: sqlx::Error) -> UserError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return UserError::AlreadyExists;
        }
    }
    UserError::DatabaseError(e.to_string())
}

fn map_user_row(row: &PgRow) -> Result<User, UserError> {
    Ok(User {
        id: UserId(row.try_get("id").map_err(database_error)?),
        username: Username::new(row.try_get::<String, _>("username").map_err(database_error)?)?,
        email: EmailAddress::new(row.try_get::<String, _>("email").map_err(database_error)?)?,
        full_name: FullName::new(
            row.try_get::<String, _>("full_name").map_err(database_error)?,
        )?,
        password_hash: row.try_get("password_hash").map_err(database_error)?,
        avatar_url: row.try_get("avatar_url").map_err(database_error)?,
        cover_image_url: row.try_get("cover_image_url").map_err(database_error)?,
        refresh_token: row.try_get("refresh_token").map_err(database_error)?,
        created_at: row.try_get("created_at").map_err(database_error)?,
    })
}

const USER_COLUMNS: &str = "id, username, email, full_name, password_hash, \
     avatar_url, cover_image_url, refresh_token, created_at";

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: User) -> Result<User, UserError> {
        sqlx::query(
            r#"
            INSERT INTO users
                (id, username, email, full_name, password_hash,
                 avatar_url, cover_image_url, refresh_token, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.id.0)
        .bind(user.username.as_str())
        .bind(user.email.as_str())
        .bind(user.full_name.as_str())
        .bind(&user.password_hash)
        .bind(&user.avatar_url)
        .bind(user.cover_image_url.as_deref())
        .bind(user.refresh_token.as_deref())
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(unique_violation_or_database_error)?;

        Ok(user)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        row.as_ref().map(map_user_row).transpose()
    }

    async fn find_by_username_or_email<'a>(
        &'a self,
        username: Option<&'a str>,
        email: Option<&'a str>,
    ) -> Result<Option<User>, UserError> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE ($1::text IS NOT NULL AND username = $1)
               OR ($2::text IS NOT NULL AND email = $2)
            "#
        ))
        .bind(username)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        row.as_ref().map(map_user_row).transpose()
    }

    async fn set_refresh_token<'a>(
        &'a self,
        id: &'a UserId,
        refresh_token: Option<&'a str>,
    ) -> Result<(), UserError> {
        let result = sqlx::query("UPDATE users SET refresh_token = $2 WHERE id = $1")
            .bind(id.0)
            .bind(refresh_token)
            .execute(&self.pool)
            .await
            .map_err(database_error)?;

        if result.rows_affected() == 0 {
            return Err(UserError::NotFound(id.to_string()));
        }

        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        id: &UserId,
        current: &str,
        next: &str,
    ) -> Result<bool, UserError> {
        // Conditional swap: the update only lands while the slot still holds
        // `current`, so two racing rotations cannot both succeed.
        let result = sqlx::query(
            "UPDATE users SET refresh_token = $3 WHERE id = $1 AND refresh_token = $2",
        )
        .bind(id.0)
        .bind(current)
        .bind(next)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn set_password_hash(
        &self,
        id: &UserId,
        password_hash: &str,
    ) -> Result<(), UserError> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id.0)
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(database_error)?;

        if result.rows_affected() == 0 {
            return Err(UserError::NotFound(id.to_string()));
        }

        Ok(())
    }

    async fn update_account_details(
        &self,
        id: &UserId,
        full_name: &FullName,
        email: &EmailAddress,
    ) -> Result<User, UserError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE users SET full_name = $2, email = $3
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id.0)
        .bind(full_name.as_str())
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(unique_violation_or_database_error)?;

        match row {
            Some(row) => map_user_row(&row),
            None => Err(UserError::NotFound(id.to_string())),
        }
    }

    async fn set_avatar_url(&self, id: &UserId, url: &str) -> Result<User, UserError> {
        let row = sqlx::query(&format!(
            "UPDATE users SET avatar_url = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id.0)
        .bind(url)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        match row {
            Some(row) => map_user_row(&row),
            None => Err(UserError::NotFound(id.to_string())),
        }
    }

    async fn set_cover_image_url(&self, id: &UserId, url: &str) -> Result<User, UserError> {
        let row = sqlx::query(&format!(
            "UPDATE users SET cover_image_url = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id.0)
        .bind(url)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        match row {
            Some(row) => map_user_row(&row),
            None => Err(UserError::NotFound(id.to_string())),
        }
    }

    async fn channel_profile<'a>(
        &'a self,
        username: &'a Username,
        viewer: Option<&'a UserId>,
    ) -> Result<Option<ChannelProfile>, UserError> {
        // Two left joins against subscriptions: once with this user as the
        // channel (their subscribers) and once as the subscriber (channels
        // they follow). DISTINCT counts keep the joins from multiplying
        // each other.
        let row = sqlx::query(
            r#"
            SELECT u.full_name, u.username, u.email, u.avatar_url, u.cover_image_url,
                   COUNT(DISTINCT subs.subscriber_id) AS subscribers_count,
                   COUNT(DISTINCT follows.channel_id) AS channels_subscribed_to_count,
                   COALESCE(BOOL_OR(subs.subscriber_id = $2), FALSE) AS is_subscribed
            FROM users u
            LEFT JOIN subscriptions subs ON subs.channel_id = u.id
            LEFT JOIN subscriptions follows ON follows.subscriber_id = u.id
            WHERE u.username = $1
            GROUP BY u.id
            "#,
        )
        .bind(username.as_str())
        .bind(viewer.map(|v| v.0))
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(ChannelProfile {
            full_name: row.try_get("full_name").map_err(database_error)?,
            username: row.try_get("username").map_err(database_error)?,
            email: row.try_get("email").map_err(database_error)?,
            avatar_url: row.try_get("avatar_url").map_err(database_error)?,
            cover_image_url: row.try_get("cover_image_url").map_err(database_error)?,
            subscribers_count: row.try_get("subscribers_count").map_err(database_error)?,
            channels_subscribed_to_count: row
                .try_get("channels_subscribed_to_count")
                .map_err(database_error)?,
            is_subscribed: row.try_get("is_subscribed").map_err(database_error)?,
        }))
    }
}
