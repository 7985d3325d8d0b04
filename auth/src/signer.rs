use chrono::Duration;

use crate::jwt::Claims;
use crate::jwt::JwtError;
use crate::jwt::JwtHandler;

/// Access/refresh token pair produced by a single issuance.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Signs and verifies access/refresh token pairs.
///
/// Access and refresh tokens use independent secrets, so a leaked access
/// secret never validates refresh tokens and vice versa. The caller owns
/// refresh-token persistence and rotation; this type is stateless.
pub struct TokenSigner {
    access: JwtHandler,
    refresh: JwtHandler,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenSigner {
    /// Create a signer from the two secrets and their token lifetimes.
    pub fn new(
        access_secret: &[u8],
        refresh_secret: &[u8],
        access_ttl_minutes: i64,
        refresh_ttl_days: i64,
    ) -> Self {
        Self {
            access: JwtHandler::new(access_secret),
            refresh: JwtHandler::new(refresh_secret),
            access_ttl: Duration::minutes(access_ttl_minutes),
            refresh_ttl: Duration::days(refresh_ttl_days),
        }
    }

    /// Sign a fresh access/refresh pair bound to the user identifier.
    ///
    /// # Errors
    /// * `EncodingFailed` - Either token failed to sign
    pub fn sign_pair(
        &self,
        user_id: impl ToString,
        username: &str,
    ) -> Result<TokenPair, JwtError> {
        let user_id = user_id.to_string();

        let access_claims =
            Claims::for_user(&user_id, self.access_ttl).with_username(username);
        let refresh_claims = Claims::for_user(&user_id, self.refresh_ttl);

        Ok(TokenPair {
            access_token: self.access.encode(&access_claims)?,
            refresh_token: self.refresh.encode(&refresh_claims)?,
        })
    }

    /// Validate an access token and return its claims.
    pub fn verify_access(&self, token: &str) -> Result<Claims, JwtError> {
        self.access.decode(token)
    }

    /// Validate a refresh token and return its claims.
    pub fn verify_refresh(&self, token: &str) -> Result<Claims, JwtError> {
        self.refresh.decode(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new(
            b"access_secret_at_least_32_bytes_ok!",
            b"refresh_secret_at_least_32_bytes_ok",
            15,
            10,
        )
    }

    #[test]
    fn test_sign_pair_binds_user_id() {
        let signer = signer();

        let pair = signer.sign_pair("user123", "alice").expect("sign failed");

        let access = signer
            .verify_access(&pair.access_token)
            .expect("access verify failed");
        assert_eq!(access.sub, "user123");
        assert_eq!(access.username.as_deref(), Some("alice"));

        let refresh = signer
            .verify_refresh(&pair.refresh_token)
            .expect("refresh verify failed");
        assert_eq!(refresh.sub, "user123");
    }

    #[test]
    fn test_secrets_are_not_interchangeable() {
        let signer = signer();

        let pair = signer.sign_pair("user123", "alice").expect("sign failed");

        // An access token must not validate as a refresh token.
        assert!(signer.verify_refresh(&pair.access_token).is_err());
        assert!(signer.verify_access(&pair.refresh_token).is_err());
    }

    #[test]
    fn test_refresh_outlives_access() {
        let signer = signer();
        let pair = signer.sign_pair("user123", "alice").expect("sign failed");

        let access = signer.verify_access(&pair.access_token).unwrap();
        let refresh = signer.verify_refresh(&pair.refresh_token).unwrap();
        assert!(refresh.exp > access.exp);
    }
}
