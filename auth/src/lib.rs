//! Authentication utilities library
//!
//! Provides reusable authentication infrastructure for account services:
//! - Password hashing (Argon2id)
//! - JWT token generation and validation
//! - Access/refresh token-pair signing with independent secrets
//!
//! The service defines its own ports and adapts these implementations, so
//! credential data stays a plain value and every capability here is a
//! stateless function over it.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("my_password").unwrap();
//! let is_valid = hasher.verify("my_password", &hash).unwrap();
//! assert!(is_valid);
//! ```
//!
//! ## Token Pairs
//! ```
//! use auth::TokenSigner;
//!
//! let signer = TokenSigner::new(
//!     b"access_secret_at_least_32_bytes_ok!",
//!     b"refresh_secret_at_least_32_bytes_ok",
//!     15,
//!     10,
//! );
//!
//! let pair = signer.sign_pair("user123", "alice").unwrap();
//! let claims = signer.verify_refresh(&pair.refresh_token).unwrap();
//! assert_eq!(claims.sub, "user123");
//! ```

pub mod jwt;
pub mod password;
pub mod signer;

// Re-export commonly used items
pub use jwt::Claims;
pub use jwt::JwtError;
pub use jwt::JwtHandler;
pub use password::PasswordError;
pub use password::PasswordHasher;
pub use signer::TokenPair;
pub use signer::TokenSigner;
