//! Identity: tokens, passwords, and the shared trust decision

pub mod password;
pub mod token;

use thiserror::Error;

pub use password::{hash_password, verify_password, PasswordError};
pub use token::{Claims, TokenCodec, TokenError};

use crate::store::{CredentialStore, StoreError};

/// Why an identity could not be established
#[derive(Debug, Error)]
pub enum AuthFailure {
    #[error("Authentication required")]
    Missing,

    #[error("Token expired")]
    Expired,

    /// Bad signature, malformed token, or a token for a user that no longer exists
    #[error("Invalid token")]
    Invalid,

    #[error("Credential lookup failed: {0}")]
    Store(#[from] StoreError),
}

impl From<TokenError> for AuthFailure {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthFailure::Expired,
            TokenError::Invalid | TokenError::Issue(_) => AuthFailure::Invalid,
        }
    }
}

/// Verify a token and confirm its user still exists, returning the username.
///
/// Both the socket handshake and the HTTP guard go through here.
pub async fn verify_identity(
    codec: &TokenCodec,
    credentials: &dyn CredentialStore,
    token: Option<&str>,
) -> Result<String, AuthFailure> {
    let token = token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthFailure::Missing)?;

    let claims = codec.verify(token)?;

    match credentials.find_by_username(&claims.username).await? {
        Some(user) => Ok(user.username),
        None => Err(AuthFailure::Invalid),
    }
}
