/// Session tokens and signed cookie values
///
/// Session tokens are 32 random bytes, hex encoded. The value placed in the
/// session cookie is the token followed by a hex HMAC-SHA256 tag:
///
/// ```text
/// <64 hex chars token>.<64 hex chars HMAC-SHA256(secret, token)>
/// ```
///
/// The tag only proves the value was minted by this server; the session row
/// in the database remains the source of truth for validity and expiry.

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Random bytes per session token
pub const SESSION_TOKEN_BYTES: usize = 32;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    /// Value lacks the `token.signature` shape
    #[error("Malformed signed token")]
    Malformed,

    /// Signature doesn't match the token
    #[error("Invalid token signature")]
    BadSignature,

    /// Secret can't key the MAC
    #[error("Invalid signing secret")]
    InvalidSecret,
}

/// Generates a new opaque session token
pub fn generate_session_token() -> String {
    random_hex(SESSION_TOKEN_BYTES)
}

/// Generates a verification token
pub fn generate_verification_token() -> String {
    random_hex(SESSION_TOKEN_BYTES)
}

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn mac(secret: &str) -> Result<HmacSha256, TokenError> {
    HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| TokenError::InvalidSecret)
}

/// Produces the signed cookie value for a session token
pub fn sign_token(token: &str, secret: &str) -> Result<String, TokenError> {
    let mut mac = mac(secret)?;
    mac.update(token.as_bytes());
    let tag = hex::encode(mac.finalize().into_bytes());

    Ok(format!("{}.{}", token, tag))
}

/// Checks a signed cookie value and returns the bare session token
///
/// The tag comparison is constant-time.
pub fn verify_signed_token(value: &str, secret: &str) -> Result<String, TokenError> {
    let (token, tag) = value.rsplit_once('.').ok_or(TokenError::Malformed)?;
    if token.is_empty() {
        return Err(TokenError::Malformed);
    }

    let tag = hex::decode(tag).map_err(|_| TokenError::Malformed)?;

    let mut mac = mac(secret)?;
    mac.update(token.as_bytes());
    mac.verify_slice(&tag).map_err(|_| TokenError::BadSignature)?;

    Ok(token.to_string())
}
