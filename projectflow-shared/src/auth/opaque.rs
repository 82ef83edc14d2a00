/// Opaque token generation and hashing
///
/// Refresh and verification tokens are random strings with no embedded
/// meaning. The client gets the plaintext once; the store only ever sees
/// its SHA-256 digest.
///
/// # Format
///
/// `{prefix}{32 base62 chars}`, e.g. `pfr_Q2x...` (36 chars total)
/// - `pfr_`: refresh token
/// - `pfv_`: email verification token
///
/// # Example
///
/// ```
/// use projectflow_shared::auth::opaque::{generate_token, hash_token, validate_format, TokenKind};
///
/// let (token, hash) = generate_token(TokenKind::Refresh);
/// assert!(token.starts_with("pfr_"));
/// assert!(validate_format(TokenKind::Refresh, &token));
/// assert!(!validate_format(TokenKind::Verification, &token));
/// assert_eq!(hash_token(&token), hash);
/// ```

use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of the random part of a token (characters)
const TOKEN_RANDOM_LENGTH: usize = 32;

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Purpose of an opaque token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Refresh,
    Verification,
}

impl TokenKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            TokenKind::Refresh => "pfr_",
            TokenKind::Verification => "pfv_",
        }
    }

    /// Total length of a token of this kind
    pub fn token_len(&self) -> usize {
        self.prefix().len() + TOKEN_RANDOM_LENGTH
    }
}

/// Generates a new token of the given kind
///
/// # Returns
///
/// Tuple of (plaintext_token, sha256_hex)
pub fn generate_token(kind: TokenKind) -> (String, String) {
    let mut rng = rand::thread_rng();
    let random_part: String = (0..TOKEN_RANDOM_LENGTH)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();

    let token = format!("{}{}", kind.prefix(), random_part);
    let hash = hash_token(&token);

    (token, hash)
}

/// Hex-encoded SHA-256 digest of a token (64 characters)
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Checks that `token` looks like a token of `kind`
///
/// Lets callers reject garbage without a store round-trip.
pub fn validate_format(kind: TokenKind, token: &str) -> bool {
    token.len() == kind.token_len()
        && token
            .strip_prefix(kind.prefix())
            .is_some_and(|rest| rest.bytes().all(|b| b.is_ascii_alphanumeric()))
}
