use crate::models::user::Claims;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand_core::OsRng;
use std::fmt;

/// Lifetime of an issued session token.
pub const TOKEN_TTL_SECS: i64 = 60 * 60;

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(password_hash.to_string())
}

/// Well-formed Argon2id hash with default parameters that no password matches.
/// Verifying against it costs the same as verifying a real user's hash.
pub const DUMMY_PASSWORD_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Verify a password against a hash
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(password_hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Why a bearer credential was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    MissingHeader,
    MalformedHeader,
    MalformedToken,
    InvalidSignature,
    Expired,
}

impl fmt::Display for TokenRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            TokenRejection::MissingHeader => "Authorization token required",
            TokenRejection::MalformedHeader => "Malformed authorization header",
            TokenRejection::MalformedToken => "Malformed token",
            TokenRejection::InvalidSignature => "Invalid token signature",
            TokenRejection::Expired => "Token expired",
        };
        f.write_str(reason)
    }
}

/// Checks the signature of `token` against `secret` and its expiry against `now`.
///
/// A token stops verifying at the instant its `exp` is reached.
pub fn verify_token(
    token: &str,
    secret: &[u8],
    now: DateTime<Utc>,
) -> Result<Claims, TokenRejection> {
    let mut validation = Validation::new(Algorithm::HS256);
    // Expiry is checked below against the caller's clock, without leeway.
    validation.validate_exp = false;
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature => TokenRejection::InvalidSignature,
            _ => TokenRejection::MalformedToken,
        })?;

    if now.timestamp() >= token_data.claims.exp {
        return Err(TokenRejection::Expired);
    }

    Ok(token_data.claims)
}

/// Issues and verifies session tokens with a server-held secret.
#[derive(Clone)]
pub struct TokenService {
    secret: Vec<u8>,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        TokenService {
            secret: secret.as_bytes().to_vec(),
            ttl: Duration::seconds(TOKEN_TTL_SECS),
        }
    }

    pub fn issue(&self, user_id: &str, now: DateTime<Utc>) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims {
            sub: user_id.to_owned(),
            exp: (now + self.ttl).timestamp(),
            iat: now.timestamp(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.secret),
        )
    }

    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenRejection> {
        verify_token(token, &self.secret, now)
    }
}
