//! # Authentication
//!
//! Password hashing (argon2, PHC strings) and HS256 bearer tokens.
//!
//! A token is `base64url(header).base64url(claims).base64url(signature)`
//! where the signature is HMAC-SHA256 over the first two parts. Signatures
//! are compared in constant time.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use rand::RngCore;
use rand::rngs::OsRng;
use schoolhub_core::Role;
use schoolhub_core::users::User;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("Malformed token")]
    Malformed,
    #[error("Invalid token signature")]
    BadSignature,
    #[error("Token expired")]
    Expired,
    #[error("token signing failed: {0}")]
    Signing(String),
}

// =============================================================================
// PASSWORDS
// =============================================================================

pub fn hash_password(plain: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

/// `false` for a wrong password and for a hash that does not parse.
pub fn verify_password(plain: &str, phc: &str) -> bool {
    PasswordHash::new(phc)
        .map(|parsed| {
            Argon2::default()
                .verify_password(plain.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

// =============================================================================
// TOKENS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Username.
    pub sub: String,
    pub uid: u64,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and checks bearer tokens with one shared secret.
#[derive(Clone)]
pub struct TokenKeys {
    secret: Vec<u8>,
    ttl_secs: i64,
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

impl TokenKeys {
    pub fn new(secret: impl Into<Vec<u8>>, ttl_hours: u32) -> Self {
        Self {
            secret: secret.into(),
            ttl_secs: i64::from(ttl_hours) * 3600,
        }
    }

    /// Keys with a random 32-byte secret. Tokens die with the process.
    pub fn ephemeral(ttl_hours: u32) -> Self {
        let mut secret = vec![0u8; 32];
        OsRng.fill_bytes(&mut secret);
        Self::new(secret, ttl_hours)
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, AuthError> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.secret)
            .map_err(|e| AuthError::Signing(e.to_string()))?;
        mac.update(message);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    pub fn issue(&self, user: &User, now: i64) -> Result<String, AuthError> {
        let claims = Claims {
            sub: user.username.clone(),
            uid: user.id,
            role: user.role,
            iat: now,
            exp: now.saturating_add(self.ttl_secs),
        };
        let payload =
            serde_json::to_vec(&claims).map_err(|e| AuthError::Signing(e.to_string()))?;
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(HEADER),
            URL_SAFE_NO_PAD.encode(payload)
        );
        let signature = URL_SAFE_NO_PAD.encode(self.sign(signing_input.as_bytes())?);
        Ok(format!("{signing_input}.{signature}"))
    }

    pub fn verify(&self, token: &str, now: i64) -> Result<Claims, AuthError> {
        let mut parts = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::Malformed);
        };
        let given = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AuthError::Malformed)?;
        let expected = self.sign(format!("{header}.{payload}").as_bytes())?;
        if !bool::from(expected.ct_eq(&given)) {
            return Err(AuthError::BadSignature);
        }
        let bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| AuthError::Malformed)?;
        let claims: Claims = serde_json::from_slice(&bytes).map_err(|_| AuthError::Malformed)?;
        if claims.exp <= now {
            return Err(AuthError::Expired);
        }
        Ok(claims)
    }
}

// =============================================================================
// TESTS
// =============================================================================
