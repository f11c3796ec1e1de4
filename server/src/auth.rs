//! Identity tokens and the known-user directory
//!
//! A token is `<user_id>.<expires>.<signature>`, where `expires` is a unix
//! timestamp in seconds and `signature` is the hex HMAC-SHA256 of
//! `user_id.expires` keyed with the server secret. Login and issuance for real
//! users happen outside this server; [`TokenAuthenticator::issue`] exists for
//! tooling and tests.

use crate::error::AuthError;
use crate::utils::get_unix_seconds;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use shared::PlayerId;
use std::collections::HashMap;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// Lifetime of tokens minted without an explicit ttl
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Clone)]
pub struct TokenAuthenticator {
    /// Keyed with the secret, cloned for every signature
    mac: HmacSha256,
}

impl TokenAuthenticator {
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, AuthError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(AuthError::InvalidSecret);
        }
        let mac = HmacSha256::new_from_slice(secret).map_err(|_| AuthError::InvalidSecret)?;
        Ok(Self { mac })
    }

    fn keyed(&self, user_id: &str, expires: u64) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(user_id.as_bytes());
        mac.update(b".");
        mac.update(expires.to_string().as_bytes());
        mac
    }

    pub fn issue(&self, user_id: &str, ttl: Duration) -> String {
        self.issue_until(user_id, get_unix_seconds() + ttl.as_secs())
    }

    /// Mints a token that expires at the given unix second
    pub fn issue_until(&self, user_id: &str, expires: u64) -> String {
        let signature = hex::encode(self.keyed(user_id, expires).finalize().into_bytes());
        format!("{}.{}.{}", user_id, expires, signature)
    }

    /// Returns the user id carried by a valid, unexpired token
    pub fn verify(&self, token: &str) -> Result<PlayerId, AuthError> {
        // User ids may contain dots, so split from the right
        let mut parts = token.rsplitn(3, '.');
        let (Some(signature), Some(expires), Some(user_id)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::Malformed);
        };
        if user_id.is_empty() {
            return Err(AuthError::Malformed);
        }
        let expires: u64 = expires.parse().map_err(|_| AuthError::Malformed)?;

        let signature = hex::decode(signature).map_err(|_| AuthError::BadSignature)?;
        self.keyed(user_id, expires)
            .verify_slice(&signature)
            .map_err(|_| AuthError::BadSignature)?;
        if expires <= get_unix_seconds() {
            return Err(AuthError::Expired);
        }

        Ok(user_id.to_string())
    }
}

/// Users this server recognises, by id
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: HashMap<PlayerId, String>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, user_id: impl Into<PlayerId>, username: impl Into<String>) {
        self.users.insert(user_id.into(), username.into());
    }

    pub fn username(&self, user_id: &str) -> Option<&str> {
        self.users.get(user_id).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }
}

impl<I, S> FromIterator<(I, S)> for UserDirectory
where
    I: Into<PlayerId>,
    S: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (I, S)>>(iter: T) -> Self {
        let mut directory = UserDirectory::new();
        for (user_id, username) in iter {
            directory.insert(user_id, username);
        }
        directory
    }
}
