//! Signed session cookies.
//!
//! A cookie is `uid-expires-sha256(uid-passwd-expires-secret)`. It carries
//! no secret itself; checking it needs the user's stored password hash, so
//! changing a password invalidates every cookie issued before.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use super::models::User;
use crate::middleware::SessionStore;
use crate::orm::{Database, Schema};
use crate::request::SessionUser;

/// Lifetime of an issued cookie, in seconds.
pub const COOKIE_MAX_AGE: i64 = 86_400;

pub fn sha256_hex(input: &str) -> String {
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

/// Stored form of a password.
pub fn hash_password(uid: &str, passwd: &str) -> String {
    sha256_hex(&format!("{uid}:{passwd}"))
}

/// Cookie value for `user`, valid for `max_age` seconds from now.
pub fn user_to_cookie(user: &User, max_age: i64, secret: &str) -> String {
    sign(user, Utc::now().timestamp() + max_age, secret)
}

fn sign(user: &User, expires: i64, secret: &str) -> String {
    let digest = sha256_hex(&format!("{}-{}-{}-{}", user.id, user.passwd, expires, secret));
    format!("{}-{}-{}", user.id, expires, digest)
}

/// The parts of a well-formed, unexpired cookie.
fn parse(cookie: &str, now: i64) -> Option<(&str, i64, &str)> {
    let mut parts = cookie.split('-');
    let (uid, expires, digest) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() || uid.is_empty() {
        return None;
    }
    let expires: i64 = expires.parse().ok()?;
    (expires >= now).then_some((uid, expires, digest))
}

/// Verifies `cookie` against the user it names.
pub fn verify(cookie: &str, user: &User, secret: &str, now: i64) -> bool {
    match parse(cookie, now) {
        Some((uid, expires, _)) => uid == user.id && sign(user, expires, secret) == cookie,
        None => false,
    }
}

/// [`SessionStore`] backed by the `users` table.
pub struct CookieSessions {
    db: Database,
    users: Arc<Schema>,
    secret: String,
}

impl CookieSessions {
    pub fn new(db: Database, users: Arc<Schema>, secret: &str) -> Self {
        Self { db, users, secret: secret.to_owned() }
    }
}

#[async_trait]
impl SessionStore for CookieSessions {
    async fn user_from_cookie(&self, cookie: &str) -> Option<SessionUser> {
        let now = Utc::now().timestamp();
        let (uid, _, _) = parse(cookie, now)?;
        let record = match self.users.find(&self.db, uid).await {
            Ok(found) => found?,
            Err(e) => {
                warn!("session lookup failed: {e}");
                return None;
            }
        };
        let user: User = record.decode().ok()?;
        if !verify(cookie, &user, &self.secret, now) {
            info!("invalid sha256");
            return None;
        }
        Some(SessionUser {
            id: user.id,
            name: user.name,
            email: user.email,
            admin: user.admin,
            image: user.image,
        })
    }
}
