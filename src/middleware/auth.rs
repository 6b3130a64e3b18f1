use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{Middleware, Next};
use crate::request::{Request, SessionUser};
use crate::response::Response;

/// Decodes a session cookie into the user it was issued to.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    async fn user_from_cookie(&self, cookie: &str) -> Option<SessionUser>;
}

/// Attaches the signed-in user to each request and keeps non-admins out of
/// the admin prefix.
pub struct Auth {
    sessions: Arc<dyn SessionStore>,
    cookie_name: String,
    admin_prefix: String,
    signin_path: String,
}

impl Auth {
    /// Gates `/manage/`, redirecting to `/signin`.
    pub fn new(sessions: Arc<dyn SessionStore>, cookie_name: &str) -> Self {
        Self {
            sessions,
            cookie_name: cookie_name.to_owned(),
            admin_prefix: "/manage/".to_owned(),
            signin_path: "/signin".to_owned(),
        }
    }

    pub fn admin_prefix(mut self, prefix: &str) -> Self {
        self.admin_prefix = prefix.to_owned();
        self
    }

    pub fn signin_path(mut self, path: &str) -> Self {
        self.signin_path = path.to_owned();
        self
    }
}

#[async_trait]
impl Middleware for Auth {
    async fn handle(&self, mut req: Request, next: Next<'_>) -> Response {
        info!("check user: {} {}", req.method(), req.path());
        let user = match req.cookie(&self.cookie_name) {
            Some(cookie) => self.sessions.user_from_cookie(cookie).await,
            None => None,
        };
        if let Some(u) = &user {
            info!(email = %u.email, "set current user");
        }
        req.set_user(user);

        let is_admin = req.user().is_some_and(|u| u.admin);
        if req.path().starts_with(&self.admin_prefix) && !is_admin {
            return Response::redirect(&self.signin_path);
        }
        next.run(req).await
    }
}
