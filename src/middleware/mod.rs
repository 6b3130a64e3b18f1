//! Middleware layer.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns. Layers run in registration order; each one
//! decides whether to call [`Next::run`] or answer on its own.
//!
//! Built-in middleware:
//! - [`Logger`] — logs method and path, then status and latency
//! - [`Auth`] — resolves the session cookie to a user and gates the admin prefix
//! - [`DataParser`] — pre-parses JSON and form bodies into [`Request::data`]

use std::sync::Arc;

use async_trait::async_trait;

use crate::request::Request;
use crate::response::Response;

mod auth;
mod data;
mod logger;

pub use auth::{Auth, SessionStore};
pub use data::DataParser;
pub use logger::Logger;

/// A request/response interceptor.
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    async fn handle(&self, req: Request, next: Next<'_>) -> Response;
}

/// The innermost stage of the chain: routing, binding, the handler and
/// response coercion.
#[async_trait]
pub(crate) trait Endpoint: Send + Sync {
    async fn call(&self, req: Request) -> Response;
}

/// The remainder of the chain after the current middleware.
pub struct Next<'a> {
    pub(crate) rest: &'a [Arc<dyn Middleware>],
    pub(crate) endpoint: &'a dyn Endpoint,
}

impl Next<'_> {
    pub async fn run(self, req: Request) -> Response {
        match self.rest.split_first() {
            Some((first, rest)) => {
                first.handle(req, Next { rest, endpoint: self.endpoint }).await
            }
            None => self.endpoint.call(req).await,
        }
    }
}
