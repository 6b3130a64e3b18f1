//! Handler trait, bound arguments and type erasure.
//!
//! # How async handlers are stored
//!
//! The router holds handlers of different concrete types in one tree per
//! method, so each is hidden behind a trait object:
//!
//! ```text
//! async fn api_blogs(state: AppState, args: Args) -> HandlerResult   ← user writes this
//!        ↓ get("/api/blogs", api_blogs)
//! api_blogs.into_boxed_handler()                ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(api_blogs))                 ← stored as BoxedHandler<S>
//!        ↓
//! handler.call(state.clone(), args)  per request ← one vtable dispatch
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::coerce::Reply;
use crate::error::OrmError;
use crate::request::{Request, SessionUser};

// ── Arguments ─────────────────────────────────────────────────────────────────

/// Arguments bound from the request according to the route's
/// [`Signature`](crate::Signature).
#[derive(Default)]
pub struct Args {
    pub(crate) values: Map<String, Value>,
    pub(crate) request: Option<Arc<Request>>,
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args")
            .field("values", &self.values)
            .field("request", &self.request.as_ref().map(|r| r.path()))
            .finish()
    }
}

impl Args {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// String argument. Numbers and booleans from JSON bodies are not coerced.
    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Required string argument, trimmed; empty counts as missing.
    pub fn require(&self, name: &str) -> Result<&str, ApiError> {
        self.str(name)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::invalid(name, ""))
    }

    /// Integer argument, accepting JSON numbers and numeric strings.
    pub fn int(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// The request, when the route's signature declares a `request` parameter.
    pub fn request(&self) -> Option<&Request> {
        self.request.as_deref()
    }

    pub fn user(&self) -> Option<&SessionUser> {
        self.request().and_then(Request::user)
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// A domain failure raised on purpose by a handler.
///
/// Converted into a JSON payload `{"error", "data", "message"}` instead of a
/// transport failure.
#[derive(Clone, Debug, Error, PartialEq, Serialize)]
#[error("{error}: {data} {message}")]
pub struct ApiError {
    pub error: String,
    pub data: String,
    pub message: String,
}

impl ApiError {
    pub fn new(error: &str, data: &str, message: &str) -> Self {
        Self { error: error.to_owned(), data: data.to_owned(), message: message.to_owned() }
    }

    /// `value:invalid` for an input field.
    pub fn invalid(field: &str, message: &str) -> Self {
        Self::new("value:invalid", field, message)
    }

    /// `value:notfound` for a missing resource.
    pub fn not_found(field: &str, message: &str) -> Self {
        Self::new("value:notfound", field, message)
    }

    /// `permission:forbidden`.
    pub fn permission(message: &str) -> Self {
        Self::new("permission:forbidden", "permission", message)
    }
}

/// What a handler can fail with.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Storage(#[from] OrmError),
}

pub type HandlerResult = Result<Reply, HandlerError>;

// ── Internal types ────────────────────────────────────────────────────────────

pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send + 'static>>;

/// Internal dispatch interface.
#[doc(hidden)]
pub trait ErasedHandler<S> {
    fn call(&self, state: S, args: Args) -> BoxFuture;
}

#[doc(hidden)]
pub type BoxedHandler<S> = Arc<dyn ErasedHandler<S> + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// Satisfied automatically by any `async fn` of the shape
///
/// ```text
/// async fn name(state: S, args: Args) -> HandlerResult
/// ```
///
/// The trait is sealed: only the blanket impl below can satisfy it.
pub trait Handler<S>: private::Sealed<S> + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler<S>;
}

mod private {
    pub trait Sealed<S> {}
}

impl<F, Fut, S> private::Sealed<S> for F
where
    F: Fn(S, Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
}

impl<F, Fut, S> Handler<S> for F
where
    F: Fn(S, Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler<S> {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Bridges a concrete handler `F` to the [`ErasedHandler`] trait object.
struct FnHandler<F>(F);

impl<F, Fut, S> ErasedHandler<S> for FnHandler<F>
where
    F: Fn(S, Args) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, state: S, args: Args) -> BoxFuture {
        Box::pin((self.0)(state, args))
    }
}
