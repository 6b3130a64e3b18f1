//! Route declarations and the radix-tree registry.
//!
//! One tree per HTTP method, O(path-length) lookup. A [`Route`] carries its
//! method and path, its handler and the handler's [`Signature`]; the binding
//! plan is derived from the signature when the route is registered.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use matchit::Router as MatchitRouter;
use tracing::info;

use crate::binder::{BindingPlan, Signature};
use crate::error::RouteError;
use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;

/// A handler annotated with its method, path and parameters.
///
/// ```rust
/// use weblog::{get, Args, HandlerResult, Signature};
///
/// async fn api_blogs(_state: (), args: Args) -> HandlerResult {
///     Ok(format!("page {}", args.int("page").unwrap_or(1)).into())
/// }
///
/// let route = get("/api/blogs", api_blogs)
///     .named("api_blogs")
///     .signature(Signature::new().optional("page"));
/// ```
pub struct Route<S> {
    name: String,
    method: Option<Method>,
    path: Option<String>,
    signature: Signature,
    handler: BoxedHandler<S>,
}

impl<S> Route<S> {
    /// A route with no method or path yet.
    pub fn new(handler: impl Handler<S>) -> Self {
        Self {
            name: std::any::type_name_of_val(&handler)
                .rsplit("::")
                .next()
                .unwrap_or_default()
                .to_owned(),
            method: None,
            path: None,
            signature: Signature::new(),
            handler: handler.into_boxed_handler(),
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn path(mut self, path: &str) -> Self {
        self.path = Some(path.to_owned());
        self
    }

    /// Name used in logs and errors. Defaults to the handler's type name.
    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_owned();
        self
    }

    pub fn signature(mut self, signature: Signature) -> Self {
        self.signature = signature;
        self
    }
}

impl<S> fmt::Debug for Route<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("signature", &self.signature)
            .finish()
    }
}

/// `GET path` route.
pub fn get<S>(path: &str, handler: impl Handler<S>) -> Route<S> {
    Route::new(handler).method(Method::Get).path(path)
}

/// `POST path` route.
pub fn post<S>(path: &str, handler: impl Handler<S>) -> Route<S> {
    Route::new(handler).method(Method::Post).path(path)
}

/// A registered route: handler plus its precomputed binding plan.
pub(crate) struct Endpoint<S> {
    pub(crate) name: String,
    pub(crate) plan: BindingPlan,
    pub(crate) handler: BoxedHandler<S>,
}

/// The application router.
///
/// Build it once at startup and hand it to [`App::new`](crate::App::new).
pub struct Router<S> {
    routes: HashMap<Method, MatchitRouter<Arc<Endpoint<S>>>>,
}

impl<S> Router<S> {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Registers one route. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax.
    pub fn route(mut self, route: Route<S>) -> Result<Self, RouteError> {
        self.add_route(route)?;
        Ok(self)
    }

    /// Registers every route in `routes`.
    pub fn routes(mut self, routes: impl IntoIterator<Item = Route<S>>) -> Result<Self, RouteError> {
        for route in routes {
            self.add_route(route)?;
        }
        Ok(self)
    }

    fn add_route(&mut self, route: Route<S>) -> Result<(), RouteError> {
        let Route { name, method, path, signature, handler } = route;
        let (Some(method), Some(path)) = (method, path) else {
            return Err(RouteError::MissingMetadata(name));
        };
        let plan = BindingPlan::from_signature(&name, &signature)?;
        info!(
            method = %method,
            path = %path,
            "add route {method} {path} => {name}({})",
            signature.names().join(", ")
        );
        let endpoint = Arc::new(Endpoint { name, plan, handler });
        self.routes
            .entry(method)
            .or_default()
            .insert(path.clone(), endpoint)
            .map_err(|source| RouteError::InvalidPath { path, source })
    }

    pub(crate) fn lookup(
        &self,
        method: Method,
        path: &str,
    ) -> Option<(Arc<Endpoint<S>>, HashMap<String, String>)> {
        let tree = self.routes.get(&method)?;
        let matched = tree.at(path).ok()?;
        let endpoint = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), decode_segment(v)))
            .collect();
        Some((endpoint, params))
    }
}

impl<S> Default for Router<S> {
    fn default() -> Self { Self::new() }
}

impl<S> fmt::Debug for Router<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<_> = self.routes.keys().collect();
        methods.sort_by_key(|m| m.to_string());
        f.debug_struct("Router").field("methods", &methods).finish()
    }
}

/// Percent-decodes a matched segment. Invalid UTF-8 keeps the raw text.
fn decode_segment(raw: &str) -> String {
    urlencoding::decode(raw).map(Cow::into_owned).unwrap_or_else(|_| raw.to_owned())
}
