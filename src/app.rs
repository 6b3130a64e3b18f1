//! The assembled application: middleware chain in front of the dispatcher.
//!
//! ```text
//! request → middleware… → static files | route lookup → binder → handler → coercion → response
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::error;

use crate::coerce::{Reply, coerce};
use crate::handler::HandlerError;
use crate::method::Method;
use crate::middleware::{Endpoint, Middleware, Next};
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::static_files::StaticFiles;
use crate::status::Status;
use crate::templates::Templates;

/// Router, shared state, middleware and collaborators.
pub struct App<S> {
    dispatcher: Dispatcher<S>,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl<S: Clone + Send + Sync + 'static> App<S> {
    pub fn new(router: Router<S>, state: S) -> Self {
        Self {
            dispatcher: Dispatcher { router, state, templates: None, statics: None },
            middleware: Vec::new(),
        }
    }

    /// Appends a middleware. The first one added sees the request first.
    pub fn layer(mut self, middleware: impl Middleware) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn templates(mut self, templates: impl Templates) -> Self {
        self.dispatcher.templates = Some(Arc::new(templates));
        self
    }

    pub fn statics(mut self, statics: StaticFiles) -> Self {
        self.dispatcher.statics = Some(statics);
        self
    }

    /// Runs one request through the whole pipeline.
    pub async fn handle(&self, req: Request) -> Response {
        Next { rest: &self.middleware, endpoint: &self.dispatcher }.run(req).await
    }
}

struct Dispatcher<S> {
    router: Router<S>,
    state: S,
    templates: Option<Arc<dyn Templates>>,
    statics: Option<StaticFiles>,
}

#[async_trait]
impl<S: Clone + Send + Sync + 'static> Endpoint for Dispatcher<S> {
    async fn call(&self, mut req: Request) -> Response {
        let Ok(method) = Method::try_from(req.method()) else {
            return Response::status(Status::MethodNotAllowed);
        };

        if method == Method::Get {
            if let Some(statics) = self.statics.as_ref().filter(|s| s.matches(req.path())) {
                return statics.serve(req.path()).await;
            }
        }

        let Some((endpoint, params)) = self.router.lookup(method, req.path()) else {
            return Response::status(Status::NotFound);
        };
        req.set_params(params);
        let user = req.user().cloned();

        let args = match endpoint.plan.bind(req).await {
            Ok(args) => args,
            Err(e) => {
                return Response::builder().status(Status::BadRequest).text(e.to_string());
            }
        };

        let reply = match endpoint.handler.call(self.state.clone(), args).await {
            Ok(reply) => reply,
            Err(HandlerError::Api(e)) => {
                Reply::Value(serde_json::to_value(&e).unwrap_or(Value::Null))
            }
            Err(HandlerError::Storage(e)) => {
                error!(handler = %endpoint.name, "storage error: {e}");
                return Response::status(Status::InternalServerError);
            }
        };
        coerce(reply, user.as_ref(), self.templates.as_deref())
    }
}
