//! # weblog
//!
//! A minimal async web framework and micro-ORM, and the blog they serve.
//!
//! ## The pipeline
//!
//! ```text
//! request → middleware chain → argument binder → handler → coercion → response
//! ```
//!
//! - Routes are `GET`/`POST` plus a path with `{named}` segments. Each route
//!   declares its handler's parameters as a [`Signature`]; the binding plan
//!   is derived once, at registration.
//! - Handlers return a [`Reply`]: a string, an object, a status, a
//!   `(status, message)` pair, bytes, or a ready [`Response`].
//! - The [`orm`] maps declared fields to a table and generates the SQL.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use serde_json::json;
//! use weblog::{get, post, App, Args, HandlerResult, Router, Server, Signature};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let router = Router::new()
//!         .route(get("/hello/{name}", hello).signature(Signature::new().positional("name")))?
//!         .route(post("/echo", echo).signature(Signature::new().keyword("text")))?;
//!
//!     Server::bind("127.0.0.1:9000".parse()?).serve(App::new(router, ())).await?;
//!     Ok(())
//! }
//!
//! async fn hello(_: (), args: Args) -> HandlerResult {
//!     Ok(format!("<h1>hello, {}</h1>", args.str("name").unwrap_or("world")).into())
//! }
//!
//! async fn echo(_: (), args: Args) -> HandlerResult {
//!     Ok(json!({ "text": args.get("text") }).into())
//! }
//! ```

mod app;
mod binder;
mod coerce;
mod error;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;
mod static_files;
mod status;

pub mod blog;
pub mod config;
pub mod middleware;
pub mod orm;
pub mod templates;

pub use app::App;
pub use binder::{BindingPlan, Param, Signature};
pub use coerce::{REDIRECT_PREFIX, Reply, TEMPLATE_KEY, USER_KEY, coerce};
pub use error::{BadRequest, ConfigError, Error, OrmError, RouteError, SchemaError};
pub use handler::{ApiError, Args, Handler, HandlerError, HandlerResult};
pub use method::Method;
pub use request::{Request, RequestBuilder, SessionUser};
pub use response::{ContentType, Response, ResponseBuilder};
pub use router::{Route, Router, get, post};
pub use server::Server;
pub use static_files::StaticFiles;
pub use status::Status;
