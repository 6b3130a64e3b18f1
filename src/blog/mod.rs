//! The blog served by the framework: users, posts and comments behind a
//! signed session cookie.

pub mod handlers;
pub mod models;
pub mod page;
pub mod session;

use std::path::Path;
use std::sync::Arc;

use crate::app::App;
use crate::error::RouteError;
use crate::middleware::{Auth, DataParser, Logger};
use crate::orm::Database;
use crate::router::Router;
use crate::static_files::StaticFiles;
use crate::templates::TemplateDir;

pub use handlers::routes;
pub use models::{Models, User, next_id};
pub use page::Page;
pub use session::CookieSessions;

/// Shared state handed to every blog handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub models: Models,
    pub secret: String,
    pub cookie_name: String,
}

/// The blog's router with the logger, auth and body-parser middleware in
/// front. Templates and static files are attached by [`app`].
pub fn service(state: AppState) -> Result<App<AppState>, RouteError> {
    let router = Router::new().routes(routes())?;
    let sessions = CookieSessions::new(state.db.clone(), Arc::clone(&state.models.users), &state.secret);
    let cookie_name = state.cookie_name.clone();
    Ok(App::new(router, state)
        .layer(Logger)
        .layer(Auth::new(Arc::new(sessions), &cookie_name))
        .layer(DataParser))
}

/// [`service`] plus templates and `/static/` files.
pub fn app(
    state: AppState,
    template_dir: impl AsRef<Path>,
    static_dir: impl AsRef<Path>,
) -> Result<App<AppState>, RouteError> {
    Ok(service(state)?
        .templates(TemplateDir::new(template_dir))
        .statics(StaticFiles::new("/static/", static_dir.as_ref())))
}
