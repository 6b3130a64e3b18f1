//! Template rendering collaborator.
//!
//! The coercion step only needs [`Templates::render`]. [`TemplateDir`] loads
//! jinja-style templates from a directory through `minijinja`.

use std::path::Path;

use chrono::{DateTime, Utc};
use minijinja::Environment;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
#[error("template: {0}")]
pub struct TemplateError(String);

impl From<minijinja::Error> for TemplateError {
    fn from(e: minijinja::Error) -> Self {
        Self(e.to_string())
    }
}

/// Renders a named template against a context object.
pub trait Templates: Send + Sync + 'static {
    fn render(&self, name: &str, context: &Value) -> Result<String, TemplateError>;
}

/// Templates loaded from a directory, with a `datetime` filter registered.
pub struct TemplateDir {
    env: Environment<'static>,
}

impl TemplateDir {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        info!(path = %path.display(), "set template path");
        let mut env = Environment::new();
        env.set_loader(minijinja::path_loader(path));
        env.add_filter("datetime", datetime_filter);
        Self { env }
    }
}

impl Templates for TemplateDir {
    fn render(&self, name: &str, context: &Value) -> Result<String, TemplateError> {
        Ok(self.env.get_template(name)?.render(context)?)
    }
}

/// Relative age of a UNIX timestamp, falling back to a calendar date after a week.
fn datetime_filter(t: f64) -> String {
    relative_time(t, Utc::now().timestamp() as f64)
}

fn relative_time(t: f64, now: f64) -> String {
    let delta = (now - t) as i64;
    match delta {
        d if d < 60 => "1 minute ago".to_owned(),
        d if d < 3600 => format!("{} minutes ago", d / 60),
        d if d < 86400 => format!("{} hours ago", d / 3600),
        d if d < 604_800 => format!("{} days ago", d / 86400),
        _ => DateTime::<Utc>::from_timestamp(t as i64, 0)
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
    }
}
