//! Static file collaborator: a directory served under a URL prefix.

use std::path::{Component, Path, PathBuf};

use tracing::info;

use crate::response::Response;
use crate::status::Status;

/// Files under `dir`, served at `prefix`.
#[derive(Clone, Debug)]
pub struct StaticFiles {
    prefix: String,
    dir: PathBuf,
}

impl StaticFiles {
    pub fn new(prefix: &str, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        info!(prefix, dir = %dir.display(), "add static");
        Self { prefix: prefix.to_owned(), dir }
    }

    pub(crate) fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }

    /// Reads the file for `path`. `404` for missing files and for any path
    /// that tries to leave the directory.
    pub(crate) async fn serve(&self, path: &str) -> Response {
        let Some(file) = self.resolve(path) else {
            return Response::status(Status::NotFound);
        };
        match tokio::fs::read(&file).await {
            Ok(body) => Response::builder().raw(content_type(&file), body),
            Err(_) => Response::status(Status::NotFound),
        }
    }

    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path.strip_prefix(&self.prefix)?);
        if relative.as_os_str().is_empty()
            || relative.components().any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.dir.join(relative))
    }
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).unwrap_or_default() {
        "css"          => "text/css",
        "js"           => "application/javascript",
        "html" | "htm" => "text/html;charset=utf-8",
        "json"         => "application/json",
        "png"          => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif"          => "image/gif",
        "svg"          => "image/svg+xml",
        "ico"          => "image/x-icon",
        "woff"         => "font/woff",
        "woff2"        => "font/woff2",
        "txt"          => "text/plain;charset=utf-8",
        _              => "application/octet-stream",
    }
}
