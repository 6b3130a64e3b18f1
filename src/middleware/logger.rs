use std::time::Instant;

use async_trait::async_trait;
use tracing::info;

use super::{Middleware, Next};
use crate::request::Request;
use crate::response::Response;

/// Logs each request, then its status and latency.
#[derive(Clone, Copy, Debug, Default)]
pub struct Logger;

#[async_trait]
impl Middleware for Logger {
    async fn handle(&self, req: Request, next: Next<'_>) -> Response {
        let method = req.method().clone();
        let path = req.path().to_owned();
        info!("Request: {method} {path}");
        let started = Instant::now();
        let response = next.run(req).await;
        info!(
            status = response.status_code(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Response: {method} {path}"
        );
        response
    }
}
