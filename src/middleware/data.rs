use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use super::{Middleware, Next};
use crate::binder::parse_body;
use crate::request::Request;
use crate::response::Response;

/// Pre-parses POST bodies into [`Request::data`].
///
/// Bodies that cannot be parsed are left for the route's binder to reject.
#[derive(Clone, Copy, Debug, Default)]
pub struct DataParser;

#[async_trait]
impl Middleware for DataParser {
    async fn handle(&self, mut req: Request, next: Next<'_>) -> Response {
        if req.method() == http::Method::POST && req.content_type().is_some() {
            match parse_body(&req).await {
                Ok(map) => {
                    let data = Value::Object(map);
                    info!(data = %data, "request data");
                    req.data = Some(data);
                }
                Err(e) => warn!("request data not parsed: {e}"),
            }
        }
        next.run(req).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::middleware::Endpoint;

    struct Echo;

    #[async_trait]
    impl Endpoint for Echo {
        async fn call(&self, req: Request) -> Response {
            Response::text(req.data().map(Value::to_string).unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn json_body_is_exposed_as_data() {
        let req = Request::builder(http::Method::POST, "/")
            .header("content-type", "application/json")
            .body(r#"{"a":[1,2]}"#)
            .build();
        let chain: Vec<Arc<dyn Middleware>> = vec![Arc::new(DataParser)];
        let r = Next { rest: &chain, endpoint: &Echo }.run(req).await;
        assert_eq!(serde_json::from_slice::<Value>(r.body()).unwrap(), json!({"a": [1, 2]}));
    }
}
