//! Argument binding.
//!
//! Each route declares its handler's parameters up front as a [`Signature`].
//! Registration turns it into a [`BindingPlan`] once; every request is then
//! bound against that plan:
//!
//! 1. POST with keyword parameters: the body is parsed by content type
//!    (`application/json` object, form-urlencoded or multipart); anything
//!    else is a bad request.
//! 2. GET with keyword parameters: the query string, first value per key.
//! 3. Nothing parsed: path parameters are the whole argument set. Otherwise
//!    the parsed set is narrowed to the declared keywords (unless there is a
//!    catch-all) and path parameters are laid on top.
//! 4. `request` is injected when declared.
//! 5. Every required keyword must be present.

use std::convert::Infallible;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::error::{BadRequest, RouteError};
use crate::handler::Args;
use crate::request::Request;

/// Name of the parameter the request object is injected into.
pub const REQUEST_PARAM: &str = "request";

/// One declared handler parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Param {
    /// Positional-or-keyword parameter; only `request` carries meaning.
    Positional(String),
    /// Catch-all positional parameter.
    VarPositional(String),
    /// Keyword-only parameter; `required` when it has no default.
    Keyword { name: String, required: bool },
    /// Catch-all keyword parameter: every parsed key is passed through.
    VarKeyword(String),
}

/// The declared parameter list of a handler.
///
/// ```rust
/// use weblog::Signature;
///
/// // `{id}` from the path, the request itself, then a required `content`.
/// let sig = Signature::new().positional("id").request().keyword("content");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Signature {
    params: Vec<Param>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positional(mut self, name: &str) -> Self {
        self.params.push(Param::Positional(name.to_owned()));
        self
    }

    /// Declares the `request` parameter.
    pub fn request(self) -> Self {
        self.positional(REQUEST_PARAM)
    }

    pub fn var_positional(mut self, name: &str) -> Self {
        self.params.push(Param::VarPositional(name.to_owned()));
        self
    }

    /// Required keyword-only parameter.
    pub fn keyword(mut self, name: &str) -> Self {
        self.params.push(Param::Keyword { name: name.to_owned(), required: true });
        self
    }

    /// Keyword-only parameter with a default.
    pub fn optional(mut self, name: &str) -> Self {
        self.params.push(Param::Keyword { name: name.to_owned(), required: false });
        self
    }

    pub fn var_keyword(mut self, name: &str) -> Self {
        self.params.push(Param::VarKeyword(name.to_owned()));
        self
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub(crate) fn names(&self) -> Vec<&str> {
        self.params.iter()
            .map(|p| match p {
                Param::Positional(n) | Param::VarPositional(n) | Param::VarKeyword(n) => n.as_str(),
                Param::Keyword { name, .. } => name.as_str(),
            })
            .collect()
    }
}

/// What a route needs from each request, derived once from its [`Signature`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BindingPlan {
    pub has_request: bool,
    pub has_var_keyword: bool,
    pub named_keywords: Vec<String>,
    pub required_keywords: Vec<String>,
}

impl BindingPlan {
    /// Fails when `request` is followed by anything other than catch-all or
    /// keyword-only parameters.
    pub fn from_signature(handler: &str, sig: &Signature) -> Result<Self, RouteError> {
        let mut plan = Self::default();
        for param in sig.params() {
            if plan.has_request && matches!(param, Param::Positional(_)) {
                return Err(RouteError::InvalidHandlerSignature(handler.to_owned()));
            }
            match param {
                Param::Positional(name) if name == REQUEST_PARAM => plan.has_request = true,
                Param::Positional(_) | Param::VarPositional(_) => {}
                Param::Keyword { name, required } => {
                    plan.named_keywords.push(name.clone());
                    if *required {
                        plan.required_keywords.push(name.clone());
                    }
                }
                Param::VarKeyword(_) => plan.has_var_keyword = true,
            }
        }
        Ok(plan)
    }

    fn needs_keywords(&self) -> bool {
        self.has_var_keyword || !self.named_keywords.is_empty() || !self.required_keywords.is_empty()
    }

    /// Binds one request. Path parameters must already be set on `req`.
    pub async fn bind(&self, req: Request) -> Result<Args, BadRequest> {
        let mut parsed: Option<Map<String, Value>> = None;

        if self.needs_keywords() {
            if req.method() == http::Method::POST {
                parsed = Some(parse_body(&req).await?);
            }
            if req.method() == http::Method::GET && !req.query().is_empty() {
                parsed = Some(parse_query(req.query()));
            }
        }

        let values = match parsed {
            None => path_values(&req),
            Some(mut kw) => {
                if !self.has_var_keyword && !self.named_keywords.is_empty() {
                    kw.retain(|k, _| self.named_keywords.iter().any(|n| n == k));
                }
                for (k, v) in req.params() {
                    if kw.contains_key(k) {
                        warn!(arg = %k, "duplicate arg name in named arg and kw args");
                    }
                    kw.insert(k.clone(), Value::String(v.clone()));
                }
                kw
            }
        };

        let request = if self.has_request { Some(Arc::new(req)) } else { None };

        if let Some(missing) = self.required_keywords.iter().find(|n| !values.contains_key(*n)) {
            return Err(BadRequest::MissingArgument(missing.clone()));
        }

        let shown = Value::Object(values.clone());
        info!(args = %shown, "call with args");
        Ok(Args { values, request })
    }
}

fn path_values(req: &Request) -> Map<String, Value> {
    req.params()
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect()
}

/// `key → first value`, blank values kept.
pub(crate) fn parse_query(qs: &str) -> Map<String, Value> {
    first_values(serde_urlencoded::from_str::<Vec<(String, String)>>(qs).unwrap_or_default())
}

fn first_values(pairs: Vec<(String, String)>) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.entry(k).or_insert(Value::String(v));
    }
    map
}

pub(crate) async fn parse_body(req: &Request) -> Result<Map<String, Value>, BadRequest> {
    let content_type = req.content_type().ok_or(BadRequest::MissingContentType)?;
    let ct = content_type.to_ascii_lowercase();

    if ct.starts_with("application/json") {
        return match serde_json::from_slice::<Value>(req.body()) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(BadRequest::JsonNotObject),
            Err(e) => Err(BadRequest::MalformedBody(e.to_string())),
        };
    }
    if ct.starts_with("application/x-www-form-urlencoded") {
        return serde_urlencoded::from_bytes::<Vec<(String, String)>>(req.body())
            .map(first_values)
            .map_err(|e| BadRequest::MalformedBody(e.to_string()));
    }
    if ct.starts_with("multipart/form-data") {
        return parse_multipart(content_type, req.body().clone()).await;
    }
    Err(BadRequest::UnsupportedContentType(content_type.to_owned()))
}

async fn parse_multipart(content_type: &str, body: bytes::Bytes) -> Result<Map<String, Value>, BadRequest> {
    let malformed = |e: multer::Error| BadRequest::MalformedBody(e.to_string());
    let boundary = multer::parse_boundary(content_type).map_err(malformed)?;
    let stream = futures::stream::once(async move { Ok::<_, Infallible>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut pairs = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_owned();
        let text = field.text().await.map_err(malformed)?;
        pairs.push((name, text));
    }
    Ok(first_values(pairs))
}
