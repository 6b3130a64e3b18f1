//! Incoming HTTP request type.

use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde_json::Value;

/// The signed-in user attached to a request by the auth middleware.
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct SessionUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub admin: bool,
    pub image: String,
}

/// An incoming HTTP request with its body fully read.
pub struct Request {
    pub(crate) method: http::Method,
    pub(crate) path: String,
    pub(crate) query: String,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
    pub(crate) remote_addr: Option<SocketAddr>,
    pub(crate) user: Option<SessionUser>,
    pub(crate) data: Option<Value>,
}

impl Request {
    pub(crate) fn from_parts(
        parts: http::request::Parts,
        body: Bytes,
        remote_addr: Option<SocketAddr>,
    ) -> Self {
        Self {
            method: parts.method,
            path: parts.uri.path().to_owned(),
            query: parts.uri.query().unwrap_or_default().to_owned(),
            headers: parts.headers,
            body,
            params: HashMap::new(),
            remote_addr,
            user: None,
            data: None,
        }
    }

    /// Builds a request without a connection, for driving an
    /// [`App`](crate::App) directly.
    ///
    /// ```rust
    /// use weblog::Request;
    ///
    /// let req = Request::builder(http::Method::GET, "/api/blogs?page=2").build();
    /// assert_eq!(req.query(), "page=2");
    /// ```
    pub fn builder(method: http::Method, uri: &str) -> RequestBuilder {
        RequestBuilder { method, uri: uri.to_owned(), headers: HeaderMap::new(), body: Bytes::new() }
    }

    pub fn method(&self) -> &http::Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    /// Raw query string, without the leading `?`.
    pub fn query(&self) -> &str { &self.query }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &Bytes { &self.body }
    pub fn remote_addr(&self) -> Option<SocketAddr> { self.remote_addr }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The `Content-Type` header, if any and non-empty.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type").filter(|ct| !ct.trim().is_empty())
    }

    /// Value of the named cookie from the `Cookie` header.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.headers
            .get_all(http::header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v)
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/blogs/{id}`, `req.param("id")` on `/blogs/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn params(&self) -> &HashMap<String, String> { &self.params }

    pub fn user(&self) -> Option<&SessionUser> { self.user.as_ref() }

    pub fn set_user(&mut self, user: Option<SessionUser>) {
        self.user = user;
    }

    /// The body as pre-parsed by [`DataParser`](crate::middleware::DataParser).
    pub fn data(&self) -> Option<&Value> { self.data.as_ref() }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }
}

/// Builder returned by [`Request::builder`].
pub struct RequestBuilder {
    method: http::Method,
    uri: String,
    headers: HeaderMap,
    body: Bytes,
}

impl RequestBuilder {
    /// Adds a header. Invalid names or values are skipped.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(n), Ok(v)) = (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            self.headers.append(n, v);
        }
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn build(self) -> Request {
        let (path, query) = match self.uri.split_once('?') {
            Some((p, q)) => (p.to_owned(), q.to_owned()),
            None => (self.uri, String::new()),
        };
        Request {
            method: self.method,
            path,
            query,
            headers: self.headers,
            body: self.body,
            params: HashMap::new(),
            remote_addr: None,
            user: None,
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_lookup_splits_pairs() {
        let req = Request::builder(http::Method::GET, "/")
            .header("cookie", "a=1; awesession=abc-123; b=2")
            .build();
        assert_eq!(req.cookie("awesession"), Some("abc-123"));
        assert_eq!(req.cookie("missing"), None);
    }

    #[test]
    fn builder_splits_query() {
        let req = Request::builder(http::Method::GET, "/x?a=1&b=2").build();
        assert_eq!(req.path(), "/x");
        assert_eq!(req.query(), "a=1&b=2");
        assert_eq!(req.content_type(), None);
    }
}
