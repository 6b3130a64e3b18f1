//! Handler return values and their mapping onto wire responses.
//!
//! A handler returns a [`Reply`]. The shape of the reply, checked in this
//! order, decides the response:
//!
//! | Reply | Response |
//! |---|---|
//! | a built [`Response`] | passed through unchanged |
//! | bytes | `application/octet-stream` body |
//! | string starting with `redirect:` | `302` to the rest of the string |
//! | any other string | `text/html;charset=utf-8` body |
//! | object with a `__template__` name | rendered template, `__user__` injected |
//! | object without one | `application/json;charset=utf-8` body |
//! | integer in `100..600` | bare status |
//! | pair `(status in 100..600, message)` | status with the message as body |
//! | anything else | stringified, `text/plain;charset=utf-8` |
//!
//! An out-of-range pair is shown the way a tuple prints: `(700, 'nope')`.
//!
//! Informational codes (`100..200`) are accepted as final statuses, but
//! hyper does not send a 1xx as a final response and answers `500` on the
//! wire instead.

use serde_json::{Map, Value};
use tracing::error;

use crate::request::SessionUser;
use crate::response::{ContentType, Response};
use crate::status::Status;
use crate::templates::Templates;

/// Prefix marking a string reply as a redirect target.
pub const REDIRECT_PREFIX: &str = "redirect:";

/// Context key naming the template to render.
pub const TEMPLATE_KEY: &str = "__template__";

/// Context key the current user is injected under.
pub const USER_KEY: &str = "__user__";

/// What a handler hands back.
#[derive(Debug)]
pub enum Reply {
    Response(Response),
    Bytes(Vec<u8>),
    Value(Value),
    Pair(Value, Value),
}

impl From<Response> for Reply {
    fn from(r: Response) -> Self { Self::Response(r) }
}

impl From<Vec<u8>> for Reply {
    fn from(b: Vec<u8>) -> Self { Self::Bytes(b) }
}

impl From<bytes::Bytes> for Reply {
    fn from(b: bytes::Bytes) -> Self { Self::Bytes(b.to_vec()) }
}

impl From<Value> for Reply {
    fn from(v: Value) -> Self { Self::Value(v) }
}

impl From<Map<String, Value>> for Reply {
    fn from(m: Map<String, Value>) -> Self { Self::Value(Value::Object(m)) }
}

impl From<&str> for Reply {
    fn from(s: &str) -> Self { Self::Value(Value::from(s)) }
}

impl From<String> for Reply {
    fn from(s: String) -> Self { Self::Value(Value::String(s)) }
}

impl From<i32> for Reply {
    fn from(n: i32) -> Self { Self::Value(Value::from(n)) }
}

impl From<i64> for Reply {
    fn from(n: i64) -> Self { Self::Value(Value::from(n)) }
}

impl From<u16> for Reply {
    fn from(n: u16) -> Self { Self::Value(Value::from(n)) }
}

impl From<Status> for Reply {
    fn from(s: Status) -> Self { Self::Value(Value::from(u16::from(s))) }
}

impl<C: Into<Value>, M: Into<Value>> From<(C, M)> for Reply {
    fn from((code, message): (C, M)) -> Self { Self::Pair(code.into(), message.into()) }
}

fn status_in_range(v: &Value) -> Option<u16> {
    v.as_i64()
        .filter(|n| (100..600).contains(n))
        .and_then(|n| u16::try_from(n).ok())
}

fn display(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Literal form of a value: quoted strings, `True`/`False`, `None`.
fn repr(v: &Value) -> String {
    match v {
        Value::Null => "None".to_owned(),
        Value::Bool(true) => "True".to_owned(),
        Value::Bool(false) => "False".to_owned(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        Value::Array(items) => {
            let items: Vec<_> = items.iter().map(repr).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(map) => {
            let items: Vec<_> = map.iter().map(|(k, v)| format!("{}: {}", quote(k), repr(v))).collect();
            format!("{{{}}}", items.join(", "))
        }
    }
}

/// Single quotes unless the text holds a `'` and no `"`.
fn quote(s: &str) -> String {
    if s.contains('\'') && !s.contains('"') {
        return format!("\"{}\"", s.replace('\\', "\\\\"));
    }
    let escaped = s.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

/// Maps a reply onto a response.
pub fn coerce(reply: Reply, user: Option<&SessionUser>, templates: Option<&dyn Templates>) -> Response {
    match reply {
        Reply::Response(r) => r,
        Reply::Bytes(b) => Response::builder().bytes(ContentType::OctetStream, b),
        Reply::Value(Value::String(s)) => match s.strip_prefix(REDIRECT_PREFIX) {
            Some(location) => Response::redirect(location),
            None => Response::html(s),
        },
        Reply::Value(Value::Object(map)) => coerce_object(map, user, templates),
        Reply::Value(v) => match status_in_range(&v) {
            Some(code) => Response::status(code),
            None => Response::text(display(&v)),
        },
        Reply::Pair(code, message) => match status_in_range(&code) {
            Some(code) => Response::builder()
                .status(code)
                .bytes(ContentType::Text, display(&message).into_bytes()),
            None => Response::text(format!("({}, {})", repr(&code), repr(&message))),
        },
    }
}

fn coerce_object(
    mut map: Map<String, Value>,
    user: Option<&SessionUser>,
    templates: Option<&dyn Templates>,
) -> Response {
    let template = match map.get(TEMPLATE_KEY) {
        Some(Value::String(name)) => Some(name.clone()),
        _ => None,
    };

    let Some(name) = template else {
        map.remove(TEMPLATE_KEY);
        return match serde_json::to_vec(&map) {
            Ok(body) => Response::json(body),
            Err(e) => {
                error!("json encode failed: {e}");
                Response::status(Status::InternalServerError)
            }
        };
    };

    let user = user.and_then(|u| serde_json::to_value(u).ok()).unwrap_or(Value::Null);
    map.insert(USER_KEY.to_owned(), user);

    let Some(templates) = templates else {
        error!(template = %name, "no template engine configured");
        return Response::status(Status::InternalServerError);
    };
    match templates.render(&name, &Value::Object(map)) {
        Ok(html) => Response::html(html),
        Err(e) => {
            error!(template = %name, "render failed: {e}");
            Response::status(Status::InternalServerError)
        }
    }
}
