//! Error types.
//!
//! Client mistakes ([`BadRequest`]) and handler domain failures
//! ([`ApiError`](crate::ApiError)) are turned into HTTP responses by the
//! dispatch pipeline. Everything here that is not one of those surfaces an
//! infrastructure or startup failure.

use thiserror::Error;

/// Server infrastructure failure: binding to a port or accepting a connection.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// A record type was declared with an unusable set of fields.
///
/// Raised once, when the schema is defined at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("duplicate primary key for field `{field}` in table `{table}`")]
    DuplicatePrimaryKey { table: String, field: String },
    #[error("primary key not found in table `{table}`")]
    MissingPrimaryKey { table: String },
}

/// Storage and record-mapping failures.
#[derive(Debug, Error)]
pub enum OrmError {
    /// The connection pool could not be created. Fatal at startup.
    #[error("pool init: {0}")]
    PoolInit(String),
    /// A statement failed. Any open transaction has already been rolled back.
    #[error("storage: {0}")]
    Storage(#[from] sqlx::Error),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("`{table}` record has no attribute `{field}`")]
    AttributeMissing { table: String, field: String },
    #[error("decode: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Route registration failures. Raised while building the router.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("method or path not defined for handler `{0}`")]
    MissingMetadata(String),
    #[error("request parameter must be the last named parameter in handler `{0}`")]
    InvalidHandlerSignature(String),
    #[error("invalid route `{path}`: {source}")]
    InvalidPath {
        path: String,
        #[source]
        source: matchit::InsertError,
    },
}

/// The request could not be bound to the handler's parameters.
///
/// Answered with `400 Bad Request` and the message as body.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BadRequest {
    #[error("Missing Content-Type.")]
    MissingContentType,
    #[error("Unsupported Content-Type: {0}")]
    UnsupportedContentType(String),
    #[error("JSON body must be object.")]
    JsonNotObject,
    #[error("Malformed body: {0}")]
    MalformedBody(String),
    #[error("Missing argument: {0}")]
    MissingArgument(String),
}

/// Startup configuration could not be read.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}
