//! HTTP status codes the framework itself produces.
//!
//! Handlers are free to answer with any code in `100..600` by returning a
//! bare integer; [`Status`] names the ones the pipeline emits on its own.
//!
//! ```rust
//! use weblog::{Response, Status};
//!
//! Response::status(Status::NotFound);
//! ```

/// Status codes used by the dispatch pipeline.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    Ok,                  // 200
    Found,               // 302
    BadRequest,          // 400
    Forbidden,           // 403
    NotFound,            // 404
    MethodNotAllowed,    // 405
    InternalServerError, // 500
}

impl From<Status> for u16 {
    fn from(s: Status) -> u16 {
        match s {
            Status::Ok                  => 200,
            Status::Found               => 302,
            Status::BadRequest          => 400,
            Status::Forbidden           => 403,
            Status::NotFound            => 404,
            Status::MethodNotAllowed    => 405,
            Status::InternalServerError => 500,
        }
    }
}
