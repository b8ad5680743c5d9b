//! HTTP/1.1 wire protocol for httpwire
//!
//! This module turns a byte stream into an [`HttpRequest`] and an
//! [`HttpResponse`] back into bytes, without any external HTTP stack.
//!
//! # Architecture
//!
//! Each accepted connection flows through the same single-pass pipeline:
//!
//! - `server::HttpServer` pulls bytes until the `\r\n\r\n` header terminator
//!   (or a timeout, EOF or the 8192 byte ceiling) and reads the body
//! - `parser` decodes the request line and the header block
//! - `headers::Headers` stores values under canonical header names
//! - `cookie` turns `Cookie` headers into a per-request [`CookieList`]
//! - `message::HttpResponse::to_wire` encodes the response
//! - `connection::Connection` sequences the stages and always closes the
//!   transport, on success and on failure
//!
//! # Examples
//!
//! ```no_run
//! use httpwire::http::{Connection, DefaultHandler};
//! use httpwire::http::session::FdSessionOps;
//! use std::net::TcpListener;
//! use std::time::Duration;
//!
//! let listener = TcpListener::bind("127.0.0.1:8811").unwrap();
//! let (stream, _) = listener.accept().unwrap();
//!
//! let conn = Connection::new(FdSessionOps::new(stream), Some(Duration::from_secs(4)));
//! conn.run(&DefaultHandler);
//! ```

pub mod connection;
pub mod cookie;
pub mod headers;
pub mod message;
pub mod parser;
pub mod server;
pub mod session;
pub mod status;

pub use connection::{Connection, ConnectionState, DefaultHandler, Handler};
pub use cookie::{Cookie, CookieError, CookieList, SameSite};
pub use headers::Headers;
pub use message::{HttpRequest, HttpResponse, Method, RequestTarget};
pub use parser::{parse_request_head, parse_response_head, ResponseHead};
pub use server::HttpServer;
pub use session::{HttpSession, SessionOps};
pub use status::Status;

/// Result type for HTTP operations
pub type Result<T> = std::result::Result<T, Error>;

/// HTTP operation errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("incomplete headers")]
    IncompleteHeaders,

    #[error("size of headers exceeds the limit of {limit} bytes")]
    HeaderLimitExceeded { limit: usize },

    #[error("invalid request line: {0}")]
    InvalidRequestLine(String),

    #[error("invalid http method: {0}")]
    InvalidHttpMethod(String),

    #[error("invalid request target: {0}")]
    InvalidTargetUri(String),

    #[error("content length is invalid: {0}")]
    InvalidContentLength(String),

    #[error("invalid status line: {0}")]
    InvalidStatusLine(String),

    #[error(transparent)]
    Cookie(#[from] CookieError),

    #[error("Timeout")]
    Timeout,

    #[error("Connection closed")]
    ConnectionClosed,
}

impl Error {
    /// Whether the peer sent bytes that do not form a valid request
    ///
    /// Transport failures (I/O, timeouts, early close) are not malformed
    /// requests: there is nobody reliable left to answer.
    pub fn is_malformed_request(&self) -> bool {
        matches!(
            self,
            Error::IncompleteHeaders
                | Error::HeaderLimitExceeded { .. }
                | Error::InvalidRequestLine(_)
                | Error::InvalidHttpMethod(_)
                | Error::InvalidTargetUri(_)
                | Error::InvalidContentLength(_)
                | Error::InvalidStatusLine(_)
                | Error::Cookie(_)
        )
    }

    /// Status a strict server answers a malformed request with
    pub fn status(&self) -> Option<Status> {
        match self {
            Error::HeaderLimitExceeded { .. } => Some(Status::REQUEST_HEADER_FIELDS_TOO_LARGE),
            e if e.is_malformed_request() => Some(Status::BAD_REQUEST),
            _ => None,
        }
    }
}

/// Maximum size of a request header block, terminator included
pub const HEADER_LIMIT_BYTES: usize = 8192;

/// CRLF line ending
pub const CRLF: &str = "\r\n";

/// Blank line terminating a header block
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";
