//! Connection lifecycle
//!
//! A [`Connection`] owns one accepted transport and drives it through a
//! single request:
//!
//! ```text
//! AwaitingHeaders -> HeadersParsed -> CookiesParsed -> BodyRead -> ResponseSent -> Closed
//!        \________________\________________\______________\______________> Failed
//! ```
//!
//! There is no way back to an earlier state. Whatever the outcome, the
//! transport is closed before [`Connection::run`] returns.

use super::{Error, HttpRequest, HttpResponse, HttpServer, Result, SessionOps};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Application logic producing a response for a complete request
pub trait Handler {
    fn handle(&self, request: &HttpRequest) -> HttpResponse;
}

impl<F> Handler for F
where
    F: Fn(&HttpRequest) -> HttpResponse,
{
    fn handle(&self, request: &HttpRequest) -> HttpResponse {
        self(request)
    }
}

/// Answers every request with [`HttpResponse::for_request`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHandler;

impl Handler for DefaultHandler {
    fn handle(&self, request: &HttpRequest) -> HttpResponse {
        HttpResponse::for_request(request)
    }
}

/// Stage a connection has reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConnectionState {
    AwaitingHeaders,
    HeadersParsed,
    CookiesParsed,
    BodyRead,
    ResponseSent,
    Closed,
    Failed,
}

impl ConnectionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Failed)
    }
}

/// One accepted connection, handling exactly one request
pub struct Connection<S: SessionOps> {
    server: HttpServer<S>,
    state: ConnectionState,
    peer: Option<SocketAddr>,
    reject_malformed: bool,
}

impl<S: SessionOps> Connection<S> {
    /// Wrap a session; `timeout` bounds every individual read
    pub fn new(session: S, timeout: Option<Duration>) -> Self {
        let mut server = HttpServer::new(session);
        server.set_timeout(timeout);

        Connection {
            server,
            state: ConnectionState::AwaitingHeaders,
            peer: None,
            reject_malformed: false,
        }
    }

    /// Record the peer address for log output
    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    /// Answer malformed requests with 400/431 before closing
    ///
    /// Off by default: a malformed request is closed without a response.
    pub fn reject_malformed(mut self, reject: bool) -> Self {
        self.reject_malformed = reject;
        self
    }

    /// Current state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    fn transition(&mut self, next: ConnectionState) {
        debug_assert!(next > self.state, "{:?} -> {:?}", self.state, next);
        debug!(peer = ?self.peer, from = ?self.state, to = ?next, "connection state");
        self.state = next;
    }

    fn process<H: Handler + ?Sized>(&mut self, handler: &H) -> Result<()> {
        let mut request = self.server.read_head()?;
        self.transition(ConnectionState::HeadersParsed);

        for rejected in request.parse_cookies() {
            warn!(peer = ?self.peer, error = %rejected, "skipping malformed cookie");
        }
        self.transition(ConnectionState::CookiesParsed);

        self.server.read_body(&mut request)?;
        self.transition(ConnectionState::BodyRead);

        let response = handler.handle(&request);
        self.server.send_response(&response)?;
        self.transition(ConnectionState::ResponseSent);

        info!(
            peer = ?self.peer,
            method = %request.method(),
            target = request.raw_target(),
            status = response.status().code(),
            "request served"
        );
        Ok(())
    }

    fn fail(&mut self, error: &Error) {
        warn!(peer = ?self.peer, state = ?self.state, %error, "request failed");

        // A peer that never sent a byte has no request to reject
        let idle = matches!(error, Error::IncompleteHeaders) && self.server.buffered() == 0;

        if self.reject_malformed && !idle {
            if let Some(status) = error.status() {
                if let Err(e) = self.server.send_error(status) {
                    debug!(peer = ?self.peer, error = %e, "could not send error response");
                }
            }
        }

        self.state = ConnectionState::Failed;
    }

    /// Serve the single request and close the transport
    ///
    /// Returns the terminal state: [`ConnectionState::Closed`] after a
    /// response was written, [`ConnectionState::Failed`] otherwise.
    pub fn run<H: Handler + ?Sized>(mut self, handler: &H) -> ConnectionState {
        if let Err(e) = self.process(handler) {
            self.fail(&e);
        }

        if let Err(e) = self.server.close() {
            debug!(peer = ?self.peer, error = %e, "error while closing connection");
        }

        if self.state == ConnectionState::ResponseSent {
            self.transition(ConnectionState::Closed);
        }

        self.state
    }
}
