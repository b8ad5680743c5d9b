//! HTTP server side of a single connection
//!
//! This module reads the request header frame and the body off a session
//! and writes the response back.

use super::parser::{find_header_end, parse_request_head};
use super::{
    Error, HttpRequest, HttpResponse, HttpSession, Result, SessionOps, Status, HEADER_LIMIT_BYTES,
    HEADER_TERMINATOR,
};
use bytes::{Bytes, BytesMut};
use std::time::{Duration, SystemTime};

const READ_CHUNK: usize = 1024;
const BODY_CHUNK: usize = 4096;

/// HTTP server
///
/// Provides methods for receiving one request and sending its response.
pub struct HttpServer<S: SessionOps> {
    session: HttpSession<S>,
    buffer: BytesMut,
}

impl<S: SessionOps> HttpServer<S> {
    /// Create a new HTTP server with a session
    pub fn new(session: S) -> Self {
        HttpServer {
            session: HttpSession::new(session),
            buffer: BytesMut::with_capacity(HEADER_LIMIT_BYTES),
        }
    }

    /// Set the per-read timeout; `None` waits indefinitely
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.session.set_timeout(timeout);
    }

    /// Read and parse the request header frame
    ///
    /// Reads until `\r\n\r\n` shows up. End of stream and read timeouts stop
    /// the loop without error, which then ends in
    /// [`Error::IncompleteHeaders`]. Any other read failure is returned as
    /// is. Bytes received past the terminator stay buffered for
    /// [`HttpServer::read_body`].
    pub fn read_head(&mut self) -> Result<HttpRequest> {
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            let n = match self.session.read(&mut chunk) {
                Ok(0) | Err(Error::Timeout) => break,
                Ok(n) => n,
                Err(e) => return Err(e),
            };

            // Back off so a terminator split across reads is still found
            let searched = self.buffer.len().saturating_sub(HEADER_TERMINATOR.len() - 1);
            self.buffer.extend_from_slice(&chunk[..n]);

            if let Some(end) = find_header_end(&self.buffer, searched) {
                let frame_len = end + HEADER_TERMINATOR.len();
                if frame_len > HEADER_LIMIT_BYTES {
                    return Err(Error::HeaderLimitExceeded {
                        limit: HEADER_LIMIT_BYTES,
                    });
                }

                let frame = self.buffer.split_to(frame_len);
                return parse_request_head(&frame[..end]);
            }

            if self.buffer.len() > HEADER_LIMIT_BYTES {
                return Err(Error::HeaderLimitExceeded {
                    limit: HEADER_LIMIT_BYTES,
                });
            }
        }

        Err(Error::IncompleteHeaders)
    }

    /// Read exactly `Content-Length` bytes into the request body
    ///
    /// Bytes already buffered after the header frame count toward the body.
    /// Reads past the declared length are never made; a stream that ends
    /// early fails with [`Error::ConnectionClosed`].
    pub fn read_body(&mut self, request: &mut HttpRequest) -> Result<()> {
        let len = request.content_length()?;
        if len == 0 {
            request.set_body(Bytes::new());
            return Ok(());
        }

        let mut body = BytesMut::with_capacity(len.min(64 * 1024));
        let buffered = self.buffer.len().min(len);
        body.extend_from_slice(&self.buffer.split_to(buffered));

        let mut chunk = [0u8; BODY_CHUNK];
        while body.len() < len {
            let want = (len - body.len()).min(chunk.len());
            let n = self.session.read(&mut chunk[..want])?;
            if n == 0 {
                return Err(Error::ConnectionClosed);
            }
            body.extend_from_slice(&chunk[..n]);
        }

        request.set_body(body.freeze());
        Ok(())
    }

    /// Receive a complete request: header frame, cookies and body
    ///
    /// Malformed cookie pairs are skipped silently; use the individual
    /// stages to observe them.
    pub fn receive_request(&mut self) -> Result<HttpRequest> {
        let mut request = self.read_head()?;
        request.parse_cookies();
        self.read_body(&mut request)?;
        Ok(request)
    }

    /// Send an HTTP response
    pub fn send_response(&mut self, response: &HttpResponse) -> Result<()> {
        self.session.write_all(&response.to_wire())
    }

    /// Send a bodiless error response with the given status
    pub fn send_error(&mut self, status: Status) -> Result<()> {
        let response = HttpResponse::builder()
            .status(status)
            .header("Date", httpdate::fmt_http_date(SystemTime::now()))
            .header("Content-Length", "0")
            .build();

        self.send_response(&response)
    }

    /// Close the connection
    pub fn close(&mut self) -> Result<()> {
        self.session.close()
    }

    /// Number of received bytes not yet consumed by a parsed frame or body
    ///
    /// After [`Error::IncompleteHeaders`] this is everything the peer sent.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Get a reference to the underlying session
    pub fn session(&self) -> &HttpSession<S> {
        &self.session
    }
}
