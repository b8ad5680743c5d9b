//! HTTP message head parsing
//!
//! This module decodes complete header frames. Accumulating the frame off
//! the wire is the job of [`super::HttpServer`].

use super::{
    Error, Headers, HttpRequest, Method, RequestTarget, Result, Status, CRLF, HEADER_TERMINATOR,
};

/// Find the start of the `\r\n\r\n` header terminator
///
/// Scanning starts at `from`, so callers accumulating a buffer can skip the
/// bytes already searched (back off by three to catch a split terminator).
pub fn find_header_end(buf: &[u8], from: usize) -> Option<usize> {
    buf.get(from..)?
        .windows(HEADER_TERMINATOR.len())
        .position(|w| w == HEADER_TERMINATOR)
        .map(|pos| pos + from)
}

/// Parse HTTP request line
///
/// Format: METHOD SP TARGET SP VERSION
/// Example: GET /index.html HTTP/1.1
///
/// Tokens are separated by single spaces; surrounding spaces are trimmed.
/// The version token is returned verbatim.
pub fn parse_request_line(line: &str) -> Result<(Method, RequestTarget, &str, &str)> {
    let parts: Vec<&str> = line.trim_matches(' ').split(' ').collect();

    if parts.len() != 3 {
        return Err(Error::InvalidRequestLine(line.to_string()));
    }

    let method = parts[0].parse::<Method>()?;
    let target = RequestTarget::parse(parts[1])?;

    Ok((method, target, parts[1], parts[2]))
}

/// Parse a request header frame
///
/// `head` holds everything before the `\r\n\r\n` terminator. The first line
/// is the request line, the rest is the header block. The canonical URI is
/// resolved against the `Host` header.
pub fn parse_request_head(head: &[u8]) -> Result<HttpRequest> {
    let head = String::from_utf8_lossy(head);
    let (line, block) = head.split_once(CRLF).unwrap_or((&*head, ""));

    let (method, target, raw_target, version) = parse_request_line(line)?;

    let mut request = HttpRequest::new(method, target, version);
    request.set_raw_target(raw_target);
    *request.headers_mut() = Headers::parse_block(block);
    request.resolve_uri()?;

    Ok(request)
}

/// Parse HTTP response status line
///
/// Format: VERSION SP STATUS SP REASON
/// Example: HTTP/1.1 200 OK
///
/// The reason phrase may be empty.
pub fn parse_status_line(line: &str) -> Result<(&str, Status, &str)> {
    let mut parts = line.splitn(3, ' ');

    let version = parts.next().filter(|v| !v.is_empty());
    let code = parts.next();
    let (version, code) = version
        .zip(code)
        .ok_or_else(|| Error::InvalidStatusLine(line.to_string()))?;

    let code = code
        .parse::<u16>()
        .ok()
        .filter(|c| (100..1000).contains(c))
        .ok_or_else(|| Error::InvalidStatusLine(line.to_string()))?;

    Ok((version, Status::new(code), parts.next().unwrap_or("")))
}

/// Decoded status line and headers of a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub version: String,
    pub status: Status,
    pub reason: String,
    pub headers: Headers,
}

/// Parse a response head from wire bytes
///
/// Returns the decoded head and the offset of the first body byte.
pub fn parse_response_head(buf: &[u8]) -> Result<(ResponseHead, usize)> {
    let end = find_header_end(buf, 0).ok_or(Error::IncompleteHeaders)?;
    let head = String::from_utf8_lossy(&buf[..end]);
    let (line, block) = head.split_once(CRLF).unwrap_or((&*head, ""));

    let (version, status, reason) = parse_status_line(line)?;

    let head = ResponseHead {
        version: version.to_string(),
        status,
        reason: reason.to_string(),
        headers: Headers::parse_block(block),
    };

    Ok((head, end + HEADER_TERMINATOR.len()))
}
