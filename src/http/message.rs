//! HTTP message types
//!
//! This module defines the request and response values that flow through a
//! connection.

use super::{Cookie, CookieError, CookieList, Error, Headers, Result, Status, CRLF};
use bytes::Bytes;
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;
use url::Url;

/// Supported HTTP methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Convert method to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl FromStr for Method {
    type Err = Error;

    /// Method tokens are case-sensitive
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            _ => Err(Error::InvalidHttpMethod(s.to_string())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The target of a request line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestTarget {
    /// `*`, the server itself
    Asterisk,
    /// An absolute path with an optional query, e.g. `/search?q=rust`
    Origin { path: String, query: Option<String> },
    /// A full URI, e.g. `http://example.com/index.html`
    Absolute(Url),
}

impl RequestTarget {
    /// Parse a request-line target token
    pub fn parse(token: &str) -> Result<Self> {
        if token == "*" {
            return Ok(RequestTarget::Asterisk);
        }

        if token.is_empty() || token.chars().any(|c| c.is_ascii_control() || c == ' ') {
            return Err(Error::InvalidTargetUri(token.to_string()));
        }

        if token.starts_with('/') {
            let (path, query) = match token.split_once('?') {
                Some((path, query)) => (path, Some(query.to_string())),
                None => (token, None),
            };
            return Ok(RequestTarget::Origin {
                path: path.to_string(),
                query,
            });
        }

        Url::parse(token)
            .map(RequestTarget::Absolute)
            .map_err(|e| Error::InvalidTargetUri(format!("{}: {}", token, e)))
    }

    /// Resolve the canonical URI, taking authority from the `Host` header
    ///
    /// An absolute-form target keeps its own authority. `*` has no URI, and
    /// neither does an origin-form target without a `Host` header.
    pub fn resolve(&self, host: Option<&str>) -> Result<Option<Url>> {
        match (self, host) {
            (RequestTarget::Absolute(url), _) => Ok(Some(url.clone())),
            (RequestTarget::Origin { path, query }, Some(host)) => {
                if host.is_empty() || host.contains(['/', '?', '#', '@', ' ']) {
                    return Err(Error::InvalidTargetUri(format!("invalid host {:?}", host)));
                }

                let mut raw = format!("http://{}{}", host, path);
                if let Some(query) = query {
                    raw.push('?');
                    raw.push_str(query);
                }

                Url::parse(&raw)
                    .map(Some)
                    .map_err(|e| Error::InvalidTargetUri(format!("{}: {}", raw, e)))
            }
            _ => Ok(None),
        }
    }
}

impl fmt::Display for RequestTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestTarget::Asterisk => f.write_str("*"),
            RequestTarget::Origin { path, query: None } => f.write_str(path),
            RequestTarget::Origin {
                path,
                query: Some(query),
            } => write!(f, "{}?{}", path, query),
            RequestTarget::Absolute(url) => f.write_str(url.as_str()),
        }
    }
}

/// HTTP request
///
/// Created per connection and filled in stage by stage: request line and
/// headers first, then cookies, then the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    method: Method,
    target: RequestTarget,
    raw_target: String,
    version: String,
    headers: Headers,
    cookies: Option<CookieList>,
    uri: Option<Url>,
    body: Bytes,
}

impl HttpRequest {
    /// Create a request from a decoded request line
    pub fn new(method: Method, target: RequestTarget, version: impl Into<String>) -> Self {
        HttpRequest {
            method,
            raw_target: target.to_string(),
            target,
            version: version.into(),
            headers: Headers::new(),
            cookies: None,
            uri: None,
            body: Bytes::new(),
        }
    }

    /// Create a builder for constructing requests
    pub fn builder() -> HttpRequestBuilder {
        HttpRequestBuilder::default()
    }

    /// Get the request method
    pub fn method(&self) -> Method {
        self.method
    }

    /// Get the parsed request target
    pub fn target(&self) -> &RequestTarget {
        &self.target
    }

    /// Get the request target exactly as it appeared on the request line
    ///
    /// Prefer [`HttpRequest::uri`] wherever possible; this value is not
    /// sanitized.
    pub fn raw_target(&self) -> &str {
        &self.raw_target
    }

    pub(crate) fn set_raw_target(&mut self, raw: impl Into<String>) {
        self.raw_target = raw.into();
    }

    /// Get the HTTP version token, verbatim
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Get the headers
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Get mutable headers
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Get the canonical URI, with its host taken from the `Host` header
    pub fn uri(&self) -> Option<&Url> {
        self.uri.as_ref()
    }

    /// Recompute the canonical URI from the target and the `Host` header
    pub fn resolve_uri(&mut self) -> Result<()> {
        self.uri = self.target.resolve(self.headers.get("Host"))?;
        Ok(())
    }

    /// Decoded query parameters
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let query = match (&self.uri, &self.target) {
            (Some(uri), _) => uri.query(),
            (None, RequestTarget::Origin { query, .. }) => query.as_deref(),
            _ => None,
        };

        query
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Populate the cookie list from the `Cookie` headers
    ///
    /// Does nothing when no `Cookie` header is present. Malformed pairs are
    /// skipped and returned so the caller can report them.
    pub fn parse_cookies(&mut self) -> Vec<CookieError> {
        let values = self.headers.get_all("Cookie");
        if values.is_empty() {
            return Vec::new();
        }

        let (list, rejected) = CookieList::parse(values.iter().map(String::as_str));
        self.cookies = Some(list);
        rejected
    }

    /// Get the parsed cookies, if a `Cookie` header was present
    pub fn cookies(&self) -> Option<&CookieList> {
        self.cookies.as_ref()
    }

    /// Look up a single cookie by name
    pub fn cookie(&self, name: &str) -> Option<&Cookie> {
        self.cookies.as_ref()?.get(name)
    }

    /// Declared body length; an absent `Content-Length` means zero
    ///
    /// Repeated `Content-Length` values must all be identical.
    pub fn content_length(&self) -> Result<usize> {
        let values = self.headers.get_all("Content-Length");
        let raw = match values.split_first() {
            None => return Ok(0),
            Some((first, rest)) => {
                if rest.iter().any(|v| v != first) {
                    return Err(Error::InvalidContentLength(values.join(", ")));
                }
                first
            }
        };

        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidContentLength(raw.to_string()));
        }

        raw.parse::<usize>()
            .map_err(|_| Error::InvalidContentLength(raw.to_string()))
    }

    /// Get the body
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Get the body as UTF-8 text
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Set the body
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    /// Convert the request to wire format
    pub fn to_wire(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        // Request line
        buf.extend_from_slice(self.method.as_str().as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(self.raw_target.as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(self.version.as_bytes());
        buf.extend_from_slice(CRLF.as_bytes());

        buf.extend_from_slice(self.headers.to_string().as_bytes());
        buf.extend_from_slice(CRLF.as_bytes());
        buf.extend_from_slice(&self.body);

        buf
    }
}

/// Builder for HTTP requests
#[derive(Debug, Default)]
pub struct HttpRequestBuilder {
    method: Option<Method>,
    target: Option<String>,
    version: Option<String>,
    headers: Headers,
    body: Bytes,
}

impl HttpRequestBuilder {
    /// Set the HTTP method
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Set the request target
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Set the HTTP version
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Add a header
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the body
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Build the request, parsing the target and resolving its URI
    pub fn build(self) -> Result<HttpRequest> {
        let raw_target = self.target.unwrap_or_else(|| "/".to_string());
        let target = RequestTarget::parse(&raw_target)?;

        let mut request = HttpRequest::new(
            self.method.unwrap_or(Method::Get),
            target,
            self.version.unwrap_or_else(|| "HTTP/1.1".to_string()),
        );
        request.raw_target = raw_target;
        request.headers = self.headers;
        request.body = self.body;
        request.resolve_uri()?;

        Ok(request)
    }
}

/// HTTP response
///
/// Built once per request and treated as immutable once handed to the
/// encoder. `Content-Length` is never computed here; whoever sets a body
/// sets the header too.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    version: String,
    status: Status,
    reason: String,
    headers: Headers,
    body: Bytes,
}

impl HttpResponse {
    /// Create a new HTTP/1.1 response with the registered reason phrase
    pub fn new(status: Status) -> Self {
        HttpResponse {
            version: "HTTP/1.1".to_string(),
            status,
            reason: status.reason_phrase().to_string(),
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    /// Create a builder for constructing responses
    pub fn builder() -> HttpResponseBuilder {
        HttpResponseBuilder::default()
    }

    /// The reference response for a request
    ///
    /// `200 OK` for `GET`, `501 Not Implemented` for anything else, echoing
    /// the request's version, with a `Date` header and `Content-Length: 0`.
    pub fn for_request(request: &HttpRequest) -> Self {
        let status = match request.method() {
            Method::Get => Status::OK,
            _ => Status::NOT_IMPLEMENTED,
        };

        HttpResponse::builder()
            .version(request.version())
            .status(status)
            .header("Date", httpdate::fmt_http_date(SystemTime::now()))
            .header("Content-Length", "0")
            .build()
    }

    /// Get the HTTP version
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Get the status code
    pub fn status(&self) -> Status {
        self.status
    }

    /// Get the reason phrase
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Get the headers
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Get mutable headers
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Get the body
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Set the body
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    /// Validate a cookie and append it as a `Set-Cookie` header
    pub fn add_cookie(&mut self, cookie: &Cookie) -> std::result::Result<(), CookieError> {
        let value = cookie.to_set_cookie()?;
        self.headers.insert("Set-Cookie", value);
        Ok(())
    }

    /// Encode the status line and header block, blank line included
    pub fn head_to_wire(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        // Status line
        buf.extend_from_slice(self.version.as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(self.status.code().to_string().as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(self.reason.as_bytes());
        buf.extend_from_slice(CRLF.as_bytes());

        // Headers, in insertion order, one line per value
        buf.extend_from_slice(self.headers.to_string().as_bytes());

        buf.extend_from_slice(CRLF.as_bytes());
        buf
    }

    /// Convert the response to wire format
    pub fn to_wire(&self) -> Vec<u8> {
        let mut buf = self.head_to_wire();
        buf.extend_from_slice(&self.body);
        buf
    }
}

/// Builder for HTTP responses
#[derive(Debug, Default)]
pub struct HttpResponseBuilder {
    version: Option<String>,
    status: Option<Status>,
    reason: Option<String>,
    headers: Headers,
    body: Bytes,
}

impl HttpResponseBuilder {
    /// Set the HTTP version
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set the status code
    pub fn status(mut self, status: impl Into<Status>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Override the reason phrase
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Add a header
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the body
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Build the response
    pub fn build(self) -> HttpResponse {
        let status = self.status.unwrap_or(Status::OK);
        let reason = self
            .reason
            .unwrap_or_else(|| status.reason_phrase().to_string());
        HttpResponse {
            version: self.version.unwrap_or_else(|| "HTTP/1.1".to_string()),
            status,
            reason,
            headers: self.headers,
            body: self.body,
        }
    }
}
