//! RFC 6265 cookies
//!
//! Request cookies are parsed leniently: each `name=value` pair of a
//! `Cookie` header is handled on its own, and a malformed pair is reported
//! without affecting its neighbours. Validation is strict and runs when a
//! cookie is built for emission in a `Set-Cookie` header.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

/// Name prefix that requires the `Secure` attribute
pub const SECURE_PREFIX: &str = "__Secure-";

const NAME_SEPARATORS: &str = "()<>@,;:\\\"/[]?={}";
const VALUE_SEPARATORS: &str = "(),/\\?@:;\"=";

/// Cookie errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CookieError {
    #[error("cookie format is invalid: {0:?}")]
    InvalidFormat(String),

    #[error("invalid cookie name: {0:?}")]
    InvalidName(String),

    #[error("invalid cookie value: {0:?}")]
    InvalidValue(String),

    #[error("invalid cookie domain: {0:?}")]
    InvalidDomain(String),

    #[error("invalid cookie path: {0:?}")]
    InvalidPath(String),

    #[error("invalid cookie same-site attribute: {0:?}")]
    InvalidSameSite(String),

    #[error("secure flag required when SameSite=None")]
    SecureRequiredForSameSiteNone,

    #[error("secure flag required for {0:?}")]
    SecureRequiredForPrefix(String),

    #[error("invalid cookie expiration: {0:?}")]
    InvalidExpires(String),

    #[error("invalid cookie max-age: {0:?}")]
    InvalidMaxAge(String),
}

/// SameSite attribute of a cookie
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SameSite {
    #[default]
    Default,
    Lax,
    Strict,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Default => "Default",
            SameSite::Lax => "Lax",
            SameSite::Strict => "Strict",
            SameSite::None => "None",
        }
    }
}

impl FromStr for SameSite {
    type Err = CookieError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Ok(SameSite::Default),
            "lax" => Ok(SameSite::Lax),
            "strict" => Ok(SameSite::Strict),
            "none" => Ok(SameSite::None),
            _ => Err(CookieError::InvalidSameSite(s.to_string())),
        }
    }
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP cookie
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub expires: Option<SystemTime>,
    pub raw_expires: Option<String>,
    pub max_age: Option<i64>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
    /// The text this cookie was parsed from
    pub raw: String,
    /// Attribute pairs that were not recognised
    pub unparsed: Vec<String>,
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && !name
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || NAME_SEPARATORS.contains(c))
}

fn is_valid_value(value: &str) -> bool {
    !value
        .chars()
        .any(|c| c <= ' ' || c > '~' || VALUE_SEPARATORS.contains(c))
}

fn is_valid_domain(domain: &str) -> bool {
    let domain = domain.strip_prefix('.').unwrap_or(domain);
    let bytes = domain.as_bytes();

    if bytes.len() < 3 || domain.contains("..") {
        return false;
    }

    let inner_ok = bytes[1..bytes.len() - 1]
        .iter()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'));

    bytes[0].is_ascii_alphanumeric() && bytes[bytes.len() - 1].is_ascii_alphanumeric() && inner_ok
}

fn is_valid_path(path: &str) -> bool {
    path.starts_with('/') && !path.chars().any(|c| c <= ' ' || c > '~' || c == ';')
}

fn unquote(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

impl Cookie {
    /// Create a cookie with the given name and value
    ///
    /// A name carrying the `__Secure-` prefix starts out secure.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let secure = name.starts_with(SECURE_PREFIX);
        Cookie {
            name,
            value: value.into(),
            secure,
            ..Default::default()
        }
    }

    /// Parse a single `name=value` pair from a `Cookie` request header
    ///
    /// The pair is split on the first `=`; surrounding whitespace and a
    /// pair of enclosing double quotes around the value are removed.
    pub fn parse_request_pair(pair: &str) -> Result<Self, CookieError> {
        let raw = pair.trim();
        let (name, value) = raw
            .split_once('=')
            .ok_or_else(|| CookieError::InvalidFormat(raw.to_string()))?;

        let mut cookie = Cookie::new(name.trim(), unquote(value.trim()));
        cookie.raw = raw.to_string();
        Ok(cookie)
    }

    /// Parse a `Set-Cookie` header value with its attributes
    pub fn parse_set_cookie(line: &str) -> Result<Self, CookieError> {
        let mut parts = line.split(';');
        let first = parts.next().unwrap_or_default();

        let mut cookie = Cookie::parse_request_pair(first)?;
        cookie.raw = line.trim().to_string();

        for attr in parts.map(str::trim).filter(|a| !a.is_empty()) {
            let (key, value) = match attr.split_once('=') {
                Some((k, v)) => (k.trim(), Some(v.trim())),
                None => (attr, None),
            };

            match (key.to_ascii_lowercase().as_str(), value) {
                ("path", Some(v)) => cookie.path = Some(v.to_string()),
                ("domain", Some(v)) => cookie.domain = Some(v.to_string()),
                ("expires", Some(v)) => {
                    let when = httpdate::parse_http_date(v)
                        .map_err(|_| CookieError::InvalidExpires(v.to_string()))?;
                    cookie.expires = Some(when);
                    cookie.raw_expires = Some(v.to_string());
                }
                ("max-age", Some(v)) => {
                    let secs = v
                        .parse::<i64>()
                        .map_err(|_| CookieError::InvalidMaxAge(v.to_string()))?;
                    cookie.max_age = Some(secs);
                }
                ("samesite", Some(v)) => cookie.same_site = v.parse()?,
                ("secure", None) => cookie.secure = true,
                ("httponly", None) => cookie.http_only = true,
                _ => cookie.unparsed.push(attr.to_string()),
            }
        }

        if cookie.name.starts_with(SECURE_PREFIX) {
            cookie.secure = true;
        }

        Ok(cookie)
    }

    /// Check the cookie against RFC 6265 character and attribute rules
    pub fn validate(&self) -> Result<(), CookieError> {
        if !is_valid_name(&self.name) {
            return Err(CookieError::InvalidName(self.name.clone()));
        }

        if !is_valid_value(&self.value) {
            return Err(CookieError::InvalidValue(self.value.clone()));
        }

        if let Some(domain) = self.domain.as_deref().filter(|d| !d.is_empty()) {
            if !is_valid_domain(domain) {
                return Err(CookieError::InvalidDomain(domain.to_string()));
            }
        }

        if let Some(path) = self.path.as_deref().filter(|p| !p.is_empty()) {
            if !is_valid_path(path) {
                return Err(CookieError::InvalidPath(path.to_string()));
            }
        }

        if self.name.starts_with(SECURE_PREFIX) && !self.secure {
            return Err(CookieError::SecureRequiredForPrefix(self.name.clone()));
        }

        if self.same_site == SameSite::None && !self.secure {
            return Err(CookieError::SecureRequiredForSameSiteNone);
        }

        Ok(())
    }

    /// Serialise the cookie as a `Set-Cookie` header value
    pub fn to_set_cookie(&self) -> Result<String, CookieError> {
        self.validate()?;

        let mut out = format!("{}={}", self.name, self.value);
        if let Some(path) = self.path.as_deref().filter(|p| !p.is_empty()) {
            out.push_str("; Path=");
            out.push_str(path);
        }
        if let Some(domain) = self.domain.as_deref().filter(|d| !d.is_empty()) {
            out.push_str("; Domain=");
            out.push_str(domain.strip_prefix('.').unwrap_or(domain));
        }
        if let Some(expires) = self.expires {
            out.push_str("; Expires=");
            out.push_str(&httpdate::fmt_http_date(expires));
        }
        if let Some(max_age) = self.max_age {
            out.push_str(&format!("; Max-Age={}", max_age.max(0)));
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        if self.secure {
            out.push_str("; Secure");
        }
        if self.same_site != SameSite::Default {
            out.push_str("; SameSite=");
            out.push_str(self.same_site.as_str());
        }
        Ok(out)
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Cookies received with one request, keyed by name
///
/// Adding a cookie whose name is already present replaces the earlier one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieList {
    cookies: HashMap<String, Cookie>,
}

impl CookieList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse every value of a `Cookie` header
    ///
    /// Returns the accepted cookies together with the errors of the pairs
    /// that were skipped. Empty segments (`a=1;;b=2`) are ignored.
    pub fn parse<'a, I>(values: I) -> (Self, Vec<CookieError>)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut list = CookieList::new();
        let mut rejected = Vec::new();

        for pair in values
            .into_iter()
            .flat_map(|value| value.split(';'))
            .filter(|pair| !pair.trim().is_empty())
        {
            match Cookie::parse_request_pair(pair) {
                Ok(cookie) => list.add(cookie),
                Err(e) => rejected.push(e),
            }
        }

        (list, rejected)
    }

    pub fn add(&mut self, cookie: Cookie) {
        self.cookies.insert(cookie.name.clone(), cookie);
    }

    pub fn get(&self, name: &str) -> Option<&Cookie> {
        self.cookies.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cookies.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cookie> {
        self.cookies.values()
    }
}
