//! HTTP headers handling
//!
//! Header names are stored only in canonical form: every `-` separated
//! segment gets an upper-case first letter and lower-case remaining letters
//! (`cOntent-TYPE` becomes `Content-Type`). All lookups canonicalize the
//! requested name first, so retrieval is case-insensitive.

use std::fmt;

/// Canonicalize a header name
///
/// Surrounding spaces are trimmed. Only ASCII letters change case, so the
/// function is idempotent.
pub fn canonical_name(name: &str) -> String {
    let mut canonical = String::with_capacity(name.len());
    let mut segment_start = true;

    for c in name.trim_matches(' ').chars() {
        if c == '-' {
            segment_start = true;
            canonical.push(c);
        } else if segment_start {
            segment_start = false;
            canonical.push(c.to_ascii_uppercase());
        } else {
            canonical.push(c.to_ascii_lowercase());
        }
    }

    canonical
}

/// HTTP headers collection
///
/// Names keep the order in which they were first seen, and each name keeps
/// its values in arrival order. Repeated headers are appended, never
/// overwritten, so multiple `Set-Cookie` or `Cookie` lines survive intact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, Vec<String>)>,
}

impl Headers {
    /// Create a new empty headers collection
    pub fn new() -> Self {
        Headers {
            entries: Vec::new(),
        }
    }

    fn position(&self, canonical: &str) -> Option<usize> {
        self.entries.iter().position(|(n, _)| n == canonical)
    }

    /// Insert a header value (upsert)
    ///
    /// The first occurrence of a name creates a single-element value list;
    /// later occurrences append to it.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        let canonical = canonical_name(name.as_ref());
        let value = value.into();

        match self.position(&canonical) {
            Some(idx) => self.entries[idx].1.push(value),
            None => self.entries.push((canonical, vec![value])),
        }
    }

    /// Replace every value of a header with a single value
    pub fn set(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        let canonical = canonical_name(name.as_ref());
        let value = value.into();

        match self.position(&canonical) {
            Some(idx) => self.entries[idx].1 = vec![value],
            None => self.entries.push((canonical, vec![value])),
        }
    }

    /// Get the first value for a header
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    /// Get all values for a header, in arrival order
    pub fn get_all(&self, name: &str) -> &[String] {
        let canonical = canonical_name(name);
        self.position(&canonical)
            .map(|idx| self.entries[idx].1.as_slice())
            .unwrap_or(&[])
    }

    /// Count how many values a header has
    pub fn count(&self, name: &str) -> usize {
        self.get_all(name).len()
    }

    /// Check if a header exists
    pub fn contains(&self, name: &str) -> bool {
        self.position(&canonical_name(name)).is_some()
    }

    /// Remove a header and all of its values, returning how many were removed
    pub fn remove(&mut self, name: &str) -> usize {
        let canonical = canonical_name(name);
        match self.position(&canonical) {
            Some(idx) => self.entries.remove(idx).1.len(),
            None => 0,
        }
    }

    /// Get the number of distinct header names
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no headers
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear all headers
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate over the canonical header names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Iterate over every `(name, value)` pair, one pair per value
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .flat_map(|(n, values)| values.iter().map(move |v| (n.as_str(), v.as_str())))
    }

    /// Split a header line on its first colon
    ///
    /// Returns `None` for a line without a colon. Spaces around the name and
    /// the value are trimmed; the name is not canonicalized here.
    pub fn parse_header_line(line: &str) -> Option<(&str, &str)> {
        let (name, value) = line.split_once(':')?;
        Some((name.trim_matches(' '), value.trim_matches(' ')))
    }

    /// Parse a header block (request line already removed)
    ///
    /// Lines are separated by CRLF. Empty lines and lines without a colon are
    /// skipped.
    pub fn parse_block(block: &str) -> Self {
        let mut headers = Headers::new();
        for line in block.split("\r\n").filter(|l| !l.is_empty()) {
            if let Some((name, value)) = Self::parse_header_line(line) {
                headers.insert(name, value);
            }
        }
        headers
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.iter() {
            write!(f, "{}: {}\r\n", name, value)?;
        }
        Ok(())
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}
