//! Caller-supplied request headers.
//!
//! Header names are kept exactly as given. `Range` is reserved because every
//! chunk request carries its own range, so it is rejected when the headers
//! are built rather than silently overridden later.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use thiserror::Error;

/// Errors raised while building [`RequestHeaders`].
#[derive(Debug, Error)]
pub enum HeaderError {
    /// The caller supplied a header the engine sets itself.
    #[error("the `{name}` header is reserved: chunk ranges are set per request")]
    Reserved {
        /// Header name as supplied.
        name: String,
    },

    /// The name is not a valid HTTP header name.
    #[error("invalid header name: {name:?}")]
    InvalidName {
        /// Header name as supplied.
        name: String,
    },

    /// The value contains bytes that are not allowed in a header value.
    #[error("invalid value for header `{name}`")]
    InvalidValue {
        /// Header name the value belongs to.
        name: String,
    },

    /// A header line without a `:` separator.
    #[error("malformed header {line:?}: expected `Name: value`")]
    Malformed {
        /// The raw line.
        line: String,
    },
}

/// Ordered, validated header name/value pairs sent with every request of a job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHeaders {
    entries: Vec<(String, String)>,
}

impl RequestHeaders {
    /// Creates an empty header set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a header set from name/value pairs.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError::Reserved`] for a `Range` header (any case), or
    /// an invalid name/value error.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, HeaderError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut headers = Self::new();
        for (name, value) in pairs {
            headers.insert(name, value)?;
        }
        Ok(headers)
    }

    /// Parses curl-style `Name: value` lines.
    ///
    /// The line is split at the first `:`; name and value are trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError::Malformed`] for a line without a name, plus any
    /// error [`insert`](Self::insert) reports.
    pub fn parse_lines<I, S>(lines: I) -> Result<Self, HeaderError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut headers = Self::new();
        for line in lines {
            let line = line.as_ref();
            let Some((name, value)) = line.split_once(':') else {
                return Err(HeaderError::Malformed {
                    line: line.to_string(),
                });
            };
            let name = name.trim();
            if name.is_empty() {
                return Err(HeaderError::Malformed {
                    line: line.to_string(),
                });
            }
            headers.insert(name, value.trim())?;
        }
        Ok(headers)
    }

    /// Adds a header, replacing an earlier entry with the identical name.
    ///
    /// # Errors
    ///
    /// See [`from_pairs`](Self::from_pairs).
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), HeaderError> {
        let name = name.into();
        let value = value.into();

        if name.eq_ignore_ascii_case(reqwest::header::RANGE.as_str()) {
            return Err(HeaderError::Reserved { name });
        }
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            return Err(HeaderError::InvalidName { name });
        }
        if HeaderValue::from_str(&value).is_err() {
            return Err(HeaderError::InvalidValue { name });
        }

        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = value;
        } else {
            self.entries.push((name, value));
        }
        Ok(())
    }

    /// Returns the value stored under exactly `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Iterates over the pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no headers were supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Converts to a `reqwest` header map for sending.
    pub(crate) fn to_header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::with_capacity(self.entries.len());
        for (name, value) in &self.entries {
            // Both halves were validated on insert.
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                map.append(name, value);
            }
        }
        map
    }
}
