//! MIME header handling.

use std::fmt;

/// Value of one header name: a single occurrence or several.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum HeaderValue {
    /// The header appeared once.
    Single(String),
    /// The header appeared several times, in appearance order.
    Multi(Vec<String>),
}

impl HeaderValue {
    /// Returns the first value.
    #[must_use]
    pub fn first(&self) -> &str {
        match self {
            Self::Single(value) => value,
            Self::Multi(values) => values.first().map_or("", String::as_str),
        }
    }

    /// Returns all values in order.
    #[must_use]
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::Single(value) => vec![value.as_str()],
            Self::Multi(values) => values.iter().map(String::as_str).collect(),
        }
    }

    fn push(&mut self, value: String) {
        match self {
            Self::Single(first) => {
                let first = std::mem::take(first);
                *self = Self::Multi(vec![first, value]);
            }
            Self::Multi(values) => values.push(value),
        }
    }

    fn last_mut(&mut self) -> Option<&mut String> {
        match self {
            Self::Single(value) => Some(value),
            Self::Multi(values) => values.last_mut(),
        }
    }
}

/// Title-cases a header name: the first letter of every alphanumeric
/// run is upper-cased, everything else is kept.
///
/// `content-type` becomes `Content-Type`; `Message-ID` stays as it is.
#[must_use]
pub fn title_case(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut word_start = true;
    for ch in name.chars() {
        let is_word = ch.is_alphanumeric() || ch == '_';
        if is_word && word_start {
            result.extend(ch.to_uppercase());
        } else {
            result.push(ch);
        }
        word_start = !is_word;
    }
    result
}

/// Ordered collection of email headers.
///
/// Names are stored title-cased; lookups ignore case. Entries keep the
/// order in which each name first appeared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct HeaderMap {
    entries: Vec<(String, HeaderValue)>,
}

impl HeaderMap {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(existing, _)| existing.eq_ignore_ascii_case(name))
    }

    /// Adds a header value.
    ///
    /// A repeated name turns the entry into [`HeaderValue::Multi`].
    pub fn add(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        let name = name.as_ref();
        let value = value.into();
        match self.position(name) {
            Some(index) => self.entries[index].1.push(value),
            None => self
                .entries
                .push((title_case(name), HeaderValue::Single(value))),
        }
    }

    /// Sets a header value, replacing any existing values in place.
    pub fn set(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        let name = name.as_ref();
        let value = HeaderValue::Single(value.into());
        match self.position(name) {
            Some(index) => self.entries[index].1 = value,
            None => self.entries.push((title_case(name), value)),
        }
    }

    /// Appends a continuation line to the last value of `name`.
    ///
    /// The continuation is joined with a line break so encoded words
    /// spread over folded lines can still be decoded later. Returns
    /// `false` if the header does not exist.
    pub fn append_continuation(&mut self, name: &str, continuation: &str) -> bool {
        let Some(index) = self.position(name) else {
            return false;
        };
        match self.entries[index].1.last_mut() {
            Some(value) => {
                value.push_str("\r\n");
                value.push_str(continuation);
                true
            }
            None => false,
        }
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_value(name).map(HeaderValue::first)
    }

    /// Gets the stored value for a header.
    #[must_use]
    pub fn get_value(&self, name: &str) -> Option<&HeaderValue> {
        self.position(name).map(|index| &self.entries[index].1)
    }

    /// Gets all values for a header.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.get_value(name)
            .map(HeaderValue::values)
            .unwrap_or_default()
    }

    /// Checks whether a header is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Removes all values for a header.
    pub fn remove(&mut self, name: &str) {
        self.entries
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
    }

    /// Returns the number of distinct header names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Checks whether there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns an iterator over the stored entries, one per name.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Returns an iterator over all headers, one pair per value.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries()
            .flat_map(|(name, value)| value.values().into_iter().map(move |v| (name, v)))
    }
}

impl fmt::Display for HeaderMap {
    /// Writes one `Name: value` line per value with CRLF endings. Line
    /// breaks inside a value become folded continuation lines.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.iter() {
            write!(f, "{name}: ")?;
            for (i, line) in value.lines().enumerate() {
                if i > 0 {
                    f.write_str("\r\n ")?;
                }
                f.write_str(line)?;
            }
            f.write_str("\r\n")?;
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_new() {
        let headers = HeaderMap::new();
        assert!(headers.is_empty());
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("content-type"), "Content-Type");
        assert_eq!(title_case("Message-ID"), "Message-ID");
        assert_eq!(title_case("x-mailer"), "X-Mailer");
        assert_eq!(title_case("mime-version"), "Mime-Version");
    }

    #[test]
    fn test_headers_add_get() {
        let mut headers = HeaderMap::new();
        headers.add("content-type", "text/plain");
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("text/plain"));
        assert_eq!(headers.iter().next(), Some(("Content-Type", "text/plain")));
    }

    #[test]
    fn test_headers_multi_value() {
        let mut headers = HeaderMap::new();
        headers.add("Received", "from a");
        assert_eq!(
            headers.get_value("Received"),
            Some(&HeaderValue::Single("from a".to_string()))
        );

        headers.add("received", "from b");
        assert_eq!(
            headers.get_value("Received"),
            Some(&HeaderValue::Multi(vec![
                "from a".to_string(),
                "from b".to_string()
            ]))
        );
        assert_eq!(headers.get("Received"), Some("from a"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_headers_continuation() {
        let mut headers = HeaderMap::new();
        headers.add("Subject", "first");
        assert!(headers.append_continuation("Subject", "second"));
        assert_eq!(headers.get("Subject"), Some("first\r\nsecond"));

        headers.add("To", "a@example.com");
        headers.add("To", "b@example.com,");
        assert!(headers.append_continuation("To", "c@example.com"));
        assert_eq!(
            headers.get_all("To"),
            vec!["a@example.com", "b@example.com,\r\nc@example.com"]
        );

        assert!(!headers.append_continuation("Cc", "nobody"));
    }

    #[test]
    fn test_headers_set() {
        let mut headers = HeaderMap::new();
        headers.add("To", "alice@example.com");
        headers.add("To", "bob@example.com");
        headers.add("Subject", "Hi");
        assert_eq!(headers.get_all("To").len(), 2);

        headers.set("to", "charlie@example.com");
        assert_eq!(headers.get_all("To").len(), 1);
        assert_eq!(headers.get("To"), Some("charlie@example.com"));
        assert_eq!(headers.iter().next(), Some(("To", "charlie@example.com")));
    }

    #[test]
    fn test_headers_remove() {
        let mut headers = HeaderMap::new();
        headers.add("Subject", "Test");
        assert!(headers.contains("subject"));

        headers.remove("SUBJECT");
        assert!(headers.get("Subject").is_none());
    }

    #[test]
    fn test_headers_display() {
        let mut headers = HeaderMap::new();
        headers.add("from", "sender@example.com");
        headers.add("to", "recipient@example.com");
        headers.add("subject", "line one\r\nline two");

        let s = headers.to_string();
        assert_eq!(
            s,
            "From: sender@example.com\r\nTo: recipient@example.com\r\nSubject: line one\r\n line two\r\n"
        );
    }

    #[test]
    fn test_headers_iter() {
        let mut headers = HeaderMap::new();
        headers.add("From", "sender@example.com");
        headers.add("To", "recipient@example.com");
        headers.add("To", "other@example.com");

        let pairs: Vec<_> = headers.iter().collect();
        assert_eq!(
            pairs,
            vec![
                ("From", "sender@example.com"),
                ("To", "recipient@example.com"),
                ("To", "other@example.com"),
            ]
        );
    }

    #[test]
    fn test_headers_entries() {
        let mut headers = HeaderMap::new();
        headers.add("received", "a");
        headers.add("Received", "b");
        headers.add("subject", "hi");

        let entries: Vec<_> = headers.entries().collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, "Received");
        assert_eq!(
            entries[0].1,
            &HeaderValue::Multi(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(entries[1], ("Subject", &HeaderValue::Single("hi".into())));
    }
}
