//! MIME content type handling and header parameter extraction.
//!
//! Raw header values are often folded, half-quoted or split with
//! RFC 2231 continuations, so the extractors here scan the raw text
//! rather than requiring a clean `type/subtype; key=value` grammar.

use std::fmt;

use crate::charset::{CharsetCodec, UTF8, decode_or_passthrough, normalize_charset};
use crate::error::{Error, Result};

/// MIME content type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g., "text", "image", "multipart").
    pub main_type: String,
    /// Subtype (e.g., "plain", "html", "jpeg").
    pub sub_type: String,
    /// Parameters in declaration order (e.g., charset=utf-8, boundary=xxx).
    pub parameters: Vec<(String, String)>,
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: Vec::new(),
        }
    }

    /// Creates a text/plain content type.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain").with_parameter("charset", "utf-8")
    }

    /// Creates a text/html content type.
    #[must_use]
    pub fn text_html() -> Self {
        Self::new("text", "html").with_parameter("charset", "utf-8")
    }

    /// Creates a multipart/mixed content type with boundary.
    #[must_use]
    pub fn multipart_mixed(boundary: impl Into<String>) -> Self {
        Self::new("multipart", "mixed").with_parameter("boundary", boundary)
    }

    /// Adds a parameter, replacing an existing one with the same name.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into().to_lowercase();
        let value = value.into();
        match self.parameters.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.parameters.push((key, value)),
        }
        self
    }

    /// Returns a parameter value by name.
    #[must_use]
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameter("charset")
    }

    /// Returns the boundary parameter if present.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameter("boundary")
    }

    /// Returns `type/subtype` without parameters.
    #[must_use]
    pub fn mime_type(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    /// Checks if this is a multipart content type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type.eq_ignore_ascii_case("multipart")
    }

    /// Checks if this is a text content type.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.main_type.eq_ignore_ascii_case("text")
    }

    /// Parses a content type string.
    ///
    /// Format: `type/subtype; param1=value1; param2=value2`
    ///
    /// # Errors
    ///
    /// Returns an error if the type or subtype is missing.
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.split(';');

        let type_str = parts.next().unwrap_or_default().trim();
        let (main_type, sub_type) = type_str
            .split_once('/')
            .ok_or_else(|| Error::MalformedStructure(format!("content type '{type_str}'")))?;
        let main_type = main_type.trim().to_lowercase();
        let sub_type = sub_type.trim().to_lowercase();
        if main_type.is_empty() || sub_type.is_empty() {
            return Err(Error::MalformedStructure(format!(
                "content type '{type_str}'"
            )));
        }

        let mut content_type = Self::new(main_type, sub_type);
        for param in parts {
            if let Some((key, value)) = param.trim().split_once('=') {
                content_type = content_type
                    .with_parameter(key.trim(), value.trim().trim_matches('"'));
            }
        }

        Ok(content_type)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let main = &self.main_type;
        let sub = &self.sub_type;
        write!(f, "{main}/{sub}")?;

        for (key, value) in &self.parameters {
            // Quote value if it contains special characters
            if value.contains(|c: char| c.is_whitespace() || "()<>@,;:\\\"/[]?=".contains(c)) {
                write!(f, "; {key}=\"{value}\"")?;
            } else {
                write!(f, "; {key}={value}")?;
            }
        }

        Ok(())
    }
}

/// Checks whether a raw `Content-Type` value declares `multipart/*`.
#[must_use]
pub fn is_multipart(content_type: &str) -> bool {
    content_type
        .trim_start()
        .get(..10)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("multipart/"))
}

/// Checks whether a raw header value mentions `mime` anywhere.
#[must_use]
pub fn mentions(value: &str, mime: &str) -> bool {
    value.to_ascii_lowercase().contains(mime)
}

/// Byte offset just past `key=` for the first occurrence of the
/// parameter `key` (case-insensitive), skipping spaces around `=`.
fn find_parameter(value: &str, key: &str) -> Option<usize> {
    let lower = value.to_ascii_lowercase();
    let mut from = 0;
    while let Some(found) = lower[from..].find(key) {
        let after = from + found + key.len();
        let rest = &lower[after..];
        let trimmed = rest.trim_start();
        if let Some(value_part) = trimmed.strip_prefix('=') {
            let skipped = rest.len() - value_part.len();
            return Some(after + skipped);
        }
        from = after;
    }
    None
}

/// Extracts the `boundary` parameter from a raw `Content-Type` value.
///
/// The value may be quoted; an unquoted value ends at the first `;` or
/// whitespace. Empty boundaries count as missing.
#[must_use]
pub fn extract_boundary(content_type: &str) -> Option<String> {
    let start = find_parameter(content_type, "boundary")?;
    let rest = content_type[start..].trim_start();
    let boundary = match rest.strip_prefix('"') {
        Some(quoted) => quoted.split('"').next().unwrap_or_default(),
        None => rest
            .split(|c: char| c == ';' || c.is_whitespace())
            .next()
            .unwrap_or_default(),
    };
    (!boundary.is_empty()).then(|| boundary.to_string())
}

/// Extracts the `charset` parameter from a raw `Content-Type` value.
///
/// Quotes and other punctuation before the name are skipped; the name
/// is the following run of word characters and dashes.
#[must_use]
pub fn extract_charset(content_type: &str) -> Option<String> {
    let start = find_parameter(content_type, "charset")?;
    let rest = content_type[start..]
        .trim_start_matches(|c: char| !(c.is_alphanumeric() || c == '_'));
    let charset: String = rest
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    (!charset.is_empty()).then_some(charset)
}

/// Extracts a file name parameter (`name=` or `filename=`) from a raw
/// `Content-Disposition` or `Content-Type` value.
///
/// Tried in order: a quoted or bare value on a single line, a quoted
/// value spanning folded lines, and RFC 2231 continuations
/// (`filename*0*=utf-8''a%20b; filename*1*=.txt`). The result may still
/// hold encoded words and unsafe characters; see [`sanitize_file_name`].
#[must_use]
pub fn extract_file_name(value: &str, codec: &dyn CharsetCodec) -> Option<String> {
    single_line_name(value)
        .or_else(|| quoted_name(value))
        .or_else(|| continued_name(value, codec))
}

fn single_line_name(value: &str) -> Option<String> {
    let start = find_parameter(value, "name")?;
    let rest = value[start..].trim_start();
    let line = rest.lines().next().unwrap_or_default();
    let name = match line.strip_prefix('"') {
        Some(quoted) => quoted.split_once('"')?.0,
        None => line.split(';').next().unwrap_or_default().trim_end(),
    };
    (!name.is_empty()).then(|| name.to_string())
}

fn quoted_name(value: &str) -> Option<String> {
    let start = find_parameter(value, "name")?;
    let quoted = value[start..].trim_start().strip_prefix('"')?;
    let (name, _) = quoted.split_once('"')?;
    (!name.is_empty()).then(|| name.to_string())
}

/// One `name*N*=` section of an RFC 2231 parameter.
struct Section<'a> {
    index: usize,
    extended: bool,
    value: &'a str,
}

fn continued_name(value: &str, codec: &dyn CharsetCodec) -> Option<String> {
    let mut sections: Vec<Section<'_>> = value
        .split([';', '\r', '\n'])
        .filter_map(|param| {
            let (key, raw) = param.trim().split_once('=')?;
            let key = key.trim().to_ascii_lowercase();
            let star = key.find("name*")?;
            let (index, extended) = match key[star + 5..].split_once('*') {
                Some((index, _)) => (index, true),
                None => (&key[star + 5..], false),
            };
            Some(Section {
                // `name*=` is a single extended section
                index: index.parse().unwrap_or(0),
                extended: extended || index.is_empty(),
                value: raw.trim().trim_matches('"'),
            })
        })
        .collect();
    if sections.is_empty() {
        return None;
    }
    sections.sort_by_key(|section| section.index);

    let mut charset = UTF8.to_string();
    let mut bytes = Vec::new();
    for (i, section) in sections.iter().enumerate() {
        let mut text = section.value;
        if i == 0 && section.extended {
            let mut pieces = text.splitn(3, '\'');
            if let (Some(declared), Some(_language), Some(encoded)) =
                (pieces.next(), pieces.next(), pieces.next())
            {
                if !declared.is_empty() {
                    charset = normalize_charset(declared);
                }
                text = encoded;
            }
        }
        if section.extended {
            bytes.extend(percent_encoding::percent_decode_str(text));
        } else {
            bytes.extend_from_slice(text.as_bytes());
        }
    }

    let name = decode_or_passthrough(codec, &bytes, &charset);
    (!name.is_empty()).then_some(name)
}

/// Makes a decoded file name safe to use as a single path component.
///
/// Path separators and embedded quotes become `_`, surrounding quotes
/// are dropped and control characters become spaces.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let name = name.strip_prefix('"').unwrap_or(name);
    let name = name.strip_suffix('"').unwrap_or(name);
    name.chars()
        .map(|c| match c {
            '/' | '\\' | '"' => '_',
            c if u32::from(c) < 0x20 => ' ',
            c => c,
        })
        .collect()
}
