//! Structural parser: raw message text to a tree of headers and bodies.
//!
//! Each nesting level runs the same two-phase scan. The header phase
//! collects `Name: value` lines and folded continuations until the
//! first empty line. The body phase either keeps the remaining lines as
//! a leaf or, for `multipart/*` with a boundary, splits them at
//! delimiter lines and parses every part recursively.

use crate::config::Config;
use crate::content_type::{extract_boundary, is_multipart};
use crate::error::{Error, Result};
use crate::header::HeaderMap;

/// Line separator used when rejoining body lines.
pub const LINE_SEPARATOR: &str = "\r\n";

/// One node of the parse tree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParseNode {
    /// Headers of this node.
    pub headers: HeaderMap,
    /// Body; absent in headers-only mode or when no blank line ends the
    /// header block.
    pub body: Option<Body>,
}

/// Body of a [`ParseNode`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Body {
    /// Non-multipart content, verbatim.
    Leaf(String),
    /// Parts of a multipart body in document order.
    Multipart(Vec<BoundaryPart>),
}

/// One delimited section of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundaryPart {
    /// The delimiter line without its leading `--`.
    pub marker: String,
    /// The parsed section.
    pub part: ParseNode,
}

impl ParseNode {
    /// Returns the leaf body text, if this node has one.
    #[must_use]
    pub fn leaf(&self) -> Option<&str> {
        match &self.body {
            Some(Body::Leaf(text)) => Some(text),
            _ => None,
        }
    }

    /// Returns the multipart sections, if this node has them.
    #[must_use]
    pub fn parts(&self) -> Option<&[BoundaryPart]> {
        match &self.body {
            Some(Body::Multipart(parts)) => Some(parts),
            _ => None,
        }
    }
}

/// Line-oriented MIME structure parser.
#[derive(Debug, Clone, Copy)]
pub struct Parser<'a> {
    config: &'a Config,
}

impl<'a> Parser<'a> {
    /// Creates a parser with the given configuration.
    #[must_use]
    pub const fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Parses raw message text.
    ///
    /// # Errors
    ///
    /// Never fails for text input; the `Result` mirrors
    /// [`Parser::parse_bytes`]. Malformed structure degrades instead.
    pub fn parse(&self, raw: &str) -> Result<ParseNode> {
        let lines: Vec<&str> = raw
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect();
        Ok(self.parse_lines(&lines))
    }

    /// Parses a raw message read as bytes.
    ///
    /// UTF-8 input is used as is. Anything else is mapped byte-for-char
    /// (U+0000 to U+00FF) so 8-bit bodies can be reinterpreted later in
    /// their declared charset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for binary data (NUL bytes).
    pub fn parse_bytes(&self, raw: &[u8]) -> Result<ParseNode> {
        if let Some(offset) = raw.iter().position(|b| *b == 0) {
            return Err(Error::InvalidInput(format!(
                "NUL byte at offset {offset}, not message text"
            )));
        }
        match std::str::from_utf8(raw) {
            Ok(text) => self.parse(text),
            Err(_) => {
                let text: String = raw.iter().copied().map(char::from).collect();
                self.parse(&text)
            }
        }
    }

    fn parse_lines(&self, lines: &[&str]) -> ParseNode {
        let mut headers = HeaderMap::new();
        let mut last_name: Option<String> = None;
        let mut body_start = None;

        for (i, line) in lines.iter().enumerate() {
            if line.is_empty() {
                body_start = Some(i + 1);
                break;
            }

            if line.starts_with([' ', '\t']) {
                let continuation = line.trim_start();
                if let (Some(name), false) = (&last_name, continuation.is_empty()) {
                    headers.append_continuation(name, continuation);
                }
                continue;
            }

            if let Some((name, value)) = split_header_line(line) {
                headers.add(name, value);
                last_name = Some(name.to_string());
            }
        }

        let body = match body_start {
            Some(_) if self.config.headers_only => None,
            Some(start) => Some(self.parse_body(&headers, &lines[start.min(lines.len())..])),
            None => None,
        };

        ParseNode { headers, body }
    }

    fn parse_body(&self, headers: &HeaderMap, lines: &[&str]) -> Body {
        if let Some(content_type) = headers.get("Content-Type") {
            if is_multipart(content_type) {
                match extract_boundary(content_type) {
                    Some(boundary) => return Body::Multipart(self.split_parts(&boundary, lines)),
                    None => {
                        if self.config.verbose_diagnostics {
                            let error = Error::MalformedStructure(format!(
                                "multipart without boundary: {}",
                                content_type.replace("\r\n", " ")
                            ));
                            tracing::warn!(%error, "Treating body as a single part");
                        }
                    }
                }
            }
        }

        Body::Leaf(lines.join(LINE_SEPARATOR))
    }

    fn split_parts(&self, boundary: &str, lines: &[&str]) -> Vec<BoundaryPart> {
        let delimiter = format!("--{boundary}");
        let mut parts = Vec::new();
        let mut current: Option<PartBuilder<'_>> = None;
        let mut previous_blank = true;

        for line in lines {
            let at_boundary = self.config.lenient_boundary_detection || previous_blank;
            previous_blank = line.is_empty();

            if at_boundary {
                match delimiter_kind(line, &delimiter) {
                    Some(Delimiter::Open) => {
                        if let Some(done) = current.take() {
                            parts.push(done.finish(self));
                        }
                        if self.config.verbose_diagnostics {
                            tracing::debug!(marker = &line[2..], "Found boundary");
                        }
                        current = Some(PartBuilder::new(&line[2..]));
                        continue;
                    }
                    Some(Delimiter::Close) => {
                        if let Some(done) = current.take() {
                            parts.push(done.finish(self));
                        }
                        continue;
                    }
                    None => {}
                }
            }

            // Preamble and epilogue lines fall outside every part
            if let Some(part) = current.as_mut() {
                part.lines.push(line);
            }
        }

        if let Some(done) = current {
            parts.push(done.finish(self));
        }

        parts
    }
}

/// Splits `Name: value` into its name and value.
///
/// Names are runs of letters, digits, `_` and `-`.
fn split_header_line(line: &str) -> Option<(&str, &str)> {
    let (name, value) = line.split_once(':')?;
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    valid.then(|| (name, value.trim()))
}

enum Delimiter {
    Open,
    Close,
}

fn delimiter_kind(line: &str, delimiter: &str) -> Option<Delimiter> {
    let rest = line.strip_prefix(delimiter)?;
    let rest = rest.trim_end();
    if rest.is_empty() {
        Some(Delimiter::Open)
    } else if rest == "--" {
        Some(Delimiter::Close)
    } else {
        None
    }
}

/// Lines of one part, collected until its closing delimiter.
struct PartBuilder<'l> {
    marker: String,
    lines: Vec<&'l str>,
}

impl<'l> PartBuilder<'l> {
    fn new(marker: &str) -> Self {
        Self {
            marker: marker.trim_end().to_string(),
            lines: Vec::new(),
        }
    }

    fn finish(mut self, parser: &Parser<'_>) -> BoundaryPart {
        // The line break before a delimiter belongs to the delimiter
        if self.lines.last().is_some_and(|line| line.is_empty()) {
            self.lines.pop();
        }
        BoundaryPart {
            marker: self.marker,
            part: parser.parse_lines(&self.lines),
        }
    }
}
