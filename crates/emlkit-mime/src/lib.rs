//! # emlkit-mime
//!
//! Parsing, reading and building of raw Internet mail messages.
//!
//! ## Features
//!
//! - **Structural parsing**: headers and nested `multipart/*` bodies into a tree
//! - **Reading**: text, HTML and attachments with transfer and charset decoding
//! - **Building**: `multipart/mixed` messages that read back to the same content
//! - **Encoding/Decoding**: Base64, Quoted-Printable, RFC 2047 and RFC 2231
//! - **Charsets**: pluggable [`CharsetCodec`], backed by `encoding_rs` by default
//!
//! ## Quick Start
//!
//! ### Reading Messages
//!
//! ```
//! use emlkit_mime::MimeEngine;
//!
//! let raw = "From: sender@example.com\r\n\
//!            To: recipient@example.com\r\n\
//!            Subject: =?UTF-8?B?VGVzdA==?=\r\n\
//!            \r\n\
//!            Hello, World!";
//!
//! let engine = MimeEngine::default();
//! let message = engine.read_str(raw)?;
//! assert_eq!(message.subject.as_deref(), Some("Test"));
//! assert_eq!(message.text.as_deref(), Some("Hello, World!"));
//! # Ok::<(), emlkit_mime::Error>(())
//! ```
//!
//! ### Building Messages
//!
//! ```
//! use emlkit_mime::{Attachment, MimeEngine};
//!
//! let engine = MimeEngine::default();
//! let raw = engine.build(
//!     &engine
//!         .builder()
//!         .to("recipient@example.com")
//!         .subject("Report")
//!         .text_body("See attached.")
//!         .attach(Attachment::new("report.csv", "text/csv", b"a,b\n1,2\n".to_vec())),
//! )?;
//!
//! let message = engine.read_str(&raw)?;
//! assert_eq!(message.attachments[0].data.as_bytes(), b"a,b\n1,2\n");
//! # Ok::<(), emlkit_mime::Error>(())
//! ```
//!
//! ### Parse Trees
//!
//! ```
//! use emlkit_mime::{Config, Parser};
//!
//! let config = Config::builder().lenient_boundary_detection(false).build();
//! let node = Parser::new(&config).parse("Subject: Hi\r\n\r\nbody")?;
//! assert_eq!(node.leaf(), Some("body"));
//! # Ok::<(), emlkit_mime::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod builder;
mod config;
mod error;
mod header;
mod message;
mod parser;
mod reader;

pub mod charset;
pub mod content_type;
pub mod date;
pub mod encoding;

use std::sync::Arc;

pub use builder::{MessageBuilder, generate_boundary};
pub use charset::{CharsetCodec, EncodingRsCodec};
pub use config::{Config, ConfigBuilder, DEFAULT_CHARSET};
pub use content_type::ContentType;
pub use error::{Error, Result};
pub use header::{HeaderMap, HeaderValue};
pub use message::{Attachment, AttachmentData, FriendlyMessage, TransferEncoding};
pub use parser::{Body, BoundaryPart, ParseNode, Parser};
pub use reader::Reader;

/// Parser, reader and builder bound to one configuration and codec.
///
/// Immutable after construction and `Send + Sync`, so one engine can be
/// shared across threads.
#[derive(Clone)]
pub struct MimeEngine {
    config: Config,
    codec: Arc<dyn CharsetCodec>,
}

impl std::fmt::Debug for MimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MimeEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for MimeEngine {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl MimeEngine {
    /// Creates an engine with the `encoding_rs` codec.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self::with_codec(config, Arc::new(EncodingRsCodec::new()))
    }

    /// Creates an engine with a custom charset codec.
    #[must_use]
    pub fn with_codec(config: Config, codec: Arc<dyn CharsetCodec>) -> Self {
        Self { config, codec }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Parses raw message text into a tree.
    ///
    /// # Errors
    ///
    /// See [`Parser::parse`].
    pub fn parse(&self, raw: &str) -> Result<ParseNode> {
        Parser::new(&self.config).parse(raw)
    }

    /// Parses a raw message given as bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for binary data.
    pub fn parse_bytes(&self, raw: &[u8]) -> Result<ParseNode> {
        Parser::new(&self.config).parse_bytes(raw)
    }

    /// Reads a parse tree into a [`FriendlyMessage`].
    ///
    /// # Errors
    ///
    /// See [`Reader::read`].
    pub fn read(&self, node: &ParseNode) -> Result<FriendlyMessage> {
        Reader::new(&self.config, self.codec.as_ref()).read(node)
    }

    /// Parses and reads raw message text.
    ///
    /// # Errors
    ///
    /// See [`MimeEngine::parse`] and [`MimeEngine::read`].
    pub fn read_str(&self, raw: &str) -> Result<FriendlyMessage> {
        self.read(&self.parse(raw)?)
    }

    /// Parses and reads a raw message given as bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for binary data.
    pub fn read_bytes(&self, raw: &[u8]) -> Result<FriendlyMessage> {
        self.read(&self.parse_bytes(raw)?)
    }

    /// Decodes RFC 2047 encoded words in a header value.
    #[must_use]
    pub fn decode_header_value(&self, value: &str) -> String {
        encoding::decode_header_value(value, &self.config.default_charset, self.codec.as_ref())
    }

    /// Decodes a Quoted-Printable body in the given charset.
    #[must_use]
    pub fn decode_quoted_printable(&self, text: &str, charset: &str) -> String {
        encoding::decode_quoted_printable(text, charset, self.codec.as_ref())
    }

    /// Starts a new message.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn builder(&self) -> MessageBuilder {
        MessageBuilder::new()
    }

    /// Builds a raw message using this engine's configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingRecipient`] if no `To` header is set.
    pub fn build(&self, builder: &MessageBuilder) -> Result<String> {
        builder.build(&self.config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_engine_is_send_sync() {
        assert_send_sync::<MimeEngine>();
    }

    #[test]
    fn test_engine_decoders() {
        let engine = MimeEngine::default();
        assert_eq!(engine.decode_header_value("=?UTF-8?B?VGVzdA==?="), "Test");
        assert_eq!(engine.decode_header_value("=?UTF-8?Q?A=20B?="), "A B");
        assert_eq!(
            engine.decode_quoted_printable("=F0=9F=98=80", "utf-8"),
            "\u{1f600}"
        );
    }

    #[test]
    fn test_engine_shared_across_threads() {
        let engine = Arc::new(MimeEngine::default());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    let raw = format!("To: t{i}@example.com\r\n\r\nbody {i}");
                    engine.read_str(&raw).unwrap().text
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap(), Some(format!("body {i}")));
        }
    }
}
