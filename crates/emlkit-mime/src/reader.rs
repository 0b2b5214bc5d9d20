//! Semantic reader: parse tree to [`FriendlyMessage`].
//!
//! Every leaf of the tree is transfer-decoded and classified. The first
//! `text/html` leaf becomes the HTML body, the first `text/plain` leaf
//! the text body, and everything else an attachment. Unknown encodings
//! and charsets degrade to pass-through; reading never fails on content.

use crate::charset::{CharsetCodec, UTF8, decode_or_passthrough, normalize_charset, raw_bytes};
use crate::config::Config;
use crate::content_type::{extract_charset, extract_file_name, mentions, sanitize_file_name};
use crate::date::parse_date;
use crate::encoding::{decode_base64_lenient, decode_header_value, decode_quoted_printable};
use crate::error::Result;
use crate::header::HeaderMap;
use crate::message::{Attachment, AttachmentData, FriendlyMessage, TransferEncoding};
use crate::parser::{Body, ParseNode};

/// Turns parse trees into [`FriendlyMessage`]s.
#[derive(Clone, Copy)]
pub struct Reader<'a> {
    config: &'a Config,
    codec: &'a dyn CharsetCodec,
}

impl std::fmt::Debug for Reader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reader")
            .field("config", self.config)
            .finish_non_exhaustive()
    }
}

/// Transfer-decoded content of one leaf.
enum Payload {
    Bytes(Vec<u8>),
    Text(String),
}

impl Payload {
    fn into_text(self, key: &str, codec: &dyn CharsetCodec) -> String {
        match self {
            Self::Bytes(bytes) => decode_or_passthrough(codec, &bytes, key),
            Self::Text(text) => text,
        }
    }
}

impl<'a> Reader<'a> {
    /// Creates a reader.
    #[must_use]
    pub const fn new(config: &'a Config, codec: &'a dyn CharsetCodec) -> Self {
        Self { config, codec }
    }

    /// Reads a parse tree.
    ///
    /// # Errors
    ///
    /// Currently never fails: broken dates, encodings and charsets all
    /// have fallbacks.
    pub fn read(&self, node: &ParseNode) -> Result<FriendlyMessage> {
        let headers = &node.headers;
        let mut message = FriendlyMessage {
            date: parse_date(headers.get("Date")),
            subject: headers.get("Subject").map(|v| self.decode_header(v)),
            from: headers.get("From").map(|v| self.decode_header(v)),
            to: headers.get("To").map(|v| self.decode_header(v)),
            message_id: headers.get("Message-ID").map(str::to_string),
            references: headers.get("References").map(str::to_string),
            headers: headers.clone(),
            ..FriendlyMessage::default()
        };

        self.walk(node, &mut message);
        Ok(message)
    }

    fn decode_header(&self, value: &str) -> String {
        decode_header_value(value, &self.config.default_charset, self.codec)
    }

    /// Depth-first over the tree, classifying leaves in document order.
    fn walk(&self, node: &ParseNode, message: &mut FriendlyMessage) {
        match &node.body {
            Some(Body::Multipart(parts)) => {
                for boundary_part in parts {
                    self.walk(&boundary_part.part, message);
                }
            }
            Some(Body::Leaf(content)) => self.classify(&node.headers, content, message),
            None => {}
        }
    }

    fn classify(&self, headers: &HeaderMap, content: &str, message: &mut FriendlyMessage) {
        let declared = ["Content-Type", "Content-Transfer-Encoding", "Content-Disposition"]
            .iter()
            .any(|name| headers.contains(name));

        let (content_type, encoding) = if declared {
            (
                headers.get("Content-Type"),
                headers
                    .get("Content-Transfer-Encoding")
                    .map_or(TransferEncoding::SevenBit, TransferEncoding::parse),
            )
        } else {
            (Some("text/plain"), TransferEncoding::EightBit)
        };

        let charset = content_type
            .and_then(extract_charset)
            .unwrap_or_else(|| self.config.default_charset.clone());
        let key = normalize_charset(&charset);

        let payload = self.transfer_decode(content, encoding, &charset, &key);

        let mime = content_type.unwrap_or_default();
        if mentions(mime, "text/html") && message.html.is_none() {
            self.trace_decision("html", mime, encoding);
            message.html = Some(payload.into_text(&key, self.codec));
        } else if mentions(mime, "text/plain") && message.text.is_none() {
            self.trace_decision("text", mime, encoding);
            message.text = Some(payload.into_text(&key, self.codec));
        } else {
            self.trace_decision("attachment", mime, encoding);
            message.attachments.push(self.attachment(headers, content_type, payload));
        }
    }

    fn transfer_decode(
        &self,
        content: &str,
        encoding: TransferEncoding,
        charset: &str,
        key: &str,
    ) -> Payload {
        match encoding {
            TransferEncoding::Base64 => match decode_base64_lenient(content) {
                Ok(bytes) => Payload::Bytes(bytes),
                Err(error) => {
                    tracing::warn!(%error, "Undecodable base64 content, keeping it as text");
                    Payload::Text(content.to_string())
                }
            },
            TransferEncoding::QuotedPrintable => {
                Payload::Text(decode_quoted_printable(content, charset, self.codec))
            }
            encoding if encoding.is_raw_8bit() && key != UTF8 => match raw_bytes(content) {
                Some(bytes) => Payload::Text(decode_or_passthrough(self.codec, &bytes, key)),
                None => Payload::Text(content.to_string()),
            },
            _ => Payload::Text(content.to_string()),
        }
    }

    fn attachment(
        &self,
        headers: &HeaderMap,
        content_type: Option<&str>,
        payload: Payload,
    ) -> Attachment {
        let disposition = headers.get("Content-Disposition");

        let name = disposition
            .and_then(|value| extract_file_name(value, self.codec))
            .or_else(|| content_type.and_then(|value| extract_file_name(value, self.codec)))
            .map(|name| sanitize_file_name(&self.decode_header(&name)));

        let inline = disposition.is_some_and(|value| {
            value
                .trim_start()
                .get(..6)
                .is_some_and(|head| head.eq_ignore_ascii_case("inline"))
        });

        Attachment {
            id: headers.get("Content-ID").map(str::to_string),
            name,
            content_type: content_type.map(str::to_string),
            inline,
            data: match payload {
                Payload::Bytes(bytes) => AttachmentData::Bytes(bytes),
                Payload::Text(text) => AttachmentData::Text(text),
            },
        }
    }

    fn trace_decision(&self, kind: &str, content_type: &str, encoding: TransferEncoding) {
        if self.config.verbose_diagnostics {
            tracing::debug!(kind, content_type, %encoding, "Classified part");
        }
    }
}
