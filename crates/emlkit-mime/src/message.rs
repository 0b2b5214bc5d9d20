//! Decoded message representation produced by the reader.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::date;
use crate::header::HeaderMap;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit text.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
    /// `8bitmime`, as written by some legacy producers.
    EightBitMime,
    /// `binarymime`, as written by some legacy producers.
    BinaryMime,
    /// Anything else; content passes through unchanged.
    Unknown,
}

impl TransferEncoding {
    /// Parses transfer encoding from string, ignoring case.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "7bit" => Self::SevenBit,
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            "8bitmime" => Self::EightBitMime,
            "binarymime" => Self::BinaryMime,
            _ => Self::Unknown,
        }
    }

    /// Checks whether content is raw 8-bit data in its declared charset.
    #[must_use]
    pub const fn is_raw_8bit(self) -> bool {
        matches!(
            self,
            Self::EightBit | Self::Binary | Self::EightBitMime | Self::BinaryMime
        )
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Binary => write!(f, "binary"),
            Self::EightBitMime => write!(f, "8bitmime"),
            Self::BinaryMime => write!(f, "binarymime"),
            Self::Unknown => write!(f, "x-unknown"),
        }
    }
}

/// Payload of an attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AttachmentData {
    /// Binary payload decoded from base64.
    Bytes(Vec<u8>),
    /// Text payload from any other transfer encoding.
    Text(String),
}

impl AttachmentData {
    /// Returns the payload bytes; text is given as UTF-8.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Bytes(bytes) => bytes,
            Self::Text(text) => text.as_bytes(),
        }
    }

    /// Returns the payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Checks whether the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

impl Default for AttachmentData {
    fn default() -> Self {
        Self::Bytes(Vec::new())
    }
}

/// One attachment of a [`FriendlyMessage`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Attachment {
    /// Value of `Content-ID`.
    pub id: Option<String>,
    /// Decoded and sanitized file name.
    pub name: Option<String>,
    /// `Content-Type` value as found.
    pub content_type: Option<String>,
    /// Whether `Content-Disposition` starts with `inline`.
    pub inline: bool,
    /// Decoded payload.
    pub data: AttachmentData,
}

impl Attachment {
    /// Creates an attachment from a name, content type and bytes.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
            content_type: Some(content_type.into()),
            inline: false,
            data: AttachmentData::Bytes(data.into()),
        }
    }

    /// Marks the attachment inline with the given content id.
    #[must_use]
    pub fn inline(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self.inline = true;
        self
    }
}

/// A message reduced to the fields mail tools care about.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FriendlyMessage {
    /// Parsed `Date`, or a sentinel when absent or unparsable.
    pub date: DateTime<Utc>,
    /// Decoded `Subject`.
    pub subject: Option<String>,
    /// Decoded `From`.
    pub from: Option<String>,
    /// Decoded `To`.
    pub to: Option<String>,
    /// `Message-ID` as found.
    pub message_id: Option<String>,
    /// `References` as found.
    pub references: Option<String>,
    /// All top-level headers.
    pub headers: HeaderMap,
    /// First `text/plain` body.
    pub text: Option<String>,
    /// First `text/html` body.
    pub html: Option<String>,
    /// Everything else, in encounter order.
    pub attachments: Vec<Attachment>,
}

impl Default for FriendlyMessage {
    fn default() -> Self {
        Self {
            date: date::missing_date(),
            subject: None,
            from: None,
            to: None,
            message_id: None,
            references: None,
            headers: HeaderMap::new(),
            text: None,
            html: None,
            attachments: Vec::new(),
        }
    }
}

impl FriendlyMessage {
    /// Checks whether `date` is a substitute for a missing or broken
    /// `Date` header.
    #[must_use]
    pub fn has_sentinel_date(&self) -> bool {
        date::is_sentinel(&self.date)
    }

    /// File name for the attachment at `index`.
    ///
    /// Unnamed attachments get `attachment_<n>` plus the extension
    /// configured for their content type, counting from 1. Names that
    /// are empty or only dots count as unnamed.
    #[must_use]
    pub fn attachment_file_name(&self, index: usize, config: &Config) -> Option<String> {
        let attachment = self.attachments.get(index)?;
        let name = attachment
            .name
            .as_deref()
            .filter(|name| !name.trim().trim_matches('.').is_empty())
            .map_or_else(
                || {
                    let ext = attachment
                        .content_type
                        .as_deref()
                        .map_or("", |mime| config.file_extension(mime));
                    format!("attachment_{}{ext}", index + 1)
                },
                str::to_string,
            );
        Some(name)
    }
}
