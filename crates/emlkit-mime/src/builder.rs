//! Message builder: the inverse of the reader.

use std::fmt::Write as _;

use rand::Rng;

use crate::config::Config;
use crate::content_type::{ContentType, sanitize_file_name};
use crate::encoding::{
    MAX_LINE_LENGTH, encode_base64, encode_header_value, encode_quoted_printable, wrap_lines,
};
use crate::error::{Error, Result};
use crate::header::HeaderMap;
use crate::message::{Attachment, FriendlyMessage};

/// Headers that describe the structure of a source message and are
/// regenerated on build.
fn is_structural(name: &str) -> bool {
    name.get(..8)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("content-"))
        || name.eq_ignore_ascii_case("MIME-Version")
}

/// Builder for raw MIME messages.
///
/// The output is always `multipart/mixed`: a `text/plain` part, an
/// `text/html` part and one part per attachment, each only if present.
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    headers: HeaderMap,
    text: Option<String>,
    html: Option<String>,
    attachments: Vec<Attachment>,
    boundary: Option<String>,
}

impl MessageBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a read message, keeping its headers and content.
    ///
    /// `Content-*` and `MIME-Version` headers are dropped since the
    /// rebuilt structure differs from the source.
    #[must_use]
    pub fn from_message(message: &FriendlyMessage) -> Self {
        let mut builder = Self::new();
        for (name, value) in message.headers.iter() {
            if !is_structural(name) {
                builder.headers.add(name, value);
            }
        }
        if let Some(to) = &message.to {
            builder.headers.set("To", to.as_str());
        }
        if let Some(from) = &message.from {
            builder.headers.set("From", from.as_str());
        }
        if let Some(subject) = &message.subject {
            builder.headers.set("Subject", subject.as_str());
        }
        builder.text.clone_from(&message.text);
        builder.html.clone_from(&message.html);
        builder.attachments.clone_from(&message.attachments);
        builder
    }

    /// Sets the recipient.
    #[must_use]
    pub fn to(mut self, to: impl Into<String>) -> Self {
        self.headers.set("To", to);
        self
    }

    /// Sets the sender.
    #[must_use]
    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.headers.set("From", from);
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.headers.set("Subject", subject);
        self
    }

    /// Adds a header. Repeated names are emitted once per value.
    #[must_use]
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.add(name, value);
        self
    }

    /// Sets the plain text body.
    #[must_use]
    pub fn text_body(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Sets the HTML body.
    #[must_use]
    pub fn html_body(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    /// Adds an attachment.
    #[must_use]
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Uses a fixed boundary instead of a random one.
    #[must_use]
    pub fn boundary(mut self, boundary: impl Into<String>) -> Self {
        self.boundary = Some(boundary.into());
        self
    }

    /// Builds the raw message with CRLF line endings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingRecipient`] if no `To` header is set.
    pub fn build(&self, config: &Config) -> Result<String> {
        if self
            .headers
            .get("To")
            .is_none_or(|to| to.trim().is_empty())
        {
            return Err(Error::MissingRecipient);
        }

        let mut headers = HeaderMap::new();
        for (name, value) in self.headers.iter() {
            if ["To", "From", "Subject"]
                .iter()
                .any(|encoded| name.eq_ignore_ascii_case(encoded))
            {
                headers.add(name, encode_header_value(value));
            } else {
                headers.add(name, value);
            }
        }

        let boundary = self.resolve_boundary(&mut headers);
        if !headers.contains("MIME-Version") {
            headers.add("MIME-Version", "1.0");
        }

        let mut message = headers.to_string();
        message.push_str("\r\n");

        if let Some(text) = &self.text {
            write_text_part(&mut message, &boundary, &ContentType::text_plain(), text);
        }
        if let Some(html) = &self.html {
            write_text_part(&mut message, &boundary, &ContentType::text_html(), html);
        }
        for (index, attachment) in self.attachments.iter().enumerate() {
            write_attachment(&mut message, &boundary, index, attachment, config);
        }

        let _ = write!(message, "--{boundary}--\r\n");
        Ok(message)
    }

    /// Reuses the boundary of an explicit multipart `Content-Type`,
    /// otherwise installs `multipart/mixed` with a fresh one.
    fn resolve_boundary(&self, headers: &mut HeaderMap) -> String {
        if let Some(boundary) = &self.boundary {
            headers.set(
                "Content-Type",
                ContentType::multipart_mixed(boundary.as_str()).to_string(),
            );
            return boundary.clone();
        }

        let explicit = headers
            .get("Content-Type")
            .and_then(|value| ContentType::parse(value).ok())
            .filter(ContentType::is_multipart)
            .and_then(|content_type| content_type.boundary().map(str::to_string))
            .filter(|boundary| !boundary.is_empty());
        if let Some(boundary) = explicit {
            return boundary;
        }

        let boundary = generate_boundary();
        headers.set(
            "Content-Type",
            ContentType::multipart_mixed(boundary.as_str()).to_string(),
        );
        boundary
    }
}

/// Generates a random boundary token.
#[must_use]
pub fn generate_boundary() -> String {
    let token: u128 = rand::thread_rng().r#gen();
    format!("----=_Part_{token:032x}")
}

fn write_text_part(message: &mut String, boundary: &str, content_type: &ContentType, body: &str) {
    let _ = write!(
        message,
        "--{boundary}\r\n\
         Content-Type: {content_type}\r\n\
         Content-Transfer-Encoding: quoted-printable\r\n\
         \r\n\
         {}\r\n\
         \r\n",
        encode_quoted_printable(body)
    );
}

fn write_attachment(
    message: &mut String,
    boundary: &str,
    index: usize,
    attachment: &Attachment,
    config: &Config,
) {
    let content_type = attachment
        .content_type
        .as_deref()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or("application/octet-stream");

    let name = match attachment.name.as_deref().filter(|name| !name.is_empty()) {
        Some(name) => sanitize_file_name(name),
        None => format!("attachment_{}{}", index + 1, config.file_extension(content_type)),
    };
    let disposition = if attachment.inline { "inline" } else { "attachment" };

    let mut headers = HeaderMap::new();
    headers.add("Content-Type", content_type);
    headers.add("Content-Transfer-Encoding", "base64");
    headers.add(
        "Content-Disposition",
        format!("{disposition}; filename=\"{}\"", encode_header_value(&name)),
    );
    if let Some(id) = &attachment.id {
        headers.add("Content-ID", id.as_str());
    }

    let payload = wrap_lines(&encode_base64(attachment.data.as_bytes()), MAX_LINE_LENGTH);
    let _ = write!(message, "--{boundary}\r\n{headers}\r\n{payload}\r\n\r\n");
}
