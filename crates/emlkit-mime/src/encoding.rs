//! MIME encoding and decoding utilities.
//!
//! Supports Base64, Quoted-Printable, and RFC 2047 header encoding.
//! Decoders here are lenient: malformed input degrades to the most
//! plausible text instead of failing.

use std::borrow::Cow;
use std::fmt::Write as _;

use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::STANDARD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

use crate::charset::{CharsetCodec, UTF8, decode_or_passthrough, normalize_charset};
use crate::error::Result;

/// Engine for base64 found in the wild: no padding required, stray
/// trailing bits accepted.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::RequireNone),
);

/// Maximum line length for Quoted-Printable and Base64 bodies.
pub const MAX_LINE_LENGTH: usize = 76;

/// Raw bytes that fit into one `=?utf-8?B?...?=` word of at most 75 chars.
const ENCODED_WORD_BYTES: usize = 45;

/// Encodes data as Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decodes Base64 data.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    STANDARD.decode(data).map_err(Into::into)
}

/// Decodes Base64 the way mail clients do.
///
/// Whitespace and characters outside the alphabet are skipped, decoding
/// stops at the first padding character, and a dangling sextet is
/// dropped.
///
/// # Errors
///
/// Returns an error only if the cleaned input still fails to decode.
pub fn decode_base64_lenient(data: &str) -> Result<Vec<u8>> {
    let mut cleaned: String = data
        .chars()
        .take_while(|&c| c != '=')
        .filter(|c| c.is_ascii_alphanumeric() || *c == '+' || *c == '/')
        .collect();
    if cleaned.len() % 4 == 1 {
        cleaned.pop();
    }
    LENIENT.decode(cleaned).map_err(Into::into)
}

/// Splits `text` into CRLF separated lines of at most `width` chars.
#[must_use]
pub fn wrap_lines(text: &str, width: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(width.max(1))
        .map(|chunk| chunk.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("\r\n")
}

/// Encodes text using Quoted-Printable encoding (RFC 2045).
///
/// CRLF pairs stay hard line breaks; bare CR or LF, `=`, non-ASCII
/// bytes and whitespace before a line break are escaped, so decoding
/// gives back exactly `text`.
#[must_use]
pub fn encode_quoted_printable(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut result = String::with_capacity(bytes.len());
    let mut line_length = 0;
    let mut i = 0;

    while i < bytes.len() {
        let byte = bytes[i];
        if byte == b'\r' && bytes.get(i + 1) == Some(&b'\n') {
            result.push_str("\r\n");
            line_length = 0;
            i += 2;
            continue;
        }

        let literal = match byte {
            b'!'..=b'<' | b'>'..=b'~' => true,
            b' ' | b'\t' => !ends_line(bytes, i + 1),
            _ => false,
        };
        let width = if literal { 1 } else { 3 };

        // Leave room for the trailing '=' of a soft line break
        if line_length + width > MAX_LINE_LENGTH - 1 {
            result.push_str("=\r\n");
            line_length = 0;
        }

        if literal {
            result.push(char::from(byte));
        } else {
            let _ = write!(result, "={byte:02X}");
        }
        line_length += width;
        i += 1;
    }

    result
}

fn ends_line(bytes: &[u8], at: usize) -> bool {
    match bytes.get(at) {
        None => true,
        Some(b'\r') => bytes.get(at + 1) == Some(&b'\n'),
        Some(_) => false,
    }
}

/// Decodes Quoted-Printable text into a string.
///
/// `charset` may be any spelling; it is normalized before use. For
/// UTF-8, runs of escapes are reassembled into multi-byte characters
/// (4-byte `F0`-`F7` leads, 3-byte `E0`-`EF`, 2-byte `C0`-`DF`), and a
/// lone byte that does not start a valid sequence becomes the code point
/// of the same value. Other charsets go through the codec. Soft line
/// breaks are removed. Underscores are left alone; they only mean space
/// inside encoded words.
#[must_use]
pub fn decode_quoted_printable(text: &str, charset: &str, codec: &dyn CharsetCodec) -> String {
    let key = normalize_charset(charset);
    let bytes = text.as_bytes();
    let mut result = String::with_capacity(text.len());
    let mut escaped: Vec<u8> = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'=' {
            if let Some(skip) = soft_line_break(&bytes[i + 1..]) {
                i += 1 + skip;
                continue;
            }
            if let (Some(hi), Some(lo)) = (
                bytes.get(i + 1).and_then(|b| hex_value(*b)),
                bytes.get(i + 2).and_then(|b| hex_value(*b)),
            ) {
                escaped.push((hi << 4) | lo);
                i += 3;
                continue;
            }
        }

        flush_escaped(&mut result, &mut escaped, &key, codec);
        // `i` always sits on a char boundary: escapes and '=' are ASCII
        let ch = text[i..].chars().next().unwrap_or_default();
        result.push(ch);
        i += ch.len_utf8().max(1);
    }

    flush_escaped(&mut result, &mut escaped, &key, codec);
    result
}

/// Length of a soft line break body after its `=`, if there is one.
fn soft_line_break(rest: &[u8]) -> Option<usize> {
    let blanks = rest
        .iter()
        .take_while(|b| **b == b' ' || **b == b'\t')
        .count();
    match &rest[blanks..] {
        [b'\r', b'\n', ..] => Some(blanks + 2),
        [b'\n', ..] => Some(blanks + 1),
        _ => None,
    }
}

const fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

fn flush_escaped(result: &mut String, escaped: &mut Vec<u8>, key: &str, codec: &dyn CharsetCodec) {
    if escaped.is_empty() {
        return;
    }
    if key == UTF8 {
        push_utf8_run(result, escaped);
    } else {
        result.push_str(&decode_or_passthrough(codec, escaped, key));
    }
    escaped.clear();
}

fn push_utf8_run(result: &mut String, run: &[u8]) {
    let mut j = 0;
    while j < run.len() {
        let width = match run[j] {
            0xF0..=0xF7 => 4,
            0xE0..=0xEF => 3,
            0xC0..=0xDF => 2,
            _ => 1,
        };
        if width > 1 {
            if let Some(Ok(ch)) = run.get(j..j + width).map(std::str::from_utf8) {
                result.push_str(ch);
                j += width;
                continue;
            }
        }
        result.push(char::from(run[j]));
        j += 1;
    }
}

/// Encodes a header value using RFC 2047 encoding.
///
/// ASCII values are returned unchanged. Otherwise the span from the
/// first to the last word holding non-ASCII characters is replaced by
/// `=?utf-8?B?...?=` words of at most 75 chars, separated by line breaks
/// so the header writer folds them. Adjacent encoded words are joined on
/// decode, so the spaces inside the span survive a round trip.
#[must_use]
pub fn encode_header_value(value: &str) -> String {
    if value.is_ascii() {
        return value.to_string();
    }

    let mut start = None;
    let mut end = 0;
    let mut offset = 0;
    for word in value.split(' ') {
        if !word.is_ascii() {
            start.get_or_insert(offset);
            end = offset + word.len();
        }
        offset += word.len() + 1;
    }
    let start = start.unwrap_or_default();

    let mut words = Vec::new();
    let mut chunk = String::new();
    for ch in value[start..end].chars() {
        if chunk.len() + ch.len_utf8() > ENCODED_WORD_BYTES {
            words.push(format!("=?utf-8?B?{}?=", encode_base64(chunk.as_bytes())));
            chunk.clear();
        }
        chunk.push(ch);
    }
    if !chunk.is_empty() {
        words.push(format!("=?utf-8?B?{}?=", encode_base64(chunk.as_bytes())));
    }

    format!("{}{}{}", &value[..start], words.join("\r\n"), &value[end..])
}

/// Decodes RFC 2047 encoded words in a header value.
///
/// Encoded words separated only by whitespace are glued together first,
/// so one logical token split over several words (or folded lines)
/// decodes as one. A word without charset uses `default_charset`. Words
/// that cannot be decoded are left as they are.
#[must_use]
pub fn decode_header_value(text: &str, default_charset: &str, codec: &dyn CharsetCodec) -> String {
    let joined = join_adjacent_words(text);
    let mut result = String::with_capacity(joined.len());
    let mut rest = joined.as_ref();

    while let Some(start) = rest.find("=?") {
        result.push_str(&rest[..start]);
        let candidate = &rest[start..];
        match EncodedWord::parse(candidate) {
            Some((word, consumed)) => {
                match word.decode(default_charset, codec) {
                    Some(decoded) => result.push_str(&decoded),
                    None => result.push_str(&candidate[..consumed]),
                }
                rest = &candidate[consumed..];
            }
            None => {
                result.push_str("=?");
                rest = &candidate[2..];
            }
        }
    }

    result.push_str(rest);
    result
}

/// Rewrites `?=<whitespace>=?` as `?==?` (RFC 2047 section 6.2).
fn join_adjacent_words(text: &str) -> Cow<'_, str> {
    if !text.contains("?=") {
        return Cow::Borrowed(text);
    }

    let mut result = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find("?=") {
        let (head, tail) = rest.split_at(pos + 2);
        result.push_str(head);
        let trimmed = tail.trim_start();
        rest = if trimmed.len() < tail.len() && trimmed.starts_with("=?") {
            trimmed
        } else {
            tail
        };
    }
    result.push_str(rest);
    Cow::Owned(result)
}

/// One `=?charset?encoding?payload?=` token.
#[derive(Debug, PartialEq, Eq)]
struct EncodedWord<'a> {
    charset: &'a str,
    base64: bool,
    payload: &'a str,
}

impl<'a> EncodedWord<'a> {
    /// Parses a word at the start of `text`, returning it with the
    /// number of bytes it spans.
    fn parse(text: &'a str) -> Option<(Self, usize)> {
        let inner = text.strip_prefix("=?")?;
        let (charset, rest) = inner.split_once('?')?;
        let base64 = match rest.as_bytes() {
            [b'B' | b'b', b'?', ..] => true,
            [b'Q' | b'q', b'?', ..] => false,
            _ => return None,
        };
        let data = &rest[2..];
        // The payload holds at least one char and ends at the first "?="
        let end = data.get(1..)?.find("?=")? + 1;
        let payload = &data[..end];
        if payload.contains(['\r', '\n']) {
            return None;
        }
        let consumed = 2 + charset.len() + 1 + 2 + end + 2;
        Some((
            Self {
                charset,
                base64,
                payload,
            },
            consumed,
        ))
    }

    fn decode(&self, default_charset: &str, codec: &dyn CharsetCodec) -> Option<String> {
        let charset = if self.charset.is_empty() {
            default_charset
        } else {
            self.charset
        };
        let key = normalize_charset(charset);

        if self.base64 {
            let bytes = decode_base64_lenient(self.payload).ok()?;
            Some(decode_or_passthrough(codec, &bytes, &key))
        } else {
            let spaced = self.payload.replace('_', " ");
            Some(decode_quoted_printable(&spaced, &key, codec))
        }
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
    use crate::charset::EncodingRsCodec;

    const CODEC: EncodingRsCodec = EncodingRsCodec::new();

    #[test]
    fn test_base64_encode_decode() {
        let data = b"Hello, World!";
        let encoded = encode_base64(data);
        assert_eq!(encoded, "SGVsbG8sIFdvcmxkIQ==");

        let decoded = decode_base64(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_base64_lenient() {
        let decoded = decode_base64_lenient("SGVsbG8s\r\nIFdvcmxk\r\nIQ==").unwrap();
        assert_eq!(decoded, b"Hello, World!");

        let decoded = decode_base64_lenient("VGVzdA").unwrap();
        assert_eq!(decoded, b"Test");
    }

    #[test]
    fn test_wrap_lines() {
        assert_eq!(wrap_lines("abcdefg", 3), "abc\r\ndef\r\ng");
        assert_eq!(wrap_lines("", 76), "");
    }

    #[test]
    fn test_quoted_printable_encode() {
        let text = "Hello, World!";
        let encoded = encode_quoted_printable(text);
        assert_eq!(encoded, "Hello, World!");

        let text = "Héllo, Wørld!";
        let encoded = encode_quoted_printable(text);
        assert!(encoded.contains("=C3"));
    }

    #[test]
    fn test_quoted_printable_encode_line_handling() {
        assert_eq!(encode_quoted_printable("a \r\nb"), "a=20\r\nb");
        assert_eq!(encode_quoted_printable("a\nb"), "a=0Ab");
        assert_eq!(encode_quoted_printable("x=y"), "x=3Dy");

        let long = "a".repeat(100);
        let encoded = encode_quoted_printable(&long);
        assert!(encoded.lines().all(|line| line.len() <= MAX_LINE_LENGTH));
        assert_eq!(decode_quoted_printable(&encoded, "utf-8", &CODEC), long);
    }

    #[test]
    fn test_quoted_printable_decode() {
        let decoded = decode_quoted_printable("Hello, World!", "utf-8", &CODEC);
        assert_eq!(decoded, "Hello, World!");

        let decoded = decode_quoted_printable("H=C3=A9llo", "utf-8", &CODEC);
        assert_eq!(decoded, "Héllo");
    }

    #[test]
    fn test_quoted_printable_soft_line_break() {
        let decoded = decode_quoted_printable("Hello=\r\nWorld", "utf-8", &CODEC);
        assert_eq!(decoded, "HelloWorld");

        let decoded = decode_quoted_printable("Hello= \nWorld", "utf-8", &CODEC);
        assert_eq!(decoded, "HelloWorld");
    }

    #[test]
    fn test_quoted_printable_four_byte_sequence() {
        let decoded = decode_quoted_printable("smile =F0=9F=98=80!", "UTF-8", &CODEC);
        assert_eq!(decoded, "smile \u{1F600}!");
    }

    #[test]
    fn test_quoted_printable_sequence_split_by_soft_break() {
        let decoded = decode_quoted_printable("=E2=82=\r\n=AC", "utf-8", &CODEC);
        assert_eq!(decoded, "€");
    }

    #[test]
    fn test_quoted_printable_lone_byte_in_utf8() {
        let decoded = decode_quoted_printable("caf=E9 =E2=F0=9F=98=80", "utf-8", &CODEC);
        assert_eq!(decoded, "caf\u{e9} \u{e2}\u{1F600}");
    }

    #[test]
    fn test_quoted_printable_single_byte_charset() {
        let decoded = decode_quoted_printable("=A1=C6=CA_ok", "iso-8859-2", &CODEC);
        assert_eq!(decoded, "ĄĆĘ_ok");
    }

    #[test]
    fn test_quoted_printable_invalid_escape_kept() {
        let decoded = decode_quoted_printable("a=ZZb=", "utf-8", &CODEC);
        assert_eq!(decoded, "a=ZZb=");
    }

    #[test]
    fn test_encode_header_value() {
        assert_eq!(encode_header_value("Hello"), "Hello");

        let encoded = encode_header_value("Jörg Müller <j@example.com>");
        assert!(encoded.starts_with("=?utf-8?B?"));
        assert!(encoded.ends_with("?= <j@example.com>"));
        assert_eq!(
            decode_header_value(&encoded, "utf-8", &CODEC),
            "Jörg Müller <j@example.com>"
        );
    }

    #[test]
    fn test_encode_header_value_long() {
        let subject = "Zażółć gęślą jaźń ".repeat(6);
        let encoded = encode_header_value(subject.trim_end());
        assert!(encoded.lines().all(|line| line.len() <= 75));
        assert!(encoded.lines().count() > 1);
        assert_eq!(
            decode_header_value(&encoded, "utf-8", &CODEC),
            subject.trim_end()
        );
    }

    #[test]
    fn test_decode_header_value() {
        assert_eq!(decode_header_value("Hello", "utf-8", &CODEC), "Hello");
        assert_eq!(
            decode_header_value("=?UTF-8?B?VGVzdA==?=", "utf-8", &CODEC),
            "Test"
        );
        assert_eq!(
            decode_header_value("=?UTF-8?Q?A=20B?=", "utf-8", &CODEC),
            "A B"
        );
        assert_eq!(
            decode_header_value("=?utf-8?Q?H=C3=A9llo_world?=", "utf-8", &CODEC),
            "Héllo world"
        );
    }

    #[test]
    fn test_decode_header_value_mixed() {
        let text = concat!(
            "Start: =?UTF-8?B?xITEhg==?=",
            "=?UTF-8?Q? | =C5=9B |?=",
            "  ABC=?iso-8859-2?Q? =A1=C6?=  stop."
        );
        assert_eq!(
            decode_header_value(text, "utf-8", &CODEC),
            "Start: ĄĆ | ś |  ABC ĄĆ  stop."
        );
    }

    #[test]
    fn test_decode_header_value_joins_folded_words() {
        let text = "=?UTF-8?B?SGVs?=\r\n =?UTF-8?B?bG8=?=";
        assert_eq!(decode_header_value(text, "utf-8", &CODEC), "Hello");
    }

    #[test]
    fn test_decode_header_value_malformed_left_alone() {
        assert_eq!(
            decode_header_value("a =?utf-8?X?abc?= b", "utf-8", &CODEC),
            "a =?utf-8?X?abc?= b"
        );
        assert_eq!(decode_header_value("=?utf-8?B?", "utf-8", &CODEC), "=?utf-8?B?");
    }

    #[test]
    fn test_decode_header_value_default_charset() {
        assert_eq!(
            decode_header_value("=??Q?caf=E9?=", "iso-8859-1", &CODEC),
            "café"
        );
    }
}
