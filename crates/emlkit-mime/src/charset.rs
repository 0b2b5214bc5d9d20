//! Charset codec interface and the `encoding_rs` backed default.
//!
//! The core never special-cases encodings beyond "UTF-8 or ask the
//! codec". Charset names are first collapsed to a lookup key with
//! [`normalize_charset`]; alias resolution is the codec's job.

use encoding_rs::Encoding;

use crate::error::{Error, Result};

/// Normalized key for UTF-8.
pub const UTF8: &str = "utf8";

/// Converts between bytes and text for a normalized charset key.
pub trait CharsetCodec: Send + Sync {
    /// Decodes `bytes` in the charset identified by `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedCharset`] if the key is unknown.
    fn decode(&self, bytes: &[u8], key: &str) -> Result<String>;

    /// Encodes `text` into the charset identified by `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedCharset`] if the key is unknown.
    fn encode(&self, text: &str, key: &str) -> Result<Vec<u8>>;
}

/// Collapses a charset name into a codec lookup key.
///
/// Lowercases and drops everything that is not ASCII alphanumeric, so
/// `ISO_8859-1`, `iso-8859-1` and `ISO8859-1` share the key `iso88591`.
/// An RFC 2231 language suffix (`utf-8*en`) is cut first.
#[must_use]
pub fn normalize_charset(name: &str) -> String {
    let name = name.split('*').next().unwrap_or_default();
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Decodes through the codec, falling back to lossy UTF-8.
///
/// Unknown charsets must never abort a read, so the failure is only
/// logged.
#[must_use]
pub fn decode_or_passthrough(codec: &dyn CharsetCodec, bytes: &[u8], key: &str) -> String {
    if key == UTF8 {
        return String::from_utf8_lossy(bytes).into_owned();
    }
    codec.decode(bytes, key).unwrap_or_else(|e| {
        tracing::warn!(charset = key, error = %e, "Falling back to UTF-8 pass-through");
        String::from_utf8_lossy(bytes).into_owned()
    })
}

/// Recovers the raw 8-bit bytes behind text that was read byte-for-char.
///
/// Returns `Some` only when every char is at most U+00FF and at least
/// one is non-ASCII. Text holding wider chars is already decoded, and
/// pure ASCII reads the same in every supported charset.
///
/// Text that arrived as valid UTF-8 but only uses U+0080..=U+00FF can't
/// be told apart from byte-mapped input, so it is recovered too. Decoding
/// the result as windows-1252 then turns a UTF-8 U+0080 into `€`.
#[must_use]
pub fn raw_bytes(text: &str) -> Option<Vec<u8>> {
    let mut has_high = false;
    let mut bytes = Vec::with_capacity(text.len());
    for ch in text.chars() {
        let byte = u8::try_from(u32::from(ch)).ok()?;
        has_high |= !byte.is_ascii();
        bytes.push(byte);
    }
    has_high.then_some(bytes)
}

/// Charsets reachable by canonical name when the WHATWG label table
/// does not list the normalized form.
static ENCODINGS: &[&Encoding] = &[
    encoding_rs::UTF_8,
    encoding_rs::WINDOWS_1250,
    encoding_rs::WINDOWS_1251,
    encoding_rs::WINDOWS_1252,
    encoding_rs::WINDOWS_1253,
    encoding_rs::WINDOWS_1254,
    encoding_rs::WINDOWS_1255,
    encoding_rs::WINDOWS_1256,
    encoding_rs::WINDOWS_1257,
    encoding_rs::WINDOWS_1258,
    encoding_rs::WINDOWS_874,
    encoding_rs::ISO_8859_2,
    encoding_rs::ISO_8859_3,
    encoding_rs::ISO_8859_4,
    encoding_rs::ISO_8859_5,
    encoding_rs::ISO_8859_6,
    encoding_rs::ISO_8859_7,
    encoding_rs::ISO_8859_8,
    encoding_rs::ISO_8859_10,
    encoding_rs::ISO_8859_13,
    encoding_rs::ISO_8859_14,
    encoding_rs::ISO_8859_15,
    encoding_rs::ISO_8859_16,
    encoding_rs::KOI8_R,
    encoding_rs::KOI8_U,
    encoding_rs::IBM866,
    encoding_rs::MACINTOSH,
    encoding_rs::X_MAC_CYRILLIC,
];

/// Default codec backed by `encoding_rs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodingRsCodec;

impl EncodingRsCodec {
    /// Creates the codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Resolves a normalized key to an encoding.
    #[must_use]
    pub fn lookup(key: &str) -> Option<&'static Encoding> {
        if key.is_empty() {
            return None;
        }
        Encoding::for_label(key.as_bytes())
            .or_else(|| {
                ENCODINGS
                    .iter()
                    .copied()
                    .find(|encoding| normalize_charset(encoding.name()) == key)
            })
            .or_else(|| Self::lookup_alias(key))
    }

    fn lookup_alias(key: &str) -> Option<&'static Encoding> {
        // win1250, cp1250 and friends
        let page = key
            .strip_prefix("win")
            .or_else(|| key.strip_prefix("cp"))
            .filter(|rest| rest.bytes().all(|b| b.is_ascii_digit()))?;
        Encoding::for_label(format!("windows-{page}").as_bytes())
            .or_else(|| Encoding::for_label(format!("ibm{page}").as_bytes()))
    }
}

impl CharsetCodec for EncodingRsCodec {
    fn decode(&self, bytes: &[u8], key: &str) -> Result<String> {
        if key == UTF8 {
            return Ok(String::from_utf8_lossy(bytes).into_owned());
        }
        let encoding =
            Self::lookup(key).ok_or_else(|| Error::UnsupportedCharset(key.to_string()))?;
        let (text, _had_errors) = encoding.decode_without_bom_handling(bytes);
        Ok(text.into_owned())
    }

    fn encode(&self, text: &str, key: &str) -> Result<Vec<u8>> {
        if key == UTF8 {
            return Ok(text.as_bytes().to_vec());
        }
        let encoding =
            Self::lookup(key).ok_or_else(|| Error::UnsupportedCharset(key.to_string()))?;
        let (bytes, _, _had_errors) = encoding.encode(text);
        Ok(bytes.into_owned())
    }
}
