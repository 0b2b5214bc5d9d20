//! Error types for MIME operations.

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME error types.
///
/// Parsing and reading degrade gracefully on malformed input, so only a
/// few of these ever reach the caller of [`crate::MimeEngine`]:
/// [`Error::InvalidInput`] from parsing and [`Error::MissingRecipient`]
/// from building. The others come out of the strict helper functions.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input is not message text.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Structure that could not be interpreted as declared.
    ///
    /// Diagnostic only: the parser logs it and falls back to a simpler
    /// interpretation.
    #[error("Malformed structure: {0}")]
    MalformedStructure(String),

    /// The message has no `To` recipient.
    #[error("Missing 'To' recipient")]
    MissingRecipient,

    /// The charset codec does not know this charset key.
    #[error("Unsupported charset: {0}")]
    UnsupportedCharset(String),

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),
}
