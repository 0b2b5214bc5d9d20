//! Parser, reader and builder configuration.

/// Default charset for parts that do not declare one.
pub const DEFAULT_CHARSET: &str = "iso-8859-1";

/// Immutable configuration shared by the parser, reader and builder.
///
/// One value can be handed to any number of threads; nothing in the
/// crate mutates it after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Charset used when a part declares none.
    pub default_charset: String,
    /// Recognize boundary lines even when the previous line is not blank.
    ///
    /// Older and broken producers omit the blank line before a delimiter.
    pub lenient_boundary_detection: bool,
    /// Stop after the header block and leave the body absent.
    pub headers_only: bool,
    /// Emit structure diagnostics through `tracing`.
    pub verbose_diagnostics: bool,
    /// Mime type to file extension table for unnamed attachments.
    pub file_extensions: Vec<(String, String)>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_charset: DEFAULT_CHARSET.to_string(),
            lenient_boundary_detection: true,
            headers_only: false,
            verbose_diagnostics: false,
            file_extensions: default_file_extensions(),
        }
    }
}

impl Config {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Returns the file extension (with leading dot) for a mime type.
    ///
    /// Parameters after `;` are ignored. Unknown types give `""`.
    #[must_use]
    pub fn file_extension(&self, mime_type: &str) -> &str {
        let bare = mime_type.split(';').next().unwrap_or_default().trim();
        self.file_extensions
            .iter()
            .find(|(mime, _)| mime.eq_ignore_ascii_case(bare))
            .map_or("", |(_, ext)| ext.as_str())
    }
}

fn default_file_extensions() -> Vec<(String, String)> {
    [
        ("text/plain", ".txt"),
        ("text/html", ".html"),
        ("image/png", ".png"),
        ("image/jpg", ".jpg"),
        ("image/jpeg", ".jpg"),
    ]
    .into_iter()
    .map(|(mime, ext)| (mime.to_string(), ext.to_string()))
    .collect()
}

/// Builder for [`Config`].
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Creates a builder holding the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default charset.
    #[must_use]
    pub fn default_charset(mut self, charset: impl Into<String>) -> Self {
        self.config.default_charset = charset.into();
        self
    }

    /// Enables or disables lenient boundary detection.
    #[must_use]
    pub const fn lenient_boundary_detection(mut self, enabled: bool) -> Self {
        self.config.lenient_boundary_detection = enabled;
        self
    }

    /// Enables or disables headers-only parsing.
    #[must_use]
    pub const fn headers_only(mut self, enabled: bool) -> Self {
        self.config.headers_only = enabled;
        self
    }

    /// Enables or disables verbose diagnostics.
    #[must_use]
    pub const fn verbose_diagnostics(mut self, enabled: bool) -> Self {
        self.config.verbose_diagnostics = enabled;
        self
    }

    /// Adds or replaces a file extension mapping.
    #[must_use]
    pub fn file_extension(mut self, mime_type: impl Into<String>, ext: impl Into<String>) -> Self {
        let mime_type = mime_type.into();
        let ext = ext.into();
        match self
            .config
            .file_extensions
            .iter_mut()
            .find(|(mime, _)| mime.eq_ignore_ascii_case(&mime_type))
        {
            Some(entry) => entry.1 = ext,
            None => self.config.file_extensions.push((mime_type, ext)),
        }
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> Config {
        self.config
    }
}
