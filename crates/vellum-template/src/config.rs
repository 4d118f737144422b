//! Compiler configuration: delimiters and output escaping.

use crate::TemplateError;

/// Configuration shared by every template a compiler produces.
///
/// Delimiters are fixed per compiler instance; there is no per-call
/// override.
///
/// # Example
///
/// ```
/// use vellum_template::CompilerConfig;
///
/// let config = CompilerConfig::new().delimiters("[[", "]]").escape(false);
/// assert_eq!(config.open, "[[");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "config-file",
    derive(serde::Deserialize),
    serde(default, deny_unknown_fields)
)]
pub struct CompilerConfig {
    /// Opening delimiter. Default `{{`.
    pub open: String,
    /// Closing delimiter. Default `}}`.
    pub close: String,
    /// HTML-escape interpolated values. Literal template text is never
    /// escaped. Default `true`.
    pub escape: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            open: "{{".to_string(),
            close: "}}".to_string(),
            escape: true,
        }
    }
}

impl CompilerConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set both delimiters.
    #[must_use]
    pub fn delimiters(mut self, open: impl Into<String>, close: impl Into<String>) -> Self {
        self.open = open.into();
        self.close = close.into();
        self
    }

    /// Enable or disable escaping of interpolated values.
    #[must_use]
    pub fn escape(mut self, escape: bool) -> Self {
        self.escape = escape;
        self
    }

    /// Reject configurations the scanner cannot work with.
    pub fn validate(&self) -> Result<(), TemplateError> {
        if self.open.is_empty() || self.close.is_empty() {
            return Err(TemplateError::EmptyDelimiter);
        }
        Ok(())
    }

    /// Parse and validate a TOML document such as
    ///
    /// ```toml
    /// open = "[["
    /// close = "]]"
    /// escape = false
    /// ```
    ///
    /// Missing keys keep their defaults.
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(src: &str) -> Result<Self, TemplateError> {
        let config: Self =
            toml::from_str(src).map_err(|err| TemplateError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML config file.
    #[cfg(feature = "config-file")]
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self, TemplateError> {
        let src = std::fs::read_to_string(path.as_ref())
            .map_err(|err| TemplateError::Config(err.to_string()))?;
        Self::from_toml_str(&src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = CompilerConfig::default();
        assert_eq!(config.open, "{{");
        assert_eq!(config.close, "}}");
        assert!(config.escape);
    }

    #[test]
    fn empty_delimiters_are_rejected() {
        assert_eq!(
            CompilerConfig::new().delimiters("", "}}").validate(),
            Err(TemplateError::EmptyDelimiter)
        );
        assert_eq!(
            CompilerConfig::new().delimiters("<%", "").validate(),
            Err(TemplateError::EmptyDelimiter)
        );
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn toml_overrides_and_defaults() {
        let config = CompilerConfig::from_toml_str("open = \"<%\"\nclose = \"%>\"\n").unwrap();
        assert_eq!(config.open, "<%");
        assert_eq!(config.close, "%>");
        assert!(config.escape, "unspecified keys keep defaults");

        assert!(matches!(
            CompilerConfig::from_toml_str("open = \"\""),
            Err(TemplateError::EmptyDelimiter)
        ));
        assert!(matches!(
            CompilerConfig::from_toml_str("delims = 1"),
            Err(TemplateError::Config(_))
        ));
    }
}
