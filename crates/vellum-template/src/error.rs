use thiserror::Error;

/// Errors raised while configuring a [`TemplateCompiler`](crate::TemplateCompiler).
///
/// Rendering itself never fails; see [`CompiledTemplate::render`](crate::CompiledTemplate::render).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template delimiters must not be empty")]
    EmptyDelimiter,
    #[cfg(feature = "config-file")]
    #[error("invalid compiler config: {0}")]
    Config(String),
}
