//! Template compilation, caching, and rendering.
//!
//! A template string is scanned once into a sequence of literal text and
//! interpolation tokens. Each interpolation body is parsed eagerly; a body
//! that fails to parse is kept with its error so rendering can report it
//! and substitute an empty string without aborting the rest of the output.
//!
//! # Invariants
//!
//! 1. For a given compiler, compiling the same template string twice
//!    returns the same [`Rc`] and performs the scan once.
//! 2. Rendering never fails; each failing interpolation contributes `""`
//!    and emits one `warn` event.
//! 3. Literal text is copied verbatim. Only interpolated values are
//!    escaped.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Unterminated opening delimiter | Remainder is literal text |
//! | Empty interpolation body (`{{ }}`) | Parse error, renders `""` |
//! | Unknown identifier | Evaluation error, renders `""` |
//! | Value is `undefined` | Renders `""` (no warning) |

use std::cell::{Cell, RefCell};
use std::fmt::{self, Write as _};
use std::rc::Rc;

use ahash::AHashMap;
use vellum_core::Value;
use vellum_expr::{Expr, ExprError, ParseError, Scope};

use crate::{CompilerConfig, TemplateError};

/// One segment of a compiled template.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Literal text, emitted verbatim.
    Text(String),
    /// An interpolation between delimiters.
    Expression(Interpolation),
}

/// A parsed (or unparseable) interpolation body.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpolation {
    raw: String,
    parsed: Result<Expr, ParseError>,
}

impl Interpolation {
    fn new(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            parsed: vellum_expr::parse(raw),
        }
    }

    /// Expression source with surrounding whitespace trimmed.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The parsed tree, or the parse error captured at compile time.
    pub fn parsed(&self) -> Result<&Expr, &ParseError> {
        self.parsed.as_ref()
    }

    /// Evaluate against `scope`. Parse errors surface here.
    pub fn evaluate(&self, scope: &dyn Scope) -> Result<Value, ExprError> {
        match &self.parsed {
            Ok(expr) => Ok(vellum_expr::evaluate(expr, scope)?),
            Err(err) => Err(ExprError::Parse(err.clone())),
        }
    }
}

/// Immutable result of compiling one template string.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTemplate {
    tokens: Vec<Token>,
    escape: bool,
}

impl CompiledTemplate {
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Iterate over interpolations only.
    pub fn interpolations(&self) -> impl Iterator<Item = &Interpolation> {
        self.tokens.iter().filter_map(|token| match token {
            Token::Expression(expr) => Some(expr),
            Token::Text(_) => None,
        })
    }

    /// Produce the output string for `scope`.
    #[must_use]
    pub fn render(&self, scope: &dyn Scope) -> String {
        let mut out = String::new();
        for token in &self.tokens {
            match token {
                Token::Text(text) => out.push_str(text),
                Token::Expression(expr) => match expr.evaluate(scope) {
                    Ok(value) => self.push_value(&mut out, &value),
                    Err(err) => {
                        tracing::warn!(
                            expression = %expr.raw,
                            error = %err,
                            "interpolation failed, substituting empty string"
                        );
                    }
                },
            }
        }
        out
    }

    fn push_value(&self, out: &mut String, value: &Value) {
        if value.is_undefined() {
            return;
        }
        let text = value.to_string();
        if self.escape {
            // Writing into a String cannot fail.
            let _ = write!(out, "{}", v_htmlescape::escape(&text));
        } else {
            out.push_str(&text);
        }
    }
}

/// Compiles template strings and caches the results.
///
/// The cache is keyed by template content, lives as long as the compiler,
/// and is never evicted. Components created without an explicit compiler
/// share a thread-local default (see `vellum-runtime`).
pub struct TemplateCompiler {
    config: CompilerConfig,
    cache: RefCell<AHashMap<String, Rc<CompiledTemplate>>>,
    compile_count: Cell<u64>,
}

impl fmt::Debug for TemplateCompiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateCompiler")
            .field("config", &self.config)
            .field("cached", &self.cache_len())
            .field("compile_count", &self.compile_count.get())
            .finish()
    }
}

impl Default for TemplateCompiler {
    fn default() -> Self {
        Self::from_valid(CompilerConfig::default())
    }
}

impl TemplateCompiler {
    /// Compiler with `{{ }}` delimiters and escaping enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiler with a custom configuration.
    pub fn with_config(config: CompilerConfig) -> Result<Self, TemplateError> {
        config.validate()?;
        Ok(Self::from_valid(config))
    }

    fn from_valid(config: CompilerConfig) -> Self {
        Self {
            config,
            cache: RefCell::new(AHashMap::new()),
            compile_count: Cell::new(0),
        }
    }

    #[must_use]
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile `template`, returning the cached result when present.
    pub fn compile(&self, template: &str) -> Rc<CompiledTemplate> {
        if let Some(hit) = self.cache.borrow().get(template) {
            return Rc::clone(hit);
        }
        let compiled = Rc::new(CompiledTemplate {
            tokens: scan(template, &self.config.open, &self.config.close),
            escape: self.config.escape,
        });
        self.compile_count.set(self.compile_count.get() + 1);
        tracing::debug!(
            template_len = template.len(),
            tokens = compiled.tokens.len(),
            "template compiled"
        );
        self.cache
            .borrow_mut()
            .insert(template.to_string(), Rc::clone(&compiled));
        compiled
    }

    /// Compile (or fetch) and render in one step.
    pub fn render(&self, template: &str, scope: &dyn Scope) -> String {
        self.compile(template).render(scope)
    }

    /// Number of cache misses so far.
    #[must_use]
    pub fn compile_count(&self) -> u64 {
        self.compile_count.get()
    }

    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.cache.borrow().len()
    }

    #[must_use]
    pub fn is_cached(&self, template: &str) -> bool {
        self.cache.borrow().contains_key(template)
    }
}

/// Split `template` on `open ... close` pairs.
///
/// Matching is leftmost-first with the shortest possible body; a body
/// needs at least one character. An opening delimiter without a later
/// closing one is literal text.
fn scan(template: &str, open: &str, close: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut text_start = 0;
    let mut cursor = 0;

    while let Some(found) = template[cursor..].find(open) {
        let open_at = cursor + found;
        let body_start = open_at + open.len();
        let Some(body_end) = find_close(template, body_start, close) else {
            break;
        };
        if open_at > text_start {
            tokens.push(Token::Text(template[text_start..open_at].to_string()));
        }
        tokens.push(Token::Expression(Interpolation::new(
            template[body_start..body_end].trim(),
        )));
        cursor = body_end + close.len();
        text_start = cursor;
    }

    if text_start < template.len() {
        tokens.push(Token::Text(template[text_start..].to_string()));
    }
    tokens
}

/// First `close` starting at least one character after `body_start`.
fn find_close(template: &str, body_start: usize, close: &str) -> Option<usize> {
    let first = template[body_start..].chars().next()?;
    let search_from = body_start + first.len_utf8();
    template[search_from..]
        .find(close)
        .map(|offset| search_from + offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_core::data;

    fn text(s: &str) -> Token {
        Token::Text(s.to_string())
    }

    fn raw_exprs(template: &CompiledTemplate) -> Vec<&str> {
        template.interpolations().map(Interpolation::raw).collect()
    }

    #[test]
    fn scan_splits_text_and_expressions() {
        let compiler = TemplateCompiler::new();
        let compiled = compiler.compile("Hello {{ name }}, you have {{count}} items");
        assert_eq!(compiled.tokens().len(), 5);
        assert_eq!(compiled.tokens()[0], text("Hello "));
        assert_eq!(compiled.tokens()[2], text(", you have "));
        assert_eq!(compiled.tokens()[4], text(" items"));
        assert_eq!(raw_exprs(&compiled), vec!["name", "count"]);
    }

    #[test]
    fn template_without_delimiters_is_one_text_token() {
        let compiler = TemplateCompiler::new();
        assert_eq!(compiler.compile("plain").tokens(), &[text("plain")]);
        assert!(compiler.compile("").tokens().is_empty());
    }

    #[test]
    fn unterminated_open_is_literal() {
        let compiler = TemplateCompiler::new();
        let compiled = compiler.compile("a {{ b }} c {{ d");
        assert_eq!(raw_exprs(&compiled), vec!["b"]);
        assert_eq!(compiled.tokens().last(), Some(&text(" c {{ d")));
    }

    #[test]
    fn shortest_body_wins() {
        let compiler = TemplateCompiler::new();
        let compiled = compiler.compile("{{a}}{{b}}");
        assert_eq!(raw_exprs(&compiled), vec!["a", "b"]);
    }

    #[test]
    fn body_needs_at_least_one_character() {
        let compiler = TemplateCompiler::new();
        assert_eq!(compiler.compile("{{}}").tokens(), &[text("{{}}")]);

        let compiled = compiler.compile("{{}}x}}");
        assert_eq!(raw_exprs(&compiled), vec!["}}x"]);
    }

    #[test]
    fn whitespace_only_body_is_a_failing_expression() {
        let compiler = TemplateCompiler::new();
        let compiled = compiler.compile("[{{   }}]");
        assert_eq!(raw_exprs(&compiled), vec![""]);
        assert_eq!(compiled.render(&data! {}), "[]");
    }

    #[test]
    fn multiline_body_is_matched() {
        let compiler = TemplateCompiler::new();
        let compiled = compiler.compile("{{\n  a +\n  b\n}}");
        assert_eq!(compiled.render(&data! { "a" => 1, "b" => 2 }), "3");
    }

    #[test]
    fn custom_delimiters() {
        let config = CompilerConfig::new().delimiters("[[", "]]");
        let compiler = TemplateCompiler::with_config(config).unwrap();
        let scope = data! { "x" => 5 };
        assert_eq!(compiler.render("x=[[ x ]] {{ x }}", &scope), "x=5 {{ x }}");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = CompilerConfig::new().delimiters("", "");
        assert_eq!(
            TemplateCompiler::with_config(config).unwrap_err(),
            TemplateError::EmptyDelimiter
        );
    }

    #[test]
    fn cache_returns_same_instance() {
        let compiler = TemplateCompiler::new();
        let a = compiler.compile("{{ x }}");
        let b = compiler.compile("{{ x }}");
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(compiler.compile_count(), 1);
        assert!(compiler.is_cached("{{ x }}"));
        assert!(!compiler.is_cached("{{x}}"));

        compiler.compile("{{x}}");
        assert_eq!(compiler.compile_count(), 2);
        assert_eq!(compiler.cache_len(), 2);
    }

    #[test]
    fn separate_compilers_have_separate_caches() {
        let a = TemplateCompiler::new();
        let b = TemplateCompiler::new();
        a.compile("{{ x }}");
        assert!(!b.is_cached("{{ x }}"));
    }

    #[test]
    fn render_values() {
        let compiler = TemplateCompiler::new();
        let scope = data! {
            "n" => 2,
            "flag" => true,
            "nothing" => Value::Null,
            "missing" => Value::Undefined,
            "list" => Value::list([1, 2]),
        };
        assert_eq!(
            compiler.render("{{n}}|{{flag}}|{{nothing}}|{{missing}}|{{list}}", &scope),
            "2|true|null||1,2"
        );
    }

    #[test]
    fn failing_interpolation_renders_empty() {
        let compiler = TemplateCompiler::new();
        let scope = data! { "a" => 1 };
        assert_eq!(compiler.render("<{{ nope }}>{{ a }}", &scope), "<>1");
        assert_eq!(compiler.render("<{{ a + }}>", &scope), "<>");
    }

    #[test]
    fn escaping_applies_to_values_only() {
        let scope = data! { "html" => "<b>\"hi\" & bye</b>" };
        let escaped = TemplateCompiler::new().render("<p>{{ html }}</p>", &scope);
        assert!(escaped.starts_with("<p>&lt;b&gt;&quot;hi&quot; &amp; bye&lt;"));
        assert!(escaped.ends_with("</p>"));

        let raw = TemplateCompiler::with_config(CompilerConfig::new().escape(false))
            .unwrap()
            .render("<p>{{ html }}</p>", &scope);
        assert_eq!(raw, "<p><b>\"hi\" & bye</b></p>");
    }

    #[test]
    fn parse_error_is_kept_on_token() {
        let compiler = TemplateCompiler::new();
        let compiled = compiler.compile("{{ 1 + }}");
        let expr = compiled.interpolations().next().unwrap();
        assert!(expr.parsed().is_err());
        assert!(matches!(
            expr.evaluate(&data! {}),
            Err(ExprError::Parse(_))
        ));
    }
}
