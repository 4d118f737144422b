#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use vellum_core::data;
use vellum_template::{CompilerConfig, TemplateCompiler};

#[derive(Debug, Arbitrary)]
struct Input {
    open: String,
    close: String,
    escape: bool,
    template: String,
}

fuzz_target!(|input: Input| {
    let config = CompilerConfig::new()
        .delimiters(input.open, input.close)
        .escape(input.escape);
    let Ok(compiler) = TemplateCompiler::with_config(config) else {
        return;
    };
    let scope = data! { "a" => 1, "b" => "<b>" };
    let first = compiler.render(&input.template, &scope);
    let second = compiler.render(&input.template, &scope);
    assert_eq!(first, second);
    assert_eq!(compiler.compile_count(), 1);
});
