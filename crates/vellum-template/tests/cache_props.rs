//! Property tests for the template cache and literal text handling.

use std::rc::Rc;

use proptest::prelude::*;
use vellum_core::data;
use vellum_template::{CompilerConfig, TemplateCompiler};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Text without delimiters renders to itself, escaping or not.
    #[test]
    fn literal_text_round_trips(text in "[^{}]{0,64}", escape in any::<bool>()) {
        let compiler = TemplateCompiler::with_config(CompilerConfig::new().escape(escape)).unwrap();
        prop_assert_eq!(compiler.render(&text, &data! {}), text);
    }

    /// Compiling a set of templates in any order compiles each distinct one once.
    #[test]
    fn compile_count_equals_distinct_templates(
        picks in proptest::collection::vec(0usize..6, 1..40)
    ) {
        let templates = ["", "a", "{{ a }}", "{{a}}", "x {{ a + 1 }} y", "{{ 'b' }}"];
        let compiler = TemplateCompiler::new();
        let mut first: Vec<Option<Rc<_>>> = vec![None; templates.len()];
        for &i in &picks {
            let compiled = compiler.compile(templates[i]);
            match &first[i] {
                Some(prev) => prop_assert!(Rc::ptr_eq(prev, &compiled)),
                None => first[i] = Some(compiled),
            }
        }
        let distinct = first.iter().filter(|f| f.is_some()).count();
        prop_assert_eq!(compiler.compile_count(), distinct as u64);
        prop_assert_eq!(compiler.cache_len(), distinct);
    }

    /// Interpolated integers render as their decimal form.
    #[test]
    fn integers_interpolate(n in -1_000_000i64..1_000_000) {
        let compiler = TemplateCompiler::new();
        let scope = data! { "n" => n as f64 };
        prop_assert_eq!(compiler.render("<{{ n }}>", &scope), format!("<{n}>"));
    }
}
