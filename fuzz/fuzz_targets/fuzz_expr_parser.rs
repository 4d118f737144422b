#![no_main]

use libfuzzer_sys::fuzz_target;
use vellum_core::{Value, data};

fuzz_target!(|src: &str| {
    let Ok(expr) = vellum_expr::parse(src) else {
        return;
    };
    let scope = data! {
        "n" => 3,
        "s" => "text",
        "nothing" => Value::Null,
        "list" => Value::list([1, 2, 3]),
        "obj" => data! { "k" => "v" },
    };
    let _ = vellum_expr::evaluate(&expr, &scope);
});
