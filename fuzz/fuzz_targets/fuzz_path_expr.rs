#![no_main]

use libfuzzer_sys::fuzz_target;
use rebind_runtime::reactive::{ReactiveObject, Value, get_path, set_path};

fuzz_target!(|data: &[u8]| {
    let Ok(expr) = std::str::from_utf8(data) else {
        return;
    };
    if expr.len() > 1024 {
        return;
    }

    let root = ReactiveObject::new();
    let inner = ReactiveObject::new();
    inner.set("leaf", 1);
    root.set("a", inner);

    let _ = get_path(&root, expr);
    if set_path(&root, expr, "x").is_ok() {
        assert_eq!(get_path(&root, expr), Value::from("x"));
    }
});
