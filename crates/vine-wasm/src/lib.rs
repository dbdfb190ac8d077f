//! WASM bindings for the Vine compiler.
//!
//! Exposes `compile()` to JavaScript via wasm-bindgen.
//! Returns a JS object `{ code }` or throws on error.

use wasm_bindgen::prelude::*;

/// Compile Vine template source to PHP program text.
///
/// `name` is a logical source name used only in diagnostics.
/// Returns a JS object with `{ code: string }`.
/// Throws a JS error if compilation fails.
#[wasm_bindgen]
pub fn compile(source: &str, name: &str) -> Result<JsValue, JsError> {
    let code =
        vine_compiler::compile(source, name).map_err(|e| JsError::new(&e.to_string()))?;

    // Serialize to a plain JS object { code }
    let js_obj = js_sys::Object::new();
    js_sys::Reflect::set(&js_obj, &"code".into(), &code.into())
        .map_err(|_| JsError::new("Failed to set code property"))?;

    Ok(js_obj.into())
}

/// Get the compiler version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // =========================================================================
    // Native tests (non-WASM) — verify the compile pipeline works
    // =========================================================================

    fn native_compile(source: &str) -> String {
        vine_compiler::compile(source, "test.vine").unwrap()
    }

    #[test]
    fn test_empty_template() {
        assert_eq!(native_compile(""), "");
    }

    #[test]
    fn test_static_markup_passes_through() {
        let out = native_compile("<div class=\"wrap\"><span>Hello</span></div>");
        assert_eq!(out, "<div class=\"wrap\"><span>Hello</span></div>");
    }

    #[test]
    fn test_directives_become_code_segments() {
        let out = native_compile("{if $ok}<b>yes</b>{/if}");
        assert!(out.contains("<?php if ($ok) {"));
        assert!(out.contains("<b>yes</b>"));
    }

    #[test]
    fn test_compile_error_propagates() {
        let result = vine_compiler::compile("{if $ok}", "bad.vine");
        assert!(result.is_err());
        let message = result.unwrap_err().to_string();
        assert!(message.contains("bad.vine:1:1"), "{message}");
    }

    #[test]
    fn test_version() {
        let v = version();
        assert!(!v.is_empty());
        assert!(v.contains('.'));
    }

    #[test]
    fn test_multiple_compiles() {
        // Verify no global state leakage between compiles
        let out1 = native_compile("{$alpha}");
        let out2 = native_compile("{$beta}");
        assert!(out1.contains("$alpha"));
        assert!(!out1.contains("$beta"));
        assert!(out2.contains("$beta"));
        assert!(!out2.contains("$alpha"));
    }
}
