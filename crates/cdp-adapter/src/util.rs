use serde_json::Value;

/// Encodes `value` as a JavaScript literal.
fn js_literal(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

/// Function declaration for `Runtime.callFunctionOn` that assigns a control's
/// value property and notifies framework listeners.
pub(crate) fn set_value_fn(value: &str) -> String {
    format!(
        "function() {{ this.value = {v}; \
         this.dispatchEvent(new Event('input', {{ bubbles: true }})); \
         this.dispatchEvent(new Event('change', {{ bubbles: true }})); }}",
        v = js_literal(value)
    )
}

pub(crate) fn set_attribute_fn(name: &str, value: &str) -> String {
    format!(
        "function() {{ this.setAttribute({n}, {v}); }}",
        n = js_literal(name),
        v = js_literal(value)
    )
}

pub(crate) const IS_SELECTED_FN: &str = "function() { return !!(this.checked || this.selected); }";

/// Wraps a script body so positional `args` are visible as `arguments`.
pub(crate) fn wrap_script(source: &str, args: &[Value]) -> String {
    let args = Value::Array(args.to_vec());
    format!("(function() {{ {source} }}).apply(null, {args})")
}
