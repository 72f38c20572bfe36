//! Lookups of the objects the wallet extensions inject in `window`.

use wasm_bindgen::{JsCast, JsValue};

/// follow `path` from `window`, `None` as soon as a segment is missing or
/// not an object
///
/// The lookup is done on every call: extensions may inject their objects
/// after the page is loaded.
pub fn lookup(path: &[&str]) -> Option<JsValue> {
    let window = js_sys::Reflect::get(&js_sys::global(), &JsValue::from_str("window")).ok()?;

    path.iter().try_fold(window, |object, segment| {
        if !object.is_object() {
            return None;
        }
        let value = js_sys::Reflect::get(&object, &JsValue::from_str(segment)).ok()?;
        if value.is_undefined() || value.is_null() {
            None
        } else {
            Some(value)
        }
    })
}

/// `true` if `value` is an object with a function named `method`
pub fn has_method(value: &JsValue, method: &str) -> bool {
    js_sys::Reflect::get(value, &JsValue::from_str(method))
        .ok()
        .map(|v| v.is_function())
        .unwrap_or(false)
}

pub fn lookup_as<T: JsCast>(path: &[&str]) -> Option<T> {
    lookup(path).map(|value| value.unchecked_into())
}
