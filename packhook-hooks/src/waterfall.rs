//! Shape checks for waterfall hooks.

use serde_json::Value;

/// A value that can be threaded through a waterfall hook.
///
/// Each listener must hand back a value compatible with the one it received.
/// Statically typed values are always compatible; dynamic values such as
/// JSON objects must keep every key of their input.
pub trait WaterfallValue {
    fn is_compatible(&self, next: &Self) -> bool {
        let _ = next;
        true
    }
}

impl WaterfallValue for Value {
    fn is_compatible(&self, next: &Self) -> bool {
        match (self, next) {
            (Value::Object(current), Value::Object(next)) => {
                current.keys().all(|key| next.contains_key(key))
            }
            (Value::Object(_), _) | (_, Value::Object(_)) => false,
            (Value::Array(_), Value::Array(_)) => true,
            (Value::String(_), Value::String(_)) => true,
            (Value::Number(_), Value::Number(_)) => true,
            (Value::Bool(_), Value::Bool(_)) => true,
            (Value::Null, Value::Null) => true,
            _ => false,
        }
    }
}

impl WaterfallValue for String {}

impl<T> WaterfallValue for Vec<T> {}

impl<T: WaterfallValue> WaterfallValue for Option<T> {
    fn is_compatible(&self, next: &Self) -> bool {
        match (self, next) {
            (Some(current), Some(next)) => current.is_compatible(next),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_object_superset_is_compatible() {
        let input = json!({ "request": "./a", "context": "/src" });
        assert!(input.is_compatible(&json!({ "request": "./b", "context": "/src" })));
        assert!(input.is_compatible(&json!({ "request": "./b", "context": "/", "extra": 1 })));
    }

    #[test]
    fn test_object_missing_key_is_incompatible() {
        let input = json!({ "request": "./a", "context": "/src" });
        assert!(!input.is_compatible(&json!({ "request": "./b" })));
        assert!(!input.is_compatible(&json!("./b")));
    }

    #[test]
    fn test_scalars_must_keep_their_kind() {
        assert!(json!(1).is_compatible(&json!(2)));
        assert!(!json!(1).is_compatible(&json!("2")));
        assert!(json!([1]).is_compatible(&json!([])));
    }
}
