//! Value normalization for rule comparison.
//!
//! Resolved rule values are plain `serde_json::Value`s; "absent" is `None`.
//! Everything the operators compare goes through [`comparison_text`], a total
//! rendering with the following shape:
//!
//! | Value            | Comparison text                          |
//! |------------------|------------------------------------------|
//! | `null`           | `""`                                     |
//! | `true` / `false` | `"true"` / `"false"`                     |
//! | number           | shortest decimal form (`42`, `1.5`)      |
//! | string           | the string itself                        |
//! | array            | element texts joined with `,`            |
//! | object           | compact JSON                             |

use serde_json::Value;
use std::borrow::Cow;

/// Render a value as the text used by `equals` and `regex` comparisons.
pub fn comparison_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::Null => Cow::Borrowed(""),
        Value::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
        Value::Number(n) => Cow::Owned(number_text(n)),
        Value::String(s) => Cow::Borrowed(s.as_str()),
        Value::Array(items) => Cow::Owned(
            items
                .iter()
                .map(comparison_text)
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Object(_) => Cow::Owned(value.to_string()),
    }
}

/// Integral floats render without a fractional part, so a body field `42.0`
/// compares equal to the rule value `"42"`. Magnitudes of `1e21` and above or
/// below `1e-6` use exponent form (`1e-7`, `1.5e+21`).
fn number_text(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f == 0.0 => "0".to_string(),
        Some(f) if f.is_finite() && (f.abs() >= 1e21 || f.abs() < 1e-6) => exponent_text(f),
        Some(f) if f.fract() == 0.0 => format!("{f:.0}"),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

fn exponent_text(f: f64) -> String {
    let text = format!("{f:e}");
    match text.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{mantissa}e+{exponent}")
        }
        _ => text,
    }
}

/// True when the resolved value is absent or an explicit `null`.
pub fn is_nullish(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

/// True when the resolved value is an array with no elements.
pub fn is_empty_array(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::Array(items)) if items.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_comparison_text_scalars() {
        assert_eq!(comparison_text(&json!(null)), "");
        assert_eq!(comparison_text(&json!(true)), "true");
        assert_eq!(comparison_text(&json!(false)), "false");
        assert_eq!(comparison_text(&json!("abc")), "abc");
        assert_eq!(comparison_text(&json!(42)), "42");
        assert_eq!(comparison_text(&json!(-7)), "-7");
        assert_eq!(comparison_text(&json!(1.5)), "1.5");
        assert_eq!(comparison_text(&json!(42.0)), "42");
    }

    #[test]
    fn test_comparison_text_exponent_forms() {
        assert_eq!(comparison_text(&json!(1e-7)), "1e-7");
        assert_eq!(comparison_text(&json!(2.5e-9)), "2.5e-9");
        assert_eq!(comparison_text(&json!(0.000001)), "0.000001");
        assert_eq!(comparison_text(&json!(1.5e21)), "1.5e+21");
        assert_eq!(comparison_text(&json!(1e300)), "1e+300");
        assert_eq!(comparison_text(&json!(123456789.0)), "123456789");
        assert_eq!(comparison_text(&json!(-0.0)), "0");
    }

    #[test]
    fn test_comparison_text_containers() {
        assert_eq!(comparison_text(&json!([1, "a", null, true])), "1,a,,true");
        assert_eq!(comparison_text(&json!([[1, 2], 3])), "1,2,3");
        assert_eq!(comparison_text(&json!([])), "");
        assert_eq!(comparison_text(&json!({"a": 1})), r#"{"a":1}"#);
    }

    #[test]
    fn test_nullish() {
        assert!(is_nullish(None));
        assert!(is_nullish(Some(&json!(null))));
        assert!(!is_nullish(Some(&json!("null"))));
        assert!(!is_nullish(Some(&json!(""))));
        assert!(!is_nullish(Some(&json!(0))));
    }

    #[test]
    fn test_empty_array() {
        assert!(is_empty_array(Some(&json!([]))));
        assert!(!is_empty_array(Some(&json!([1]))));
        assert!(!is_empty_array(Some(&json!("x"))));
        assert!(!is_empty_array(Some(&json!({}))));
        assert!(!is_empty_array(None));
    }
}
