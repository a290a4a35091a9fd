//! Requirement answer semantics: emptiness, truthiness and type checks.
//!
//! Answers arrive as free JSON. These helpers interpret them per
//! [`RequirementType`] so that validation and pricing agree on what an
//! answer means.

use autoshop_core::catalog::{RequirementOption, RequirementType};
use autoshop_core::money::Quantity;
use chrono::NaiveDate;
use serde_json::Value;
use std::borrow::Cow;

/// Longest accepted `text` answer, in characters.
pub const TEXT_MAX_CHARS: usize = 255;
/// Longest accepted `textarea` answer, in characters.
pub const TEXTAREA_MAX_CHARS: usize = 1000;

const TRUTHY: [&str; 4] = ["true", "1", "on", "yes"];
const FALSY: [&str; 4] = ["false", "0", "off", "no"];

/// A scalar answer as text: strings as-is, numbers in their JSON form.
#[must_use]
pub fn as_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        _ => None,
    }
}

/// Whether a checkbox/toggle answer counts as "on".
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => {
            let s = s.trim();
            TRUTHY.iter().any(|t| s.eq_ignore_ascii_case(t))
        }
        _ => false,
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Emptiness rule for required answers: checkbox/toggle are empty when
/// falsy, multiselect when the list is empty, everything else when null or
/// a blank string.
#[must_use]
pub fn is_empty(kind: &RequirementType, value: Option<&Value>) -> bool {
    let Some(value) = value else {
        return true;
    };
    match kind {
        RequirementType::Checkbox { .. } | RequirementType::Toggle { .. } => !is_truthy(value),
        RequirementType::Multiselect { .. } => match value {
            Value::Array(items) => items.is_empty(),
            other => is_blank(other),
        },
        _ => is_blank(value),
    }
}

fn has_option(options: &[RequirementOption], value: &Value) -> bool {
    as_text(value).is_some_and(|text| options.iter().any(|o| o.value == text.as_ref()))
}

/// Checks a provided answer against its requirement.
///
/// Null and blank answers are not checked; the emptiness rule covers them.
///
/// # Errors
///
/// Returns a short reason ("must be one of the available options") when the
/// answer does not fit.
pub fn check(kind: &RequirementType, value: &Value) -> Result<(), String> {
    if is_blank(value) {
        return Ok(());
    }
    match kind {
        RequirementType::Text => check_length(value, TEXT_MAX_CHARS),
        RequirementType::Textarea => check_length(value, TEXTAREA_MAX_CHARS),
        RequirementType::Number { max_digits, .. } => {
            let quantity = Quantity::from_json(value)
                .map_err(|_| "must be a non-negative number with at most two decimals".to_string())?;
            match max_digits {
                Some(max) if quantity.integer_digits() > *max => {
                    Err(format!("may not have more than {max} digits"))
                }
                _ => Ok(()),
            }
        }
        RequirementType::Select { options } | RequirementType::Radio { options } => {
            if has_option(options, value) {
                Ok(())
            } else {
                Err("must be one of the available options".to_string())
            }
        }
        RequirementType::Multiselect { options } => match value {
            Value::Array(items) if items.iter().all(|item| has_option(options, item)) => Ok(()),
            Value::Array(_) => Err("must only contain available options".to_string()),
            _ => Err("must be a list of options".to_string()),
        },
        RequirementType::Checkbox { .. } | RequirementType::Toggle { .. } => match value {
            Value::Bool(_) => Ok(()),
            Value::Number(n) if n.as_u64().is_some_and(|n| n <= 1) => Ok(()),
            Value::String(s)
                if TRUTHY.iter().chain(FALSY.iter()).any(|t| s.trim().eq_ignore_ascii_case(t)) =>
            {
                Ok(())
            }
            _ => Err("must be true or false".to_string()),
        },
        RequirementType::Date { min_date, max_date } => {
            let date = value
                .as_str()
                .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
                .ok_or_else(|| "must be a date in YYYY-MM-DD format".to_string())?;
            if let Some(min) = min_date.filter(|min| date < *min) {
                return Err(format!("must be a date on or after {min}"));
            }
            if let Some(max) = max_date.filter(|max| date > *max) {
                return Err(format!("must be a date on or before {max}"));
            }
            Ok(())
        }
    }
}

fn check_length(value: &Value, max: usize) -> Result<(), String> {
    let text = as_text(value).ok_or_else(|| "must be a string".to_string())?;
    if text.chars().count() > max {
        return Err(format!("may not be greater than {max} characters"));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use autoshop_core::money::Money;
    use serde_json::json;

    fn select() -> RequirementType {
        RequirementType::Select {
            options: vec![RequirementOption {
                label: "Synthetic".to_string(),
                value: "synthetic".to_string(),
                price: Money::from_cents(1500),
            }],
        }
    }

    #[test]
    fn test_truthiness() {
        for on in [json!(true), json!(1), json!("yes"), json!("On"), json!(" true ")] {
            assert!(is_truthy(&on), "{on}");
        }
        for off in [json!(false), json!(0), json!("no"), json!(""), json!(null), json!([1])] {
            assert!(!is_truthy(&off), "{off}");
        }
    }

    #[test]
    fn test_emptiness_by_type() {
        let checkbox = RequirementType::Checkbox { price: Money::ZERO };
        let multiselect = RequirementType::Multiselect { options: vec![] };
        assert!(is_empty(&checkbox, Some(&json!(false))));
        assert!(!is_empty(&checkbox, Some(&json!("on"))));
        assert!(is_empty(&multiselect, Some(&json!([]))));
        assert!(!is_empty(&multiselect, Some(&json!(["a"]))));
        assert!(is_empty(&RequirementType::Text, Some(&json!("   "))));
        assert!(is_empty(&RequirementType::Text, None));
        assert!(!is_empty(&RequirementType::Text, Some(&json!(0))));
    }

    #[test]
    fn test_text_bounds() {
        assert!(check(&RequirementType::Text, &json!("a".repeat(255))).is_ok());
        assert!(check(&RequirementType::Text, &json!("a".repeat(256))).is_err());
        assert!(check(&RequirementType::Textarea, &json!("a".repeat(1000))).is_ok());
        assert!(check(&RequirementType::Textarea, &json!(["list"])).is_err());
    }

    #[test]
    fn test_number_digits() {
        let kind = RequirementType::Number {
            max_digits: Some(3),
            unit_price: None,
        };
        assert!(check(&kind, &json!(999)).is_ok());
        assert!(check(&kind, &json!("12.5")).is_ok());
        assert_eq!(check(&kind, &json!(1000)), Err("may not have more than 3 digits".to_string()));
        assert!(check(&kind, &json!(-1)).is_err());
        assert!(check(&kind, &json!("lots")).is_err());
    }

    #[test]
    fn test_choices() {
        assert!(check(&select(), &json!("synthetic")).is_ok());
        assert!(check(&select(), &json!("diesel")).is_err());
        let options = select().options().unwrap().to_vec();
        let multi = RequirementType::Multiselect { options };
        assert!(check(&multi, &json!(["synthetic", "synthetic"])).is_ok());
        assert!(check(&multi, &json!(["synthetic", "diesel"])).is_err());
        assert!(check(&multi, &json!("synthetic")).is_err());
    }

    #[test]
    fn test_date_window_is_inclusive() {
        let kind = RequirementType::Date {
            min_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            max_date: NaiveDate::from_ymd_opt(2024, 12, 31),
        };
        assert!(check(&kind, &json!("2024-01-01")).is_ok());
        assert!(check(&kind, &json!("2024-12-31")).is_ok());
        assert!(check(&kind, &json!("2023-12-31")).is_err());
        assert!(check(&kind, &json!("2025-01-01")).is_err());
        assert!(check(&kind, &json!("01/02/2024")).is_err());
    }

    #[test]
    fn test_checkbox_values() {
        let kind = RequirementType::Toggle { price: Money::ZERO };
        for ok in [json!(true), json!(0), json!("off"), json!("YES")] {
            assert!(check(&kind, &ok).is_ok(), "{ok}");
        }
        assert!(check(&kind, &json!("maybe")).is_err());
        assert!(check(&kind, &json!(2)).is_err());
    }
}
