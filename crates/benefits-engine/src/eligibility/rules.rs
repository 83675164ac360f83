use tracing::debug;

use super::condition::Condition;

/// Evaluate a raw condition string. Unrecognized conditions are never eligible.
pub fn evaluate<T: AsRef<str>>(
    value: Option<&str>,
    condition: &str,
    condition_values: &[T],
) -> bool {
    match Condition::parse(condition) {
        Some(condition) => evaluate_condition(value, condition, condition_values),
        None => {
            debug!(condition, "unrecognized eligibility condition");
            false
        }
    }
}

/// Evaluate a parsed condition.
///
/// Comparisons run on lower-cased text; numeric conditions reparse both sides
/// as base-10 integers and fail closed when either side is not a number.
pub fn evaluate_condition<T: AsRef<str>>(
    value: Option<&str>,
    condition: Condition,
    condition_values: &[T],
) -> bool {
    let value = match value {
        Some(value) if !value.is_empty() => value.to_lowercase(),
        _ => return false,
    };
    let operands: Vec<String> = condition_values
        .iter()
        .map(|operand| operand.as_ref().to_lowercase())
        .collect();
    let Some(threshold) = operands.first() else {
        return false;
    };

    match condition {
        Condition::Equals | Condition::In => operands.contains(&value),
        Condition::NotIn => !operands.contains(&value),
        Condition::LessThan => compare(threshold, &value, |limit, candidate| limit > candidate),
        Condition::LessThanOrEquals => {
            compare(threshold, &value, |limit, candidate| limit >= candidate)
        }
        Condition::GreaterThan => compare(threshold, &value, |limit, candidate| limit < candidate),
        Condition::GreaterThanOrEquals => {
            compare(threshold, &value, |limit, candidate| limit <= candidate)
        }
    }
}

fn compare(threshold: &str, candidate: &str, holds: impl Fn(i64, i64) -> bool) -> bool {
    match (parse_leading_int(threshold), parse_leading_int(candidate)) {
        (Some(limit), Some(candidate)) => holds(limit, candidate),
        _ => false,
    }
}

/// Leading base-10 integer: optional sign then digits; trailing text ignored.
pub(crate) fn parse_leading_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let end = digits.bytes().take_while(u8::is_ascii_digit).count();
    if end == 0 {
        return None;
    }

    let magnitude: i64 = digits[..end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}
