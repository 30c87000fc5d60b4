use serde_json::Value;

/// Coerces a raw telemetry field into a finite number.
///
/// `None` (field missing), JSON `null` and the empty string are absent.
/// Strings are trimmed before parsing, so a whitespace-only string reads as
/// zero. Booleans read as 1/0. Arrays, objects and anything that parses to a
/// non-finite value are absent.
pub fn to_number(raw: Option<&Value>) -> Option<f64> {
    let value = match raw? {
        Value::Null => return None,
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        Value::Number(number) => number.as_f64(),
        Value::String(text) if text.is_empty() => return None,
        Value::String(text) => parse_numeric_text(text),
        Value::Array(_) | Value::Object(_) => None,
    };
    value.filter(|value| value.is_finite())
}

fn parse_numeric_text(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }

    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = trimmed.strip_prefix(prefix) {
            return u64::from_str_radix(digits, radix).ok().map(|v| v as f64);
        }
    }

    // `f64::from_str` also accepts "inf" and "nan"; both are filtered as non-finite.
    trimmed.parse::<f64>().ok()
}

/// Integer view of a raw field, used for counters and epoch timestamps.
/// Fractional values truncate toward zero.
pub fn to_integer(raw: Option<&Value>) -> Option<i64> {
    let value = to_number(raw)?;
    if value < i64::MIN as f64 || value > i64::MAX as f64 {
        return None;
    }
    Some(value.trunc() as i64)
}
