use serde_json::{Map, Value};

#[derive(Debug, thiserror::Error)]
pub enum ReadingError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Payload is not a JSON object")]
    NotAnObject,
}

/// Untyped sensor payload as received from a transport or subscriber.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawReading(Map<String, Value>);

impl RawReading {
    pub fn parse(line: &str) -> Result<Self, ReadingError> {
        Self::try_from(serde_json::from_str::<Value>(line)?)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Finite numeric value of `field`, if present and coercible.
    pub fn number(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(to_number).filter(|n| n.is_finite())
    }

    /// Boolean-like value of `field`: booleans as-is, numbers as non-zero,
    /// anything else compared case-insensitively to `"true"`.
    pub fn flag(&self, field: &str) -> Option<bool> {
        let value = self.get(field)?;

        Some(match value {
            Value::Bool(flag) => *flag,
            other => match to_number(other).filter(|n| n.is_finite()) {
                Some(n) => n != 0.0,
                None => to_display(other).eq_ignore_ascii_case("true"),
            },
        })
    }
}

impl TryFrom<Value> for RawReading {
    type Error = ReadingError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(ReadingError::NotAnObject),
        }
    }
}

/// Numeric coercion with the semantics sensor firmware relies on: booleans
/// are 0/1, `null` and blank strings are 0, strings accept decimal and
/// `0x`/`0o`/`0b` literals. Returns `None` where the coercion yields NaN.
pub fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        Value::Null => Some(0.0),
        Value::String(text) => parse_numeric_str(text),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn parse_numeric_str(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return Some(0.0);
    }

    for (prefix, radix) in [("0x", 16), ("0o", 8), ("0b", 2)] {
        let lower = text.get(..2).map(str::to_ascii_lowercase);
        if lower.as_deref() == Some(prefix) {
            return u64::from_str_radix(&text[2..], radix).ok().map(|n| n as f64);
        }
    }

    match text {
        "Infinity" | "+Infinity" => return Some(f64::INFINITY),
        "-Infinity" => return Some(f64::NEG_INFINITY),
        _ => {}
    }

    // Rust accepts spellings such as "inf" or "NaN" that are not numeric literals.
    if text.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return None;
    }

    text.parse::<f64>().ok()
}

fn to_display(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
