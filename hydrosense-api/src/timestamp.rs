use serde_json::Value;
use time::format_description::well_known::{Iso8601, Rfc3339};
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Numeric timestamps below this are seconds since the epoch, otherwise milliseconds.
pub const SECONDS_CUTOFF: f64 = 1e12;

/// Largest distance from the epoch a date can represent, in milliseconds.
const MAX_EPOCH_MS: f64 = 8.64e15;

/// Resolve a raw `timestamp` field, falling back to `now` whenever the value
/// is absent, falsy or does not describe a representable instant.
pub fn parse_timestamp(value: Option<&Value>, now: OffsetDateTime) -> OffsetDateTime {
    let resolved = match value {
        Some(Value::Number(number)) => number.as_f64().and_then(from_epoch_number),
        Some(Value::String(text)) if !text.is_empty() => parse_str(text),
        _ => None,
    };

    truncate_millis(resolved.unwrap_or(now))
}

/// Parse an ISO-8601 / RFC 3339 date or date-time string into a UTC instant.
///
/// Date-times without an offset and bare dates are read as UTC.
pub fn parse_str(text: &str) -> Option<OffsetDateTime> {
    let text = text.trim();

    if let Ok(parsed) = OffsetDateTime::parse(text, &Rfc3339) {
        return Some(parsed.to_offset(UtcOffset::UTC));
    }
    if let Ok(parsed) = OffsetDateTime::parse(text, &Iso8601::DEFAULT) {
        return Some(parsed.to_offset(UtcOffset::UTC));
    }
    if let Ok(parsed) = PrimitiveDateTime::parse(text, &Iso8601::DEFAULT) {
        return Some(parsed.assume_utc());
    }

    Date::parse(text, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|date| date.midnight().assume_utc())
}

/// Format as `YYYY-MM-DDTHH:MM:SS.sssZ`.
pub fn format(instant: OffsetDateTime) -> String {
    instant
        .to_offset(UtcOffset::UTC)
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
        ))
        .unwrap_or_else(|_| instant.unix_timestamp().to_string())
}

fn from_epoch_number(value: f64) -> Option<OffsetDateTime> {
    if value == 0.0 || !value.is_finite() {
        return None;
    }

    let millis = if value < SECONDS_CUTOFF { value * 1000.0 } else { value }.trunc();
    if !millis.is_finite() || millis.abs() > MAX_EPOCH_MS {
        return None;
    }

    OffsetDateTime::from_unix_timestamp_nanos(millis as i128 * 1_000_000).ok()
}

fn truncate_millis(instant: OffsetDateTime) -> OffsetDateTime {
    let millis = instant.nanosecond() / 1_000_000;
    instant
        .replace_nanosecond(millis * 1_000_000)
        .unwrap_or(instant)
        .to_offset(UtcOffset::UTC)
}

/// Serde adapter for a required instant.
pub mod iso {
    use serde::{Deserialize, Deserializer, Serializer, de};
    use time::OffsetDateTime;

    pub fn serialize<S: Serializer>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<OffsetDateTime, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_str(&text).ok_or_else(|| de::Error::custom(format!("invalid timestamp: {text}")))
    }
}

/// Serde adapter for an optional instant.
pub mod iso_option {
    use serde::{Deserialize, Deserializer, Serializer, de};
    use time::OffsetDateTime;

    pub fn serialize<S: Serializer>(
        value: &Option<OffsetDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(instant) => serializer.serialize_str(&super::format(*instant)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<OffsetDateTime>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(text) => super::parse_str(&text)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {text}"))),
            None => Ok(None),
        }
    }
}
