//! Mapping of loosely typed sensor payloads onto [`CanonicalFragment`].
//!
//! Normalization is total: a field that is missing or cannot be coerced is
//! left out of the fragment instead of failing the whole reading. Deciding
//! whether the result carries anything useful is up to the caller, see
//! [`CanonicalFragment::is_valid`].

use time::OffsetDateTime;

use crate::reading::RawReading;
use crate::timestamp::parse_timestamp;
use crate::{CanonicalFragment, SOIL_DRY_THRESHOLD_PCT};

pub fn normalize(raw: &RawReading) -> CanonicalFragment {
    normalize_at(raw, OffsetDateTime::now_utc())
}

/// Normalize with an explicit clock, used when the payload has no usable timestamp.
pub fn normalize_at(raw: &RawReading, now: OffsetDateTime) -> CanonicalFragment {
    let mut fragment = CanonicalFragment::new(parse_timestamp(raw.get("timestamp"), now));
    let out = &mut fragment.fields;

    out.rain = raw.flag("rain").map(u8::from);
    out.distance = raw.number("distance").map(|n| round_to(n, 2));
    out.temperature = raw.number("temperature").map(|n| round_to(n, 2));
    out.humidity = raw.number("humidity").map(|n| round_to(n, 2));
    out.relay = raw.flag("relay");

    out.sensor1_raw = raw.number("sensor1_raw").map(round_half_up);
    out.sensor2_raw = raw.number("sensor2_raw").map(round_half_up);
    out.sensor1_pct = raw.number("sensor1_pct").map(percentage);
    out.sensor2_pct = raw.number("sensor2_pct").map(percentage);

    let average = match (out.sensor1_pct, out.sensor2_pct) {
        (Some(a), Some(b)) => Some((a + b) / 2.0),
        (Some(a), None) | (None, Some(a)) => Some(a),
        (None, None) => None,
    };
    if let Some(average) = average {
        out.capacitivo = Some(round_to(average, 1));
        out.capacitivo_state = Some(average < SOIL_DRY_THRESHOLD_PCT);
    }

    out.rain_digital_raw = raw
        .number("rain_digital_raw")
        .map(|n| if n == 0.0 { 0 } else { 1 });

    fragment
}

/// Fractional digits needed to print any `f64` exactly.
const EXACT_DIGITS: usize = 1100;

/// Round the exact binary value to `digits` decimals, ties away from zero.
///
/// Works on the full decimal expansion rather than on `value * 10^digits`,
/// whose product can land on a midpoint the stored value never reaches
/// (`8.45` is stored just below 8.45 and must round to 8.4).
pub fn round_to(value: f64, digits: usize) -> f64 {
    if !value.is_finite() || value.abs() >= 1e21 {
        return value;
    }

    let exact = format!("{:.*}", EXACT_DIGITS, value.abs());
    let Some((whole, fraction)) = exact.split_once('.') else {
        return value;
    };

    let kept = format!("{whole}{}", &fraction[..digits]);
    let Ok(mut scaled) = kept.parse::<u128>() else {
        return value;
    };
    if fraction.as_bytes()[digits] >= b'5' {
        scaled += 1;
    }

    let rounded = format!("{scaled}e-{digits}").parse::<f64>().unwrap_or(value.abs());
    if value.is_sign_negative() { -rounded } else { rounded }
}

/// Nearest integer with halves rounded towards positive infinity.
fn round_half_up(value: f64) -> i64 {
    let floor = value.floor();
    let rounded = if value - floor >= 0.5 { floor + 1.0 } else { floor };

    rounded as i64
}

fn percentage(value: f64) -> f64 {
    round_to(value, 1).clamp(0.0, 100.0)
}
