mod fragment;
mod state;

pub use fragment::*;
pub use state::*;

use serde::{Deserialize, Serialize};

/// Recognized sensor fields. Every field is optional and absent fields are
/// left out of the JSON representation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorFields {
    /// Raining flag (0/1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rain: Option<u8>,
    /// Ultrasonic distance to the water surface in centimeters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    /// Air temperature in Celsius
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Relative air humidity percentage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    /// Observed pump relay state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relay: Option<bool>,
    /// Raw ADC count of the first soil probe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor1_raw: Option<i64>,
    /// Raw ADC count of the second soil probe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor2_raw: Option<i64>,
    /// Moisture percentage of the first soil probe (0-100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor1_pct: Option<f64>,
    /// Moisture percentage of the second soil probe (0-100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor2_pct: Option<f64>,
    /// Average soil moisture percentage over the present probes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacitivo: Option<f64>,
    /// Soil is dry and needs irrigation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacitivo_state: Option<bool>,
    /// Diagnostic echo of the digital rain pin (0/1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rain_digital_raw: Option<u8>,
}

impl SensorFields {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overwrite the fields present in `other`, keeping the rest.
    pub fn merge(&mut self, other: &SensorFields) {
        self.rain = other.rain.or(self.rain);
        self.distance = other.distance.or(self.distance);
        self.temperature = other.temperature.or(self.temperature);
        self.humidity = other.humidity.or(self.humidity);
        self.relay = other.relay.or(self.relay);
        self.sensor1_raw = other.sensor1_raw.or(self.sensor1_raw);
        self.sensor2_raw = other.sensor2_raw.or(self.sensor2_raw);
        self.sensor1_pct = other.sensor1_pct.or(self.sensor1_pct);
        self.sensor2_pct = other.sensor2_pct.or(self.sensor2_pct);
        self.capacitivo = other.capacitivo.or(self.capacitivo);
        self.capacitivo_state = other.capacitivo_state.or(self.capacitivo_state);
        self.rain_digital_raw = other.rain_digital_raw.or(self.rain_digital_raw);
    }

    /// Rain reading, preferring `rain` over the diagnostic pin.
    pub fn rain_level(&self) -> Option<u8> {
        self.rain.or(self.rain_digital_raw)
    }

    /// Soil dryness, preferring the explicit flag over the derived average.
    pub fn soil_dry(&self) -> Option<bool> {
        self.capacitivo_state
            .or_else(|| self.capacitivo.map(|avg| avg < crate::SOIL_DRY_THRESHOLD_PCT))
    }
}
