use std::time::{Duration, Instant};

use hydrosense_api::{CanonicalFragment, SensorFields, timestamp};

use super::cooldown::CooldownTimers;
use super::{Alert, Signal};

/// Compares the previous state with each accepted fragment and reports
/// transitions of the monitored signals, rate limited per signal.
#[derive(Debug)]
pub struct ChangeDetector {
    tank_empty_threshold_cm: f64,
    cooldowns: CooldownTimers,
}

impl ChangeDetector {
    pub fn new(tank_empty_threshold_cm: f64, cooldown: Duration) -> Self {
        Self {
            tank_empty_threshold_cm,
            cooldowns: CooldownTimers::new(cooldown),
        }
    }

    pub fn detect(
        &mut self,
        previous: &SensorFields,
        fragment: &CanonicalFragment,
        now: Instant,
    ) -> Vec<Alert> {
        let time = timestamp::format(fragment.timestamp);
        let current = &fragment.fields;

        let transitions = [
            relay_change(previous, current, &time),
            rain_change(previous, current, &time),
            soil_change(previous, current, &time),
            tank_change(previous, current, &time, self.tank_empty_threshold_cm),
        ];

        let mut alerts = Vec::new();
        for alert in transitions.into_iter().flatten() {
            if self.cooldowns.try_acquire(alert.signal, now) {
                alerts.push(alert);
            } else {
                tracing::debug!(
                    "{} alert suppressed, cooldown {:?} not elapsed",
                    alert.signal,
                    self.cooldowns.window()
                );
            }
        }

        alerts
    }
}

fn relay_change(previous: &SensorFields, current: &SensorFields, time: &str) -> Option<Alert> {
    let now_on = current.relay?;
    let was_on = previous.relay?;
    if was_on == now_on {
        return None;
    }

    let action = if now_on { "turned on" } else { "turned off" };
    Some(Alert::new(
        Signal::Relay,
        format!("💧 *Pump* {action}.\nTime: {time}"),
    ))
}

fn rain_change(previous: &SensorFields, current: &SensorFields, time: &str) -> Option<Alert> {
    let now = current.rain_level()?;
    let before = previous.rain_level()?;
    if now == before {
        return None;
    }

    let action = if now == 1 { "Rain detected 🌧️" } else { "Rain stopped" };
    Some(Alert::new(Signal::Rain, format!("☔ {action}\nTime: {time}")))
}

fn soil_change(previous: &SensorFields, current: &SensorFields, time: &str) -> Option<Alert> {
    let dry = current.soil_dry()?;
    let was_dry = previous.soil_dry()?;
    if dry == was_dry {
        return None;
    }

    let action = if dry {
        "Soil DRY (needs irrigation) 🌱"
    } else {
        "Soil OK (no irrigation needed)"
    };
    let moisture = current
        .capacitivo
        .map(|avg| format!("\nAverage moisture: {avg}%"))
        .unwrap_or_default();

    Some(Alert::new(
        Signal::SoilMoisture,
        format!("🌾 {action}{moisture}\nTime: {time}"),
    ))
}

fn tank_change(
    previous: &SensorFields,
    current: &SensorFields,
    time: &str,
    threshold_cm: f64,
) -> Option<Alert> {
    let distance = current.distance?;
    let previous_distance = previous.distance?;

    let empty = distance >= threshold_cm;
    if empty == (previous_distance >= threshold_cm) {
        return None;
    }

    let message = if empty {
        format!("🚱 *Tank empty* detected.\nMeasured distance: {distance:.2} cm\nTime: {time}")
    } else {
        format!("💧 *Tank has water* again.\nMeasured distance: {distance:.2} cm\nTime: {time}")
    };

    Some(Alert::new(Signal::TankLevel, message))
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    const COOLDOWN: Duration = Duration::from_secs(60);

    fn fragment(fields: SensorFields) -> CanonicalFragment {
        CanonicalFragment {
            timestamp: datetime!(2024-05-01 08:30:00 UTC),
            fields,
        }
    }

    fn signals(alerts: &[Alert]) -> Vec<Signal> {
        alerts.iter().map(|alert| alert.signal).collect()
    }

    #[test]
    fn test_relay_requires_known_previous() {
        let mut detector = ChangeDetector::new(18.9, COOLDOWN);
        let now = Instant::now();

        let on = fragment(SensorFields {
            relay: Some(true),
            ..Default::default()
        });
        assert!(detector.detect(&SensorFields::default(), &on, now).is_empty());

        let previous = SensorFields {
            relay: Some(false),
            ..Default::default()
        };
        let alerts = detector.detect(&previous, &on, now);
        assert_eq!(signals(&alerts), vec![Signal::Relay]);
        assert!(alerts[0].message.contains("turned on"));
        assert!(alerts[0].message.contains("2024-05-01T08:30:00.000Z"));

        let unrelated = fragment(SensorFields {
            temperature: Some(21.0),
            ..Default::default()
        });
        assert!(detector.detect(&previous, &unrelated, now + COOLDOWN).is_empty());
    }

    #[test]
    fn test_relay_cooldown() {
        let mut detector = ChangeDetector::new(18.9, COOLDOWN);
        let start = Instant::now();
        let on = SensorFields {
            relay: Some(true),
            ..Default::default()
        };
        let off = SensorFields {
            relay: Some(false),
            ..Default::default()
        };

        assert_eq!(detector.detect(&off, &fragment(on.clone()), start).len(), 1);
        assert!(
            detector
                .detect(&on, &fragment(off.clone()), start + Duration::from_secs(10))
                .is_empty()
        );

        let alerts = detector.detect(&off, &fragment(on.clone()), start + Duration::from_secs(61));
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].message.contains("turned on"));
    }

    #[test]
    fn test_rain_falls_back_to_digital_pin() {
        let mut detector = ChangeDetector::new(18.9, COOLDOWN);
        let now = Instant::now();

        let previous = SensorFields {
            rain_digital_raw: Some(0),
            ..Default::default()
        };
        let current = fragment(SensorFields {
            rain: Some(1),
            ..Default::default()
        });

        let alerts = detector.detect(&previous, &current, now);
        assert_eq!(signals(&alerts), vec![Signal::Rain]);
        assert!(alerts[0].message.contains("Rain detected"));

        let stopped = fragment(SensorFields {
            rain_digital_raw: Some(0),
            ..Default::default()
        });
        let previous = SensorFields {
            rain: Some(1),
            ..Default::default()
        };
        let alerts = detector.detect(&previous, &stopped, now + COOLDOWN);
        assert!(alerts[0].message.contains("Rain stopped"));
    }

    #[test]
    fn test_soil_derived_from_average() {
        let mut detector = ChangeDetector::new(18.9, COOLDOWN);
        let now = Instant::now();

        let previous = SensorFields {
            capacitivo: Some(55.0),
            ..Default::default()
        };
        let current = fragment(SensorFields {
            capacitivo: Some(30.0),
            capacitivo_state: Some(true),
            ..Default::default()
        });

        let alerts = detector.detect(&previous, &current, now);
        assert_eq!(signals(&alerts), vec![Signal::SoilMoisture]);
        assert!(alerts[0].message.contains("Soil DRY"));
        assert!(alerts[0].message.contains("Average moisture: 30%"));
    }

    #[test]
    fn test_tank_transitions() {
        let mut detector = ChangeDetector::new(18.9, COOLDOWN);
        let start = Instant::now();

        let first = fragment(SensorFields {
            distance: Some(19.0),
            ..Default::default()
        });
        assert!(detector.detect(&SensorFields::default(), &first, start).is_empty());

        let refilled = fragment(SensorFields {
            distance: Some(5.0),
            ..Default::default()
        });
        let alerts = detector.detect(&first.fields, &refilled, start + Duration::from_secs(1));
        assert_eq!(signals(&alerts), vec![Signal::TankLevel]);
        assert!(alerts[0].message.contains("Tank has water"));
        assert!(alerts[0].message.contains("5.00 cm"));

        let repeat = fragment(SensorFields {
            distance: Some(4.0),
            ..Default::default()
        });
        assert!(
            detector
                .detect(&refilled.fields, &repeat, start + Duration::from_secs(2))
                .is_empty()
        );

        let drained = fragment(SensorFields {
            distance: Some(19.5),
            ..Default::default()
        });
        assert!(
            detector
                .detect(&repeat.fields, &drained, start + Duration::from_secs(3))
                .is_empty()
        );
    }

    #[test]
    fn test_signals_are_independent() {
        let mut detector = ChangeDetector::new(18.9, COOLDOWN);
        let now = Instant::now();

        let previous = SensorFields {
            relay: Some(false),
            rain: Some(0),
            capacitivo_state: Some(false),
            distance: Some(10.0),
            ..Default::default()
        };
        let current = fragment(SensorFields {
            relay: Some(true),
            rain: Some(1),
            capacitivo_state: Some(true),
            distance: Some(19.0),
            ..Default::default()
        });

        let alerts = detector.detect(&previous, &current, now);
        assert_eq!(
            signals(&alerts),
            vec![
                Signal::Relay,
                Signal::Rain,
                Signal::SoilMoisture,
                Signal::TankLevel
            ]
        );
        assert!(alerts[3].message.contains("Tank empty"));
    }
}
