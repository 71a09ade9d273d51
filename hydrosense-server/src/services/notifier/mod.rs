mod cooldown;
mod detector;
mod sink;
mod telegram;

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use hydrosense_api::{CanonicalFragment, SensorFields};

use crate::configs::Settings;
use crate::errors::AlertError;

pub use cooldown::CooldownTimers;
pub use detector::ChangeDetector;
pub use sink::AlertSink;
pub use telegram::TelegramSink;

/// A monitored condition with its own cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Relay,
    Rain,
    SoilMoisture,
    TankLevel,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Signal::Relay => "relay",
            Signal::Rain => "rain",
            Signal::SoilMoisture => "soil",
            Signal::TankLevel => "tank",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub signal: Signal,
    pub message: String,
}

impl Alert {
    pub fn new(signal: Signal, message: impl Into<String>) -> Self {
        Self {
            signal,
            message: message.into(),
        }
    }
}

/// Turns state transitions into outbound alerts.
///
/// Delivery runs on detached tasks; a slow or failing sink never holds up
/// ingestion and a failed alert is logged, not retried.
pub struct Notifier {
    detector: ChangeDetector,
    sink: Option<Arc<dyn AlertSink>>,
}

impl Notifier {
    pub fn new(detector: ChangeDetector, sink: Option<Arc<dyn AlertSink>>) -> Self {
        Self { detector, sink }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, AlertError> {
        let detector = ChangeDetector::new(
            settings.tank.empty_threshold_cm(),
            settings.notify.cooldown(),
        );

        let sink: Option<Arc<dyn AlertSink>> = if settings.notify.is_enabled() {
            Some(Arc::new(TelegramSink::new(&settings.notify)?))
        } else {
            tracing::info!("Telegram credentials missing, alerting disabled");
            None
        };

        Ok(Self::new(detector, sink))
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Detect transitions and dispatch them; returns the alerts that fired.
    ///
    /// Must be called from within a tokio runtime when a sink is configured.
    pub fn notify(
        &mut self,
        previous: &SensorFields,
        fragment: &CanonicalFragment,
        now: Instant,
    ) -> Vec<Alert> {
        let alerts = self.detector.detect(previous, fragment, now);

        for alert in &alerts {
            tracing::info!("{} alert: {}", alert.signal, alert.message.replace('\n', " | "));

            let Some(sink) = self.sink.clone() else {
                continue;
            };
            let alert = alert.clone();
            tokio::spawn(async move {
                if let Err(e) = sink.send(&alert.message).await {
                    tracing::error!("Failed to deliver {} alert: {}", alert.signal, e);
                }
            });
        }

        alerts
    }
}
