use std::collections::HashMap;
use std::env;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Flat variable names understood for compatibility with existing deployments.
///
/// A blank value counts as unset, except where the third column allows it:
/// an empty `SERIAL_PORT` turns the serial transport off.
const LEGACY_VARIABLES: [(&str, &str, bool); 8] = [
    ("SERIAL_PORT", "transport.serial_path", true),
    ("SERIAL_BAUD", "transport.baud_rate", false),
    ("WS_PORT", "server.port", false),
    ("TANK_HEIGHT_CM", "tank.height_cm", false),
    ("TANK_EMPTY_MARGIN_CM", "tank.empty_margin_cm", false),
    ("NOTIFY_COOLDOWN_MS", "notify.cooldown_ms", false),
    ("TELEGRAM_TOKEN", "notify.telegram_token", false),
    ("TELEGRAM_CHAT_ID", "notify.telegram_chat_id", false),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logger {
    pub level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Serial,
    Tcp,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transport {
    pub kind: TransportKind,
    pub serial_path: String,
    pub baud_rate: u32,
    pub tcp_address: String,
    pub reconnect_delay_ms: u64,
}

impl Transport {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tank {
    pub height_cm: f64,
    pub empty_margin_cm: f64,
}

impl Tank {
    /// Distances at or beyond this mean the tank is empty.
    pub fn empty_threshold_cm(&self) -> f64 {
        self.height_cm - self.empty_margin_cm
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notify {
    pub cooldown_ms: u64,
    pub telegram_token: String,
    pub telegram_chat_id: String,
    pub api_base: String,
    pub timeout_ms: u64,
}

impl Notify {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn is_enabled(&self) -> bool {
        !self.telegram_token.trim().is_empty() && !self.telegram_chat_id.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub logger: Logger,
    pub transport: Transport,
    pub tank: Tank,
    pub notify: Notify,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or("development".into());

        Self::build(&run_mode, env::vars())
    }

    /// Layer defaults, config files, prefixed and legacy variables, in that order.
    pub fn build<I>(run_mode: &str, variables: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let variables: HashMap<String, String> = variables.into_iter().collect();

        let mut builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5001)?
            .set_default("logger.level", "info")?
            .set_default("transport.kind", "serial")?
            .set_default("transport.serial_path", "/dev/ttyUSB0")?
            .set_default("transport.baud_rate", 115200)?
            .set_default("transport.tcp_address", "127.0.0.1:7000")?
            .set_default("transport.reconnect_delay_ms", 3000)?
            .set_default("tank.height_cm", 19.9)?
            .set_default("tank.empty_margin_cm", 1.0)?
            .set_default("notify.cooldown_ms", 60000)?
            .set_default("notify.telegram_token", "")?
            .set_default("notify.telegram_chat_id", "")?
            .set_default("notify.api_base", "https://api.telegram.org")?
            .set_default("notify.timeout_ms", 10000)?
            .add_source(File::with_name("configs/default").required(false))
            .add_source(File::with_name(&format!("configs/{run_mode}")).required(false))
            .add_source(
                Environment::with_prefix("HYDROSENSE")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(variables.clone())),
            );

        for (variable, key, keep_blank) in LEGACY_VARIABLES {
            let value = variables
                .get(variable)
                .filter(|value| keep_blank || !value.trim().is_empty())
                .cloned();
            builder = builder.set_override_option(key, value)?;
        }

        builder.build()?.try_deserialize()
    }
}
