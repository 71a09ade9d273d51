use config::ConfigError;

use super::AlertError;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Alert sink error: {0}")]
    Alert(#[from] AlertError),
}
