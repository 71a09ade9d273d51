pub mod models;
pub mod normalize;
pub mod reading;
pub mod timestamp;

pub use models::*;
pub use normalize::{normalize, normalize_at};
pub use reading::{RawReading, ReadingError};

/// Soil is considered dry below this average moisture percentage.
pub const SOIL_DRY_THRESHOLD_PCT: f64 = 40.0;
