pub mod config;
pub mod error;
pub mod math;
pub mod types;

pub use config::AlertThresholds;
pub use error::PulseWatchError;
pub use types::*;
