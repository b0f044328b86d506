pub mod error;
pub mod sample;
pub mod stats;

pub use error::{PulseError, Result};
pub use sample::Sample;
pub use stats::DerivedStats;
