pub mod constants;
pub mod keys;
pub mod progress;
pub mod rounding;

pub use constants::*;
pub use keys::{date_id, location_id};
pub use progress::ProgressReporter;
pub use rounding::{round_half_up, round_temperature};
