//! Tracing setup. Call [`Logger::new_bootstrap`] once per process.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
