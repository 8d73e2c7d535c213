//! Shared utilities

pub mod clock;
pub mod logger;

pub use clock::{duration_ms, Clock, FixedClock, SystemClock, Timer};
pub use logger::{init_logger, LogLevel};
