//! Utility modules

pub mod error;
pub mod signal;

pub use error::{BenchError, Result};
pub use signal::{install_interrupt_handler, interrupted};
