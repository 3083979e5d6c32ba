//! Logging for the dataset builder
//!
//! This module provides:
//! - Bracketed log formatting
//! - Dual logging (run log file + stdout)

mod formatter;
mod setup;

pub use formatter::BracketedFormatter;
pub use setup::{setup_logging, LoggingError};
