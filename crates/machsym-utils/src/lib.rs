//! # machsym Utilities
//!
//! Shared logging and environment configuration for machsym.
//!
//! This crate provides the `tracing` setup used by the command line tool.
//! The core library only emits events; installing a subscriber is left to
//! binaries.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{
    init_logging, init_logging_with_level, init_with, LogFormat, LogLevel, LoggingConfig, LoggingError, LoggingGuard,
};
pub use tracing::{debug, error, info, trace, warn};
