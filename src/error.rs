//! Error types for device discovery and diagnostics.
//!
//! Soft subsystem failures are logged and tolerated (see [`crate::status::check`]);
//! everything in this module stops the session.

use crate::status::Status;
use thiserror::Error;

/// Unified error type for a diagnostics session.
#[derive(Error, Debug)]
pub enum DiagError {
    /// The subsystem reported no driver instances.
    #[error("Error could not retrieve driver")]
    NoDriver,

    /// The first driver reported no devices.
    #[error("Error could not retrieve device")]
    NoDevice,

    /// The device exposes no diagnostic test suites.
    #[error("Could not retrieve diagnostics domains")]
    NoSuites,

    /// A subsystem call failed while running in strict mode.
    #[error("{status} returned by {call}")]
    Subsystem { call: &'static str, status: Status },

    /// An enumeration count too large to use as a buffer size.
    #[error("{what} count {count} exceeds the limit of {limit}")]
    InvalidCount {
        what: &'static str,
        count: u32,
        limit: u32,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The requested backend is not compiled into this binary.
    #[cfg_attr(feature = "level-zero", allow(dead_code))] // Every backend is compiled in
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// I/O error while writing the report.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DiagError {
    /// Process exit status for a session that ended with this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            DiagError::NoSuites => -1,
            DiagError::Config(_) => 2,
            _ => 1,
        }
    }
}
