//! Management subsystem backends.
//!
//! The Level Zero backend talks to the real Sysman API through the system
//! loader; the simulated backend runs entirely in-process.

pub mod handles;
#[cfg(feature = "level-zero")]
pub mod level_zero;
pub mod simulated;

pub use handles::{
    DeviceFlags, DeviceHandle, DeviceProperties, DeviceType, DiagSuiteHandle,
    DiagnosticSuiteProperties, DriverHandle, InitFlags, RawHandle,
};
#[cfg(feature = "level-zero")]
pub use level_zero::LevelZeroSysman;
pub use simulated::SimulatedSysman;
