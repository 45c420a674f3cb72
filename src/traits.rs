//! Core traits for talking to the management subsystem.
//!
//! This module defines the `Sysman` trait that every backend (the Level Zero
//! loader or the in-process simulation) implements, and the configuration a
//! session is run with.

use crate::status::Status;
use crate::sysman::{
    DeviceHandle, DeviceProperties, DiagSuiteHandle, DiagnosticSuiteProperties, DriverHandle,
    InitFlags,
};

/// Configuration for one diagnostics session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Report per-device properties while resolving.
    pub verbose: bool,
    /// Treat every non-success subsystem status as fatal.
    pub strict: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            verbose: true,
            strict: false,
        }
    }
}

/// The management subsystem call contract.
///
/// Enumeration calls follow the two-phase protocol: called with no buffer they
/// store the number of available items in `count`; called with a buffer they
/// fill at most `count` entries and store how many were written.
///
/// Calls are synchronous and block until the subsystem answers.
pub trait Sysman {
    /// Returns the name of this backend (e.g., "level-zero").
    fn name(&self) -> &'static str;

    /// Initializes the subsystem for the given device classes.
    fn init(&mut self, flags: InitFlags) -> Status;

    /// Enumerates driver instances.
    fn driver_get(&mut self, count: &mut u32, drivers: Option<&mut [DriverHandle]>) -> Status;

    /// Enumerates devices under `driver`.
    fn device_get(
        &mut self,
        driver: DriverHandle,
        count: &mut u32,
        devices: Option<&mut [DeviceHandle]>,
    ) -> Status;

    /// Fetches a property snapshot for `device`.
    fn device_properties(&mut self, device: DeviceHandle) -> Result<DeviceProperties, Status>;

    /// Enumerates diagnostic test suites on `device`.
    fn enum_diagnostic_suites(
        &mut self,
        device: DeviceHandle,
        count: &mut u32,
        suites: Option<&mut [DiagSuiteHandle]>,
    ) -> Status;

    /// Fetches descriptive properties for `suite`.
    fn diagnostic_properties(
        &mut self,
        suite: DiagSuiteHandle,
    ) -> Result<DiagnosticSuiteProperties, Status>;

    /// Runs sub-tests `start..end` of `suite` and returns the raw result code.
    ///
    /// Blocks until the subsystem finishes testing.
    fn run_diagnostic_tests(
        &mut self,
        suite: DiagSuiteHandle,
        start: u32,
        end: u32,
    ) -> Result<u32, Status>;
}
