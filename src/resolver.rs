//! Device discovery.
//!
//! Initializes the subsystem, picks the first driver instance and lists its
//! devices. Absence of a driver or device is fatal; every other failure is
//! subject to the session's error policy.

use crate::enumerate::enumerate;
use crate::error::DiagError;
use crate::stats::CallStats;
use crate::status::{check, check_value};
use crate::sysman::{DeviceHandle, DriverHandle, InitFlags};
use crate::traits::{SessionConfig, Sysman};
use std::io::Write;

/// The driver in use and its devices, in subsystem order.
#[derive(Debug, Clone)]
pub struct ResolvedDevices {
    pub driver: DriverHandle,
    /// Never empty.
    pub devices: Vec<DeviceHandle>,
}

impl ResolvedDevices {
    /// The device diagnostics run against.
    pub fn primary(&self) -> DeviceHandle {
        self.devices[0]
    }
}

/// Resolves the driver and devices of one session.
pub struct DeviceResolver<'a> {
    sysman: &'a mut dyn Sysman,
    config: &'a SessionConfig,
    stats: &'a CallStats,
}

impl<'a> DeviceResolver<'a> {
    pub fn new(sysman: &'a mut dyn Sysman, config: &'a SessionConfig, stats: &'a CallStats) -> Self {
        Self {
            sysman,
            config,
            stats,
        }
    }

    /// Runs discovery, writing device details to `out` when verbose.
    ///
    /// # Errors
    ///
    /// Returns `DiagError::NoDriver` or `DiagError::NoDevice` when the
    /// subsystem has nothing to offer, and `DiagError::Subsystem` for a
    /// failed call in strict mode.
    pub fn resolve(&mut self, out: &mut dyn Write) -> Result<ResolvedDevices, DiagError> {
        // Initialization warnings are tolerated; missing drivers decide.
        let status = self.sysman.init(InitFlags::GPU_ONLY);
        check(status, "zeInit", self.config, self.stats)?;

        let sysman = &mut *self.sysman;
        let drivers = enumerate("driver", "zeDriverGet", self.config, self.stats, |count, buffer| {
            sysman.driver_get(count, buffer)
        })?;
        let Some(&driver) = drivers.first() else {
            return Err(DiagError::NoDriver);
        };
        if drivers.len() > 1 {
            log::debug!("{} drivers found, using the first", drivers.len());
        }

        let devices = enumerate("device", "zeDeviceGet", self.config, self.stats, |count, buffer| {
            sysman.device_get(driver, count, buffer)
        })?;
        if devices.is_empty() {
            return Err(DiagError::NoDevice);
        }

        for device in &devices {
            let properties = check_value(
                self.sysman.device_properties(*device),
                "zeDeviceGetProperties",
                self.config,
                self.stats,
            )?;
            log::debug!("device {}: {}", device.raw, properties);

            if self.config.verbose {
                writeln!(out, "Device Name = {}", properties.name)?;
                writeln!(
                    out,
                    "deviceProperties.flags = {:#x} ({:?}) on device {}",
                    properties.flags.bits(),
                    properties.flags,
                    device.raw
                )?;
            }
        }

        Ok(ResolvedDevices { driver, devices })
    }
}
