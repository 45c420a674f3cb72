//! Handles and property snapshots exchanged with the subsystem.
//!
//! Handles are plain values: the subsystem owns whatever they refer to for
//! the lifetime of the session. Each child handle remembers the parent it was
//! enumerated under so a backend can reject it outside that scope.

use bitflags::bitflags;
use std::fmt;

/// An opaque subsystem identifier. Zero is the null handle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RawHandle(pub usize);

impl RawHandle {
    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// One driver instance of the management subsystem.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DriverHandle {
    pub raw: RawHandle,
}

/// One accelerator, valid only together with the driver that produced it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DeviceHandle {
    pub raw: RawHandle,
    pub driver: RawHandle,
}

/// One diagnostic test suite, valid only on the device that produced it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DiagSuiteHandle {
    pub raw: RawHandle,
    pub device: RawHandle,
}

impl DeviceHandle {
    /// Returns true if this device was enumerated under `driver`.
    pub fn belongs_to(&self, driver: DriverHandle) -> bool {
        !self.raw.is_null() && self.driver == driver.raw
    }
}

impl DiagSuiteHandle {
    /// Returns true if this suite was enumerated on `device`.
    pub fn belongs_to(&self, device: DeviceHandle) -> bool {
        !self.raw.is_null() && self.device == device.raw
    }
}

bitflags! {
    /// Device classes the subsystem is initialized for.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InitFlags: u32 {
        const GPU_ONLY = 1 << 0;
    }
}

bitflags! {
    /// Capability flags reported in device properties.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct DeviceFlags: u32 {
        const INTEGRATED = 1 << 0;
        const SUBDEVICE = 1 << 1;
        const ECC = 1 << 2;
        const ONDEMANDPAGING = 1 << 3;
    }
}

/// Device class reported in device properties.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeviceType {
    Gpu,
    Cpu,
    Fpga,
    Mca,
    Vpu,
    #[default]
    Unknown,
}

impl DeviceType {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => DeviceType::Gpu,
            2 => DeviceType::Cpu,
            3 => DeviceType::Fpga,
            4 => DeviceType::Mca,
            5 => DeviceType::Vpu,
            _ => DeviceType::Unknown,
        }
    }
}

/// Snapshot of one device's properties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceProperties {
    /// Device name (e.g., "Intel(R) Data Center GPU Max 1550").
    pub name: String,
    pub device_type: DeviceType,
    /// PCI vendor id.
    pub vendor_id: u32,
    pub flags: DeviceFlags,
}

impl DeviceProperties {
    pub fn vendor(&self) -> String {
        vendor_name(self.vendor_id)
    }
}

impl fmt::Display for DeviceProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {:?}, flags {:?})",
            self.name,
            self.vendor(),
            self.device_type,
            self.flags
        )
    }
}

/// Descriptive metadata of one diagnostic test suite.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticSuiteProperties {
    pub name: String,
    /// Whether the suite runs on a sub-device.
    pub on_subdevice: bool,
    /// Sub-device id, meaningful only when `on_subdevice` is set.
    pub subdevice_id: u32,
    /// Whether the suite is divisible into named sub-tests.
    pub have_tests: bool,
}

/// Convert vendor ID to human-readable name.
fn vendor_name(vendor_id: u32) -> String {
    match vendor_id {
        0x1002 => "AMD".to_string(),
        0x10DE => "NVIDIA".to_string(),
        0x8086 => "Intel".to_string(),
        _ => format!("Unknown (0x{:04X})", vendor_id),
    }
}
