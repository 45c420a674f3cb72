//! In-process simulation of the management subsystem.
//!
//! Drivers, devices and suites are registered up front; every call made
//! against the simulation is recorded so a session can be inspected after it
//! ran. Individual calls can be made to fail with a chosen status.

use crate::outcome::{RAW_ABORT, RAW_FAIL_CANT_REPAIR, RAW_NO_ERRORS, RAW_REBOOT_FOR_REPAIR};
use crate::status::Status;
use crate::sysman::{
    DeviceFlags, DeviceHandle, DeviceProperties, DeviceType, DiagSuiteHandle,
    DiagnosticSuiteProperties, DriverHandle, InitFlags, RawHandle,
};
use crate::traits::Sysman;
use std::collections::HashMap;

/// Identifies a call for fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Init,
    DriverGet,
    DeviceGet,
    DeviceProperties,
    EnumDiagnosticSuites,
    DiagnosticProperties,
    RunDiagnosticTests,
}

/// One recorded call.
///
/// Enumeration calls record the buffer length passed in (`None` for the
/// count-discovery phase) and the count stored on return.
#[allow(dead_code)] // Read by session tests
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Init(InitFlags),
    DriverGet {
        buffer_len: Option<usize>,
        count: u32,
    },
    DeviceGet {
        buffer_len: Option<usize>,
        count: u32,
    },
    DeviceProperties(RawHandle),
    EnumDiagnosticSuites {
        buffer_len: Option<usize>,
        count: u32,
    },
    DiagnosticProperties(RawHandle),
    RunDiagnosticTests {
        suite: RawHandle,
        start: u32,
        end: u32,
    },
}

#[allow(dead_code)] // Read by session tests
impl Call {
    pub fn kind(&self) -> CallKind {
        match self {
            Call::Init(_) => CallKind::Init,
            Call::DriverGet { .. } => CallKind::DriverGet,
            Call::DeviceGet { .. } => CallKind::DeviceGet,
            Call::DeviceProperties(_) => CallKind::DeviceProperties,
            Call::EnumDiagnosticSuites { .. } => CallKind::EnumDiagnosticSuites,
            Call::DiagnosticProperties(_) => CallKind::DiagnosticProperties,
            Call::RunDiagnosticTests { .. } => CallKind::RunDiagnosticTests,
        }
    }
}

#[derive(Debug, Clone)]
struct SimDevice {
    driver: usize,
    properties: DeviceProperties,
}

#[derive(Debug, Clone)]
struct SimSuite {
    device: usize,
    properties: DiagnosticSuiteProperties,
    outcome: u32,
}

/// A scripted management subsystem.
#[derive(Debug, Clone, Default)]
pub struct SimulatedSysman {
    drivers: usize,
    devices: Vec<SimDevice>,
    suites: Vec<SimSuite>,
    faults: HashMap<CallKind, Status>,
    calls: Vec<Call>,
}

// Handle values are 1-based indices so that zero stays the null handle.
fn handle_for(index: usize) -> RawHandle {
    RawHandle(index + 1)
}

fn index_of(raw: RawHandle) -> Option<usize> {
    raw.0.checked_sub(1)
}

/// Writes up to `*count` of `items` into `buffer` following the two-phase
/// protocol and updates `*count`.
fn two_phase<T: Copy>(items: &[T], count: &mut u32, buffer: Option<&mut [T]>) {
    let available = items.len() as u32;
    match buffer {
        None => *count = available,
        Some(_) if *count == 0 => *count = available,
        Some(buffer) => {
            let written = (*count).min(available).min(buffer.len() as u32);
            buffer[..written as usize].copy_from_slice(&items[..written as usize]);
            *count = written;
        }
    }
}

impl SimulatedSysman {
    /// Creates an empty simulation with no drivers.
    pub fn new() -> Self {
        Self::default()
    }

    /// A single GPU on a single driver, exposing `suites` as
    /// `(name, outcome code)` pairs.
    pub fn single_gpu(suites: &[(&str, u32)]) -> Self {
        let mut sim = Self::new();
        let driver = sim.add_driver();
        let device = sim.add_device(
            driver,
            DeviceProperties {
                name: "Simulated GPU".to_string(),
                device_type: DeviceType::Gpu,
                vendor_id: 0x8086,
                flags: DeviceFlags::ECC | DeviceFlags::ONDEMANDPAGING,
            },
        );
        for (name, outcome) in suites {
            sim.add_suite(
                device,
                DiagnosticSuiteProperties {
                    name: name.to_string(),
                    on_subdevice: false,
                    subdevice_id: 0,
                    have_tests: false,
                },
                *outcome,
            );
        }
        sim
    }

    /// The demo machine used by `--backend simulated`.
    pub fn demo() -> Self {
        Self::single_gpu(&[
            ("MemoryTest", RAW_NO_ERRORS),
            ("ArrayTest", RAW_FAIL_CANT_REPAIR),
            ("ScanTest", RAW_REBOOT_FOR_REPAIR),
            ("PowerTest", RAW_ABORT),
        ])
    }

    /// Registers a driver and returns its index.
    pub fn add_driver(&mut self) -> usize {
        self.drivers += 1;
        self.drivers - 1
    }

    /// Registers a device under driver `driver` and returns its index.
    pub fn add_device(&mut self, driver: usize, properties: DeviceProperties) -> usize {
        self.devices.push(SimDevice { driver, properties });
        self.devices.len() - 1
    }

    /// Registers a suite on device `device` that reports `outcome` when run.
    pub fn add_suite(
        &mut self,
        device: usize,
        properties: DiagnosticSuiteProperties,
        outcome: u32,
    ) -> usize {
        self.suites.push(SimSuite {
            device,
            properties,
            outcome,
        });
        self.suites.len() - 1
    }

    /// Makes every subsequent call of `kind` fail with `status`.
    #[allow(dead_code)] // Used by session tests
    pub fn fail(&mut self, kind: CallKind, status: Status) -> &mut Self {
        self.faults.insert(kind, status);
        self
    }

    /// All calls made so far, in order.
    #[allow(dead_code)] // Used by session tests
    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// Number of calls of `kind` made so far.
    #[allow(dead_code)] // Used by session tests
    pub fn count_of(&self, kind: CallKind) -> usize {
        self.calls.iter().filter(|c| c.kind() == kind).count()
    }

    fn fault(&self, kind: CallKind) -> Option<Status> {
        self.faults.get(&kind).copied()
    }

    fn driver_handle(&self, index: usize) -> DriverHandle {
        DriverHandle {
            raw: handle_for(index),
        }
    }

    fn device_handle(&self, index: usize) -> DeviceHandle {
        DeviceHandle {
            raw: handle_for(index),
            driver: handle_for(self.devices[index].driver),
        }
    }

    fn suite_handle(&self, index: usize) -> DiagSuiteHandle {
        DiagSuiteHandle {
            raw: handle_for(index),
            device: handle_for(self.suites[index].device),
        }
    }

    fn lookup_driver(&self, driver: DriverHandle) -> Option<usize> {
        index_of(driver.raw).filter(|&i| i < self.drivers)
    }

    fn lookup_device(&self, device: DeviceHandle) -> Option<usize> {
        let index = index_of(device.raw).filter(|&i| i < self.devices.len())?;
        let driver = self.driver_handle(self.devices[index].driver);
        device.belongs_to(driver).then_some(index)
    }

    fn lookup_suite(&self, suite: DiagSuiteHandle) -> Option<usize> {
        let index = index_of(suite.raw).filter(|&i| i < self.suites.len())?;
        let device = self.device_handle(self.suites[index].device);
        suite.belongs_to(device).then_some(index)
    }
}

impl Sysman for SimulatedSysman {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn init(&mut self, flags: InitFlags) -> Status {
        self.calls.push(Call::Init(flags));
        self.fault(CallKind::Init).unwrap_or(Status::Success)
    }

    fn driver_get(&mut self, count: &mut u32, drivers: Option<&mut [DriverHandle]>) -> Status {
        let buffer_len = drivers.as_ref().map(|b| b.len());
        let status = match self.fault(CallKind::DriverGet) {
            Some(status) => status,
            None => {
                let handles: Vec<DriverHandle> =
                    (0..self.drivers).map(|i| self.driver_handle(i)).collect();
                two_phase(&handles, count, drivers);
                Status::Success
            }
        };
        self.calls.push(Call::DriverGet {
            buffer_len,
            count: *count,
        });
        status
    }

    fn device_get(
        &mut self,
        driver: DriverHandle,
        count: &mut u32,
        devices: Option<&mut [DeviceHandle]>,
    ) -> Status {
        let buffer_len = devices.as_ref().map(|b| b.len());
        let status = match (self.fault(CallKind::DeviceGet), self.lookup_driver(driver)) {
            (Some(status), _) => status,
            (None, None) => Status::InvalidNullHandle,
            (None, Some(driver_index)) => {
                let handles: Vec<DeviceHandle> = (0..self.devices.len())
                    .filter(|&i| self.devices[i].driver == driver_index)
                    .map(|i| self.device_handle(i))
                    .collect();
                two_phase(&handles, count, devices);
                Status::Success
            }
        };
        self.calls.push(Call::DeviceGet {
            buffer_len,
            count: *count,
        });
        status
    }

    fn device_properties(&mut self, device: DeviceHandle) -> Result<DeviceProperties, Status> {
        self.calls.push(Call::DeviceProperties(device.raw));
        if let Some(status) = self.fault(CallKind::DeviceProperties) {
            return Err(status);
        }
        let index = self
            .lookup_device(device)
            .ok_or(Status::InvalidNullHandle)?;
        Ok(self.devices[index].properties.clone())
    }

    fn enum_diagnostic_suites(
        &mut self,
        device: DeviceHandle,
        count: &mut u32,
        suites: Option<&mut [DiagSuiteHandle]>,
    ) -> Status {
        let buffer_len = suites.as_ref().map(|b| b.len());
        let status = match (
            self.fault(CallKind::EnumDiagnosticSuites),
            self.lookup_device(device),
        ) {
            (Some(status), _) => status,
            (None, None) => Status::InvalidNullHandle,
            (None, Some(device_index)) => {
                let handles: Vec<DiagSuiteHandle> = (0..self.suites.len())
                    .filter(|&i| self.suites[i].device == device_index)
                    .map(|i| self.suite_handle(i))
                    .collect();
                two_phase(&handles, count, suites);
                Status::Success
            }
        };
        self.calls.push(Call::EnumDiagnosticSuites {
            buffer_len,
            count: *count,
        });
        status
    }

    fn diagnostic_properties(
        &mut self,
        suite: DiagSuiteHandle,
    ) -> Result<DiagnosticSuiteProperties, Status> {
        self.calls.push(Call::DiagnosticProperties(suite.raw));
        if let Some(status) = self.fault(CallKind::DiagnosticProperties) {
            return Err(status);
        }
        let index = self.lookup_suite(suite).ok_or(Status::InvalidNullHandle)?;
        Ok(self.suites[index].properties.clone())
    }

    fn run_diagnostic_tests(
        &mut self,
        suite: DiagSuiteHandle,
        start: u32,
        end: u32,
    ) -> Result<u32, Status> {
        self.calls.push(Call::RunDiagnosticTests {
            suite: suite.raw,
            start,
            end,
        });
        if let Some(status) = self.fault(CallKind::RunDiagnosticTests) {
            return Err(status);
        }
        if start > end {
            return Err(Status::InvalidArgument);
        }
        let index = self.lookup_suite(suite).ok_or(Status::InvalidNullHandle)?;
        Ok(self.suites[index].outcome)
    }
}
