//! Level Zero Sysman backend.
//!
//! Thin FFI layer over `libze_loader`. Only the structures and entry points
//! the diagnostics flow needs are declared. Core (`ze*`) handles double as
//! Sysman handles, which the loader allows only when `ZES_ENABLE_SYSMAN=1`
//! is set before `zeInit`.

use crate::status::Status;
use crate::sysman::{
    DeviceFlags, DeviceHandle, DeviceProperties, DeviceType, DiagSuiteHandle,
    DiagnosticSuiteProperties, DriverHandle, InitFlags, RawHandle,
};
use crate::traits::Sysman;
use std::ffi::{c_char, c_void};

type ZeResult = u32;
type ZeHandle = *mut c_void;

const ZE_MAX_DEVICE_NAME: usize = 256;
const ZE_MAX_DEVICE_UUID_SIZE: usize = 16;
const ZES_STRING_PROPERTY_SIZE: usize = 64;

const ZE_STRUCTURE_TYPE_DEVICE_PROPERTIES: u32 = 0x3;
const ZES_STRUCTURE_TYPE_DIAG_PROPERTIES: u32 = 0x4;

/// `ze_device_properties_t`
#[repr(C)]
#[allow(dead_code)]
struct ZeDeviceProperties {
    stype: u32,
    p_next: *mut c_void,
    device_type: u32,
    vendor_id: u32,
    device_id: u32,
    flags: u32,
    subdevice_id: u32,
    core_clock_rate: u32,
    max_mem_alloc_size: u64,
    max_hardware_contexts: u32,
    max_command_queue_priority: u32,
    num_threads_per_eu: u32,
    physical_eu_simd_width: u32,
    num_eus_per_subslice: u32,
    num_subslices_per_slice: u32,
    num_slices: u32,
    timer_resolution: u64,
    timestamp_valid_bits: u32,
    kernel_timestamp_valid_bits: u32,
    uuid: [u8; ZE_MAX_DEVICE_UUID_SIZE],
    name: [c_char; ZE_MAX_DEVICE_NAME],
}

/// `zes_diag_properties_t`
#[repr(C)]
#[allow(dead_code)]
struct ZesDiagProperties {
    stype: u32,
    p_next: *mut c_void,
    on_subdevice: u8,
    subdevice_id: u32,
    name: [c_char; ZES_STRING_PROPERTY_SIZE],
    have_tests: u8,
}

#[link(name = "ze_loader")]
unsafe extern "C" {
    fn zeInit(flags: u32) -> ZeResult;
    fn zeDriverGet(count: *mut u32, drivers: *mut ZeHandle) -> ZeResult;
    fn zeDeviceGet(driver: ZeHandle, count: *mut u32, devices: *mut ZeHandle) -> ZeResult;
    fn zeDeviceGetProperties(device: ZeHandle, props: *mut ZeDeviceProperties) -> ZeResult;
    fn zesDeviceEnumDiagnosticTestSuites(
        device: ZeHandle,
        count: *mut u32,
        suites: *mut ZeHandle,
    ) -> ZeResult;
    fn zesDiagnosticsGetProperties(suite: ZeHandle, props: *mut ZesDiagProperties) -> ZeResult;
    fn zesDiagnosticsRunTests(
        suite: ZeHandle,
        start: u32,
        end: u32,
        result: *mut u32,
    ) -> ZeResult;
}

fn to_ptr(raw: RawHandle) -> ZeHandle {
    raw.0 as ZeHandle
}

fn from_ptr(ptr: ZeHandle) -> RawHandle {
    RawHandle(ptr as usize)
}

/// Reads a NUL-terminated fixed-size C string field.
fn fixed_str(field: &[c_char]) -> String {
    let bytes: Vec<u8> = field
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Runs one enumeration call with either no buffer or a raw handle buffer,
/// then wraps the raw handles into typed ones.
fn enumerate_raw<H>(
    count: &mut u32,
    buffer: Option<&mut [H]>,
    wrap: impl Fn(RawHandle) -> H,
    call: impl FnOnce(*mut u32, *mut ZeHandle) -> ZeResult,
) -> Status {
    match buffer {
        None => Status::from_raw(call(&mut *count as *mut u32, std::ptr::null_mut())),
        Some(buffer) => {
            *count = (*count).min(buffer.len() as u32);
            let mut raw: Vec<ZeHandle> = vec![std::ptr::null_mut(); *count as usize];
            let status = Status::from_raw(call(&mut *count as *mut u32, raw.as_mut_ptr()));
            let filled = (*count as usize).min(raw.len());
            for (slot, ptr) in buffer.iter_mut().zip(&raw[..filled]) {
                *slot = wrap(from_ptr(*ptr));
            }
            status
        }
    }
}

/// The Level Zero loader as a management subsystem.
#[derive(Debug, Default)]
pub struct LevelZeroSysman {
    _private: (),
}

impl LevelZeroSysman {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Sysman for LevelZeroSysman {
    fn name(&self) -> &'static str {
        "level-zero"
    }

    fn init(&mut self, flags: InitFlags) -> Status {
        Status::from_raw(unsafe { zeInit(flags.bits()) })
    }

    fn driver_get(&mut self, count: &mut u32, drivers: Option<&mut [DriverHandle]>) -> Status {
        enumerate_raw(
            count,
            drivers,
            |raw| DriverHandle { raw },
            |count, buffer| unsafe { zeDriverGet(count, buffer) },
        )
    }

    fn device_get(
        &mut self,
        driver: DriverHandle,
        count: &mut u32,
        devices: Option<&mut [DeviceHandle]>,
    ) -> Status {
        enumerate_raw(
            count,
            devices,
            |raw| DeviceHandle {
                raw,
                driver: driver.raw,
            },
            |count, buffer| unsafe { zeDeviceGet(to_ptr(driver.raw), count, buffer) },
        )
    }

    fn device_properties(&mut self, device: DeviceHandle) -> Result<DeviceProperties, Status> {
        // SAFETY: all-zero is a valid bit pattern for this plain C struct.
        let mut props: ZeDeviceProperties = unsafe { std::mem::zeroed() };
        props.stype = ZE_STRUCTURE_TYPE_DEVICE_PROPERTIES;
        let status =
            Status::from_raw(unsafe { zeDeviceGetProperties(to_ptr(device.raw), &mut props) });
        if !status.is_success() {
            return Err(status);
        }
        Ok(DeviceProperties {
            name: fixed_str(&props.name),
            device_type: DeviceType::from_raw(props.device_type),
            vendor_id: props.vendor_id,
            flags: DeviceFlags::from_bits_truncate(props.flags),
        })
    }

    fn enum_diagnostic_suites(
        &mut self,
        device: DeviceHandle,
        count: &mut u32,
        suites: Option<&mut [DiagSuiteHandle]>,
    ) -> Status {
        enumerate_raw(
            count,
            suites,
            |raw| DiagSuiteHandle {
                raw,
                device: device.raw,
            },
            |count, buffer| unsafe {
                zesDeviceEnumDiagnosticTestSuites(to_ptr(device.raw), count, buffer)
            },
        )
    }

    fn diagnostic_properties(
        &mut self,
        suite: DiagSuiteHandle,
    ) -> Result<DiagnosticSuiteProperties, Status> {
        // SAFETY: all-zero is a valid bit pattern for this plain C struct.
        let mut props: ZesDiagProperties = unsafe { std::mem::zeroed() };
        props.stype = ZES_STRUCTURE_TYPE_DIAG_PROPERTIES;
        let status =
            Status::from_raw(unsafe { zesDiagnosticsGetProperties(to_ptr(suite.raw), &mut props) });
        if !status.is_success() {
            return Err(status);
        }
        Ok(DiagnosticSuiteProperties {
            name: fixed_str(&props.name),
            on_subdevice: props.on_subdevice != 0,
            subdevice_id: props.subdevice_id,
            have_tests: props.have_tests != 0,
        })
    }

    fn run_diagnostic_tests(
        &mut self,
        suite: DiagSuiteHandle,
        start: u32,
        end: u32,
    ) -> Result<u32, Status> {
        let mut result: u32 = 0;
        let status = Status::from_raw(unsafe {
            zesDiagnosticsRunTests(to_ptr(suite.raw), start, end, &mut result)
        });
        if status.is_success() {
            Ok(result)
        } else {
            Err(status)
        }
    }
}
