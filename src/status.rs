//! Status codes returned by the management subsystem.
//!
//! Every Sysman call reports one of these. Only a handful are expected in
//! practice, but the full vocabulary is kept so a failing call can always be
//! reported by its symbolic name.

use crate::error::DiagError;
use crate::stats::CallStats;
use crate::traits::SessionConfig;
use std::fmt;

macro_rules! statuses {
    ($($variant:ident = $value:literal => $name:literal,)*) => {
        /// A status reported by a management subsystem call.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Status {
            Success,
            $($variant,)*
            /// A code outside the known vocabulary.
            Unrecognized(u32),
        }

        impl Status {
            /// Maps a raw `ze_result_t` value onto a `Status`.
            pub fn from_raw(raw: u32) -> Self {
                match raw {
                    0 => Status::Success,
                    $($value => Status::$variant,)*
                    other => Status::Unrecognized(other),
                }
            }

            /// Returns the raw `ze_result_t` value.
            pub fn raw(self) -> u32 {
                match self {
                    Status::Success => 0,
                    $(Status::$variant => $value,)*
                    Status::Unrecognized(raw) => raw,
                }
            }

            /// Returns the symbolic name used in log lines.
            ///
            /// Codes outside the vocabulary are reported as
            /// `ZE_RESULT_ERROR_UNKNOWN` rather than as a number.
            pub fn name(self) -> &'static str {
                match self {
                    Status::Success => "ZE_RESULT_SUCCESS",
                    $(Status::$variant => $name,)*
                    Status::Unrecognized(_) => "ZE_RESULT_ERROR_UNKNOWN",
                }
            }
        }
    };
}

statuses! {
    NotReady = 0x1 => "ZE_RESULT_NOT_READY",
    DeviceLost = 0x7000_0001 => "ZE_RESULT_ERROR_DEVICE_LOST",
    OutOfHostMemory = 0x7000_0002 => "ZE_RESULT_ERROR_OUT_OF_HOST_MEMORY",
    OutOfDeviceMemory = 0x7000_0003 => "ZE_RESULT_ERROR_OUT_OF_DEVICE_MEMORY",
    ModuleBuildFailure = 0x7000_0004 => "ZE_RESULT_ERROR_MODULE_BUILD_FAILURE",
    ModuleLinkFailure = 0x7000_0005 => "ZE_RESULT_ERROR_MODULE_LINK_FAILURE",
    InsufficientPermissions = 0x7001_0000 => "ZE_RESULT_ERROR_INSUFFICIENT_PERMISSIONS",
    NotAvailable = 0x7001_0001 => "ZE_RESULT_ERROR_NOT_AVAILABLE",
    DependencyUnavailable = 0x7002_0000 => "ZE_RESULT_ERROR_DEPENDENCY_UNAVAILABLE",
    Uninitialized = 0x7800_0001 => "ZE_RESULT_ERROR_UNINITIALIZED",
    UnsupportedVersion = 0x7800_0002 => "ZE_RESULT_ERROR_UNSUPPORTED_VERSION",
    UnsupportedFeature = 0x7800_0003 => "ZE_RESULT_ERROR_UNSUPPORTED_FEATURE",
    InvalidArgument = 0x7800_0004 => "ZE_RESULT_ERROR_INVALID_ARGUMENT",
    InvalidNullHandle = 0x7800_0005 => "ZE_RESULT_ERROR_INVALID_NULL_HANDLE",
    HandleObjectInUse = 0x7800_0006 => "ZE_RESULT_ERROR_HANDLE_OBJECT_IN_USE",
    InvalidNullPointer = 0x7800_0007 => "ZE_RESULT_ERROR_INVALID_NULL_POINTER",
    InvalidSize = 0x7800_0008 => "ZE_RESULT_ERROR_INVALID_SIZE",
    UnsupportedSize = 0x7800_0009 => "ZE_RESULT_ERROR_UNSUPPORTED_SIZE",
    UnsupportedAlignment = 0x7800_000a => "ZE_RESULT_ERROR_UNSUPPORTED_ALIGNMENT",
    InvalidSynchronizationObject = 0x7800_000b => "ZE_RESULT_ERROR_INVALID_SYNCHRONIZATION_OBJECT",
    InvalidEnumeration = 0x7800_000c => "ZE_RESULT_ERROR_INVALID_ENUMERATION",
    UnsupportedEnumeration = 0x7800_000d => "ZE_RESULT_ERROR_UNSUPPORTED_ENUMERATION",
    UnsupportedImageFormat = 0x7800_000e => "ZE_RESULT_ERROR_UNSUPPORTED_IMAGE_FORMAT",
    InvalidNativeBinary = 0x7800_000f => "ZE_RESULT_ERROR_INVALID_NATIVE_BINARY",
    InvalidGlobalName = 0x7800_0010 => "ZE_RESULT_ERROR_INVALID_GLOBAL_NAME",
    InvalidKernelName = 0x7800_0011 => "ZE_RESULT_ERROR_INVALID_KERNEL_NAME",
    InvalidFunctionName = 0x7800_0012 => "ZE_RESULT_ERROR_INVALID_FUNCTION_NAME",
    InvalidGroupSizeDimension = 0x7800_0013 => "ZE_RESULT_ERROR_INVALID_GROUP_SIZE_DIMENSION",
    InvalidGlobalWidthDimension = 0x7800_0014 => "ZE_RESULT_ERROR_INVALID_GLOBAL_WIDTH_DIMENSION",
    InvalidKernelArgumentIndex = 0x7800_0015 => "ZE_RESULT_ERROR_INVALID_KERNEL_ARGUMENT_INDEX",
    InvalidKernelArgumentSize = 0x7800_0016 => "ZE_RESULT_ERROR_INVALID_KERNEL_ARGUMENT_SIZE",
    InvalidKernelAttributeValue = 0x7800_0017 => "ZE_RESULT_ERROR_INVALID_KERNEL_ATTRIBUTE_VALUE",
    InvalidModuleUnlinked = 0x7800_0018 => "ZE_RESULT_ERROR_INVALID_MODULE_UNLINKED",
    InvalidCommandListType = 0x7800_0019 => "ZE_RESULT_ERROR_INVALID_COMMAND_LIST_TYPE",
    OverlappingRegions = 0x7800_001a => "ZE_RESULT_ERROR_OVERLAPPING_REGIONS",
    Unknown = 0x7fff_fffe => "ZE_RESULT_ERROR_UNKNOWN",
}

impl Status {
    pub fn is_success(self) -> bool {
        self == Status::Success
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Applies the soft/strict error policy to the status of one subsystem call.
///
/// A non-success status is always logged with the call and its call site. In
/// the default policy execution then continues with whatever the call left
/// behind; with `strict` set the status is returned as
/// [`DiagError::Subsystem`] instead.
#[track_caller]
pub fn check(
    status: Status,
    call: &'static str,
    config: &SessionConfig,
    stats: &CallStats,
) -> Result<(), DiagError> {
    stats.add_call();
    if status.is_success() {
        return Ok(());
    }

    let site = std::panic::Location::caller();
    stats.add_soft_error();
    log::warn!(
        "{} ({:#x}) returned by {}: {}:{}",
        status.name(),
        status.raw(),
        call,
        site.file(),
        site.line()
    );

    if config.strict {
        Err(DiagError::Subsystem { call, status })
    } else {
        Ok(())
    }
}

/// Like [`check`] for calls that produce a value.
///
/// On a tolerated failure the value falls back to `T::default()`, mirroring
/// an output struct the subsystem never filled in.
#[track_caller]
pub fn check_value<T: Default>(
    result: Result<T, Status>,
    call: &'static str,
    config: &SessionConfig,
    stats: &CallStats,
) -> Result<T, DiagError> {
    match result {
        Ok(value) => {
            check(Status::Success, call, config, stats)?;
            Ok(value)
        }
        Err(status) => {
            check(status, call, config, stats)?;
            Ok(T::default())
        }
    }
}
