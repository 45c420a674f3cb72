//! Diagnostic outcome classification.
//!
//! This module contains the `DiagnosticOutcome` enum, which turns the raw
//! result code of a diagnostic run into operator-facing guidance.

/// Raw `zes_diag_result_t` values.
pub const RAW_NO_ERRORS: u32 = 0;
pub const RAW_ABORT: u32 = 1;
pub const RAW_FAIL_CANT_REPAIR: u32 = 2;
pub const RAW_REBOOT_FOR_REPAIR: u32 = 3;
/// Sentinel at the top of the range; never a real result.
#[allow(dead_code)]
pub const RAW_FORCE_UINT32: u32 = 0x7fff_ffff;

/// Terminal result of one diagnostic run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticOutcome {
    NoErrors,
    RepairAppliedRebootRequired,
    FailedUnrepairable,
    Aborted,
    /// Any code outside the known set, including the sentinel.
    Undefined,
}

impl DiagnosticOutcome {
    /// Classifies a raw result code.
    ///
    /// Unrecognized codes are `Undefined`; they are never an error of the
    /// tool itself.
    pub fn classify(raw: u32) -> Self {
        match raw {
            RAW_NO_ERRORS => Self::NoErrors,
            RAW_REBOOT_FOR_REPAIR => Self::RepairAppliedRebootRequired,
            RAW_FAIL_CANT_REPAIR => Self::FailedUnrepairable,
            RAW_ABORT => Self::Aborted,
            _ => Self::Undefined,
        }
    }

    /// Returns the line reported to the operator.
    pub fn message(&self) -> &'static str {
        match self {
            Self::NoErrors => "no errors occurred",
            Self::RepairAppliedRebootRequired => "repair applied, reboot needed",
            Self::FailedUnrepairable => "ran, could not fix",
            Self::Aborted => "run failed with unknown cause",
            Self::Undefined => "undefined error",
        }
    }

    /// True if the device needs operator attention.
    pub fn needs_attention(&self) -> bool {
        !matches!(self, Self::NoErrors)
    }
}

impl std::fmt::Display for DiagnosticOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [DiagnosticOutcome; 5] = [
        DiagnosticOutcome::NoErrors,
        DiagnosticOutcome::RepairAppliedRebootRequired,
        DiagnosticOutcome::FailedUnrepairable,
        DiagnosticOutcome::Aborted,
        DiagnosticOutcome::Undefined,
    ];

    #[test]
    fn test_known_codes_classify() {
        assert_eq!(
            DiagnosticOutcome::classify(RAW_NO_ERRORS),
            DiagnosticOutcome::NoErrors
        );
        assert_eq!(
            DiagnosticOutcome::classify(RAW_REBOOT_FOR_REPAIR),
            DiagnosticOutcome::RepairAppliedRebootRequired
        );
        assert_eq!(
            DiagnosticOutcome::classify(RAW_FAIL_CANT_REPAIR),
            DiagnosticOutcome::FailedUnrepairable
        );
        assert_eq!(
            DiagnosticOutcome::classify(RAW_ABORT),
            DiagnosticOutcome::Aborted
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            DiagnosticOutcome::classify(RAW_NO_ERRORS).message(),
            "no errors occurred"
        );
        assert_eq!(
            DiagnosticOutcome::classify(RAW_REBOOT_FOR_REPAIR).message(),
            "repair applied, reboot needed"
        );
        assert_eq!(
            DiagnosticOutcome::classify(RAW_FAIL_CANT_REPAIR).message(),
            "ran, could not fix"
        );
        assert_eq!(
            DiagnosticOutcome::classify(RAW_ABORT).message(),
            "run failed with unknown cause"
        );
    }

    #[test]
    fn test_sentinel_is_undefined() {
        let outcome = DiagnosticOutcome::classify(RAW_FORCE_UINT32);
        assert_eq!(outcome, DiagnosticOutcome::Undefined);
        assert_eq!(outcome.message(), "undefined error");
    }

    #[test]
    fn test_out_of_range_codes_are_undefined() {
        for raw in [4, 17, 0x7fff_fffe, u32::MAX] {
            assert_eq!(
                DiagnosticOutcome::classify(raw),
                DiagnosticOutcome::Undefined,
                "code {:#x} should be undefined",
                raw
            );
        }
    }

    #[test]
    fn test_messages_are_distinct() {
        let mut messages: Vec<_> = ALL
            .iter()
            .map(|o| o.message())
            .collect();
        messages.sort();
        messages.dedup();
        assert_eq!(messages.len(), 5);
    }

    #[test]
    fn test_needs_attention() {
        assert!(!DiagnosticOutcome::NoErrors.needs_attention());
        assert!(DiagnosticOutcome::FailedUnrepairable.needs_attention());
        assert!(DiagnosticOutcome::Undefined.needs_attention());
        assert_eq!(DiagnosticOutcome::Aborted.to_string(), "run failed with unknown cause");
    }
}
