//! Environment gate for the Sysman interface.
//!
//! The loader only exposes Sysman through core handles when
//! `ZES_ENABLE_SYSMAN=1`, so nothing is attempted unless it is set.

/// Variable that must be `"1"` for a session to start.
pub const SYSMAN_ENV_VAR: &str = "ZES_ENABLE_SYSMAN";

/// Returns true only when `value` is exactly `"1"`.
///
/// Unset, `"0"` and every other string disable the feature.
pub fn is_enabled(value: Option<&str>) -> bool {
    matches!(value, Some("1"))
}

/// Reads [`SYSMAN_ENV_VAR`] from the process environment.
pub fn sysman_enabled() -> bool {
    let value = std::env::var(SYSMAN_ENV_VAR).ok();
    is_enabled(value.as_deref())
}
