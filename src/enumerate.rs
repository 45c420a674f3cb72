//! Two-phase enumeration.
//!
//! Every list the subsystem hands out is fetched the same way: ask for the
//! number of items with no buffer, then fetch into a buffer of exactly that
//! size. The subsystem gives no upper bound, so no fixed-size buffer is ever
//! assumed.

use crate::error::DiagError;
use crate::stats::CallStats;
use crate::status::{check, Status};
use crate::traits::SessionConfig;

/// Largest count accepted as a buffer size.
pub const MAX_ENUMERATED_HANDLES: u32 = 4096;

fn validate(what: &'static str, count: u32) -> Result<(), DiagError> {
    if count > MAX_ENUMERATED_HANDLES {
        return Err(DiagError::InvalidCount {
            what,
            count,
            limit: MAX_ENUMERATED_HANDLES,
        });
    }
    Ok(())
}

/// Enumerates handles through `call`.
///
/// `call` receives the in/out count and, for the fetch phase, the buffer.
/// Returns an empty vector when the subsystem reports nothing; callers decide
/// whether that is fatal. The fetch phase is skipped entirely in that case.
/// Failed calls are logged with the caller's location.
#[track_caller]
pub fn enumerate<H, F>(
    what: &'static str,
    call_name: &'static str,
    config: &SessionConfig,
    stats: &CallStats,
    mut call: F,
) -> Result<Vec<H>, DiagError>
where
    H: Clone + Default,
    F: FnMut(&mut u32, Option<&mut [H]>) -> Status,
{
    let mut count = 0u32;
    check(call(&mut count, None), call_name, config, stats)?;
    validate(what, count)?;
    if count == 0 {
        return Ok(Vec::new());
    }

    let mut handles = vec![H::default(); count as usize];
    check(call(&mut count, Some(handles.as_mut_slice())), call_name, config, stats)?;
    validate(what, count)?;
    // The fetch count is authoritative; it may only have shrunk.
    handles.truncate(count as usize);

    log::debug!("enumerated {} {}(s) via {}", handles.len(), what, call_name);
    Ok(handles)
}
