//! Stable exit codes for dincon commands.

use dincon_core::DinconError;

/// Command succeeded, including "nothing to do" outcomes.
pub const OK: i32 = 0;
/// Unexpected failure: network, IO, missing API key, git could not be spawned.
pub const ERROR: i32 = 1;
/// The command reported a failure: already exists, not found, invalid range,
/// not a repository, decode error, git exited non-zero.
pub const FAILED: i32 = 2;
/// The user declined a confirmation.
pub const ABORTED: i32 = 3;

pub fn for_error(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<DinconError>() {
        Some(DinconError::Aborted) => ABORTED,
        Some(e) if e.is_user_facing() => FAILED,
        _ => ERROR,
    }
}
