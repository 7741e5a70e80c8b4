//! Panic guard for exported functions.
//!
//! A panic must never unwind across the C boundary; every exported function
//! runs its body through [`guard_status`].

use opusctl_codec::error::INTERNAL_ERROR;
use tracing::error;

/// Extracts a readable message from a panic payload.
pub fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        return (*msg).to_string();
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return msg.clone();
    }
    "non-string panic payload".to_string()
}

/// Runs `f`, turning a panic into an internal-error status.
pub fn guard_status(op: &'static str, f: impl FnOnce() -> i32) -> i32 {
    guard_with_default(op, INTERNAL_ERROR, f)
}

/// Runs `f`, returning `default` if it panics.
pub fn guard_with_default<T>(op: &'static str, default: T, f: impl FnOnce() -> T) -> T {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(payload) => {
            let msg = panic_message(payload);
            error!(op, %msg, "bridge: panic caught at ffi boundary");
            default
        }
    }
}
