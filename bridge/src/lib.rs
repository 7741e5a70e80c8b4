//! C ABI over opusctl sessions.
//!
//! Sessions live in a process-wide registry and are addressed by `u64`
//! handles; 0 is never a valid handle. Every function returns a
//! libopus-compatible status (0 on success, negative on failure) unless
//! documented otherwise, and getters reject a null output pointer with
//! `NULL_OUTPUT` (-8).
//!
//! Functions taking raw pointers are `unsafe`: the caller guarantees the
//! pointers are either null or valid for the documented length.

use std::ffi::{CStr, c_char};

use once_cell::sync::Lazy;
use opusctl_codec::error::{
    BAD_ARG, BUFFER_TOO_SMALL, INTERNAL_ERROR, INVALID_PACKET, INVALID_STATE, NULL_OUTPUT, OK,
    UNIMPLEMENTED,
};
use opusctl_codec::{
    Application, Channels, CodecError, Ctl, HandleId, Result, Role, SampleRate, Session,
    SessionConfig, SessionRegistry, dispatch,
};
use parking_lot::Mutex;
use tracing::{debug, warn};

mod decoder;
mod encoder;
pub mod guard;

pub use decoder::*;
pub use encoder::*;

use guard::{guard_status, guard_with_default};

static REGISTRY: Lazy<Mutex<SessionRegistry>> = Lazy::new(|| Mutex::new(SessionRegistry::new()));

fn report<T>(op: &'static str, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        warn!(op, status = e.status(), error = %e, "bridge: rejected");
    }
    result
}

fn config(sample_rate: i32, channels: i32, application: Option<i32>) -> Result<SessionConfig> {
    let sample_rate = u32::try_from(sample_rate)
        .map_err(|_| CodecError::InvalidArgument(format!("sample rate {}", sample_rate)))
        .and_then(SampleRate::try_from)?;
    let channels = u8::try_from(channels)
        .map_err(|_| CodecError::InvalidArgument(format!("channel count {}", channels)))
        .and_then(Channels::try_from)?;
    let application = match application {
        Some(raw) => Application::try_from(raw)?,
        None => Application::default(),
    };
    Ok(SessionConfig::new(sample_rate, channels, application))
}

/// Creates a session and registers it. Returns 0 and writes the status to
/// `error` (when non-null) on failure.
unsafe fn create(op: &'static str, role: Role, config: Result<SessionConfig>, error: *mut i32) -> u64 {
    guard_with_default(op, 0, || {
        let result = config
            .and_then(|config| Session::new(role, config))
            .map(|session| REGISTRY.lock().insert(session));
        let (handle, status) = match report(op, result) {
            Ok(id) => {
                debug!(%id, %role, "bridge: created");
                (id.raw(), OK)
            }
            Err(e) => (0, e.status()),
        };
        if !error.is_null() {
            unsafe { error.write(status) };
        }
        handle
    })
}

fn destroy(op: &'static str, handle: u64, role: Role) -> i32 {
    guard_status(op, || {
        let result = close_session(&mut REGISTRY.lock(), handle, role, op);
        match report(op, result) {
            Ok(()) => OK,
            Err(e) => e.status(),
        }
    })
}

fn close_session(
    registry: &mut SessionRegistry,
    handle: u64,
    role: Role,
    op: &'static str,
) -> Result<()> {
    let id = HandleId::from_raw(handle);
    check_role(registry.get(id)?, role, op)?;
    registry.close(id)?;
    debug!(%id, %role, "bridge: destroyed");
    Ok(())
}

fn check_role(session: &Session, role: Role, op: &'static str) -> Result<()> {
    if session.role() != role {
        return Err(CodecError::Unsupported {
            op,
            role: session.role(),
        });
    }
    Ok(())
}

/// Runs `f` against the live session behind `handle` while holding the
/// registry lock.
fn with_session<T>(
    handle: u64,
    role: Role,
    op: &'static str,
    f: impl FnOnce(&mut Session) -> Result<T>,
) -> Result<T> {
    let mut registry = REGISTRY.lock();
    let session = registry.get_mut(HandleId::from_raw(handle))?;
    check_role(session, role, op)?;
    f(session)
}

fn set(op: &'static str, handle: u64, role: Role, ctl: Ctl) -> i32 {
    guard_status(op, || {
        match report(op, with_session(handle, role, op, |s| dispatch(s, ctl))) {
            Ok(_) => OK,
            Err(e) => e.status(),
        }
    })
}

/// # Safety
/// `out` must be null or valid for one `i32` write.
unsafe fn get(op: &'static str, handle: u64, role: Role, ctl: Ctl, out: *mut i32) -> i32 {
    guard_status(op, || {
        if out.is_null() {
            warn!(op, status = NULL_OUTPUT, "bridge: rejected null output");
            return NULL_OUTPUT;
        }
        match report(op, with_session(handle, role, op, |s| dispatch(s, ctl))) {
            Ok(reply) => {
                unsafe { out.write(reply.value().unwrap_or(0)) };
                OK
            }
            Err(e) => e.status(),
        }
    })
}

/// Issues a raw ctl request against any session.
///
/// Getters write their value to `out`; setters and reset ignore it and
/// accept null. Unknown request codes return `UNIMPLEMENTED`.
///
/// # Safety
/// `out` must be null or valid for one `i32` write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bridge_ctl(handle: u64, request: i32, value: i32, out: *mut i32) -> i32 {
    guard_status("bridge_ctl", || {
        let ctl = match report("bridge_ctl", Ctl::from_raw(request, value)) {
            Ok(ctl) => ctl,
            Err(e) => return e.status(),
        };
        let role = {
            let registry = REGISTRY.lock();
            match report("bridge_ctl", registry.get(HandleId::from_raw(handle))) {
                Ok(session) => session.role(),
                Err(e) => return e.status(),
            }
        };
        if ctl.arg().is_some() || ctl.request().arity() == 0 {
            set("bridge_ctl", handle, role, ctl)
        } else {
            unsafe { get("bridge_ctl", handle, role, ctl, out) }
        }
    })
}

/// Returns a static, NUL-terminated description of a status code.
#[unsafe(no_mangle)]
pub extern "C" fn bridge_strerror(status: i32) -> *const c_char {
    strerror(status).as_ptr()
}

fn strerror(status: i32) -> &'static CStr {
    match status {
        OK => c"success",
        BAD_ARG => c"invalid argument",
        BUFFER_TOO_SMALL => c"buffer too small",
        INTERNAL_ERROR => c"internal error",
        INVALID_PACKET => c"corrupted stream",
        UNIMPLEMENTED => c"request not implemented",
        INVALID_STATE => c"invalid state",
        NULL_OUTPUT => c"null output pointer",
        _ => c"unknown error",
    }
}
