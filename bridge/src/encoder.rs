//! Encoder exports.

use std::slice;

use opusctl_codec::error::{BAD_ARG, NULL_OUTPUT};
use opusctl_codec::{Ctl, Role};

use crate::guard::guard_status;
use crate::{config, create, destroy, get, report, set, with_session};

/// Creates an encoder. Returns its handle, or 0 with the status written to
/// `error` when non-null.
///
/// # Safety
/// `error` must be null or valid for one `i32` write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bridge_encoder_create(
    sample_rate: i32,
    channels: i32,
    application: i32,
    error: *mut i32,
) -> u64 {
    let config = config(sample_rate, channels, Some(application));
    unsafe { create("bridge_encoder_create", Role::Encoder, config, error) }
}

/// Destroys an encoder. The handle is invalid afterwards.
#[unsafe(no_mangle)]
pub extern "C" fn bridge_encoder_destroy(handle: u64) -> i32 {
    destroy("bridge_encoder_destroy", handle, Role::Encoder)
}

#[unsafe(no_mangle)]
pub extern "C" fn bridge_encoder_set_dtx(handle: u64, use_dtx: i32) -> i32 {
    set("bridge_encoder_set_dtx", handle, Role::Encoder, Ctl::SetDtx(use_dtx))
}

/// # Safety
/// `dtx` must be null or valid for one `i32` write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bridge_encoder_get_dtx(handle: u64, dtx: *mut i32) -> i32 {
    unsafe { get("bridge_encoder_get_dtx", handle, Role::Encoder, Ctl::GetDtx, dtx) }
}

/// Writes 1 if the last encoded frame was suppressed by DTX.
///
/// # Safety
/// `in_dtx` must be null or valid for one `i32` write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bridge_encoder_get_in_dtx(handle: u64, in_dtx: *mut i32) -> i32 {
    unsafe { get("bridge_encoder_get_in_dtx", handle, Role::Encoder, Ctl::GetInDtx, in_dtx) }
}

/// # Safety
/// `sample_rate` must be null or valid for one `i32` write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bridge_encoder_get_sample_rate(handle: u64, sample_rate: *mut i32) -> i32 {
    unsafe {
        get(
            "bridge_encoder_get_sample_rate",
            handle,
            Role::Encoder,
            Ctl::GetSampleRate,
            sample_rate,
        )
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn bridge_encoder_set_bitrate(handle: u64, bitrate: i32) -> i32 {
    set("bridge_encoder_set_bitrate", handle, Role::Encoder, Ctl::SetBitrate(bitrate))
}

/// # Safety
/// `bitrate` must be null or valid for one `i32` write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bridge_encoder_get_bitrate(handle: u64, bitrate: *mut i32) -> i32 {
    unsafe { get("bridge_encoder_get_bitrate", handle, Role::Encoder, Ctl::GetBitrate, bitrate) }
}

#[unsafe(no_mangle)]
pub extern "C" fn bridge_encoder_set_complexity(handle: u64, complexity: i32) -> i32 {
    set(
        "bridge_encoder_set_complexity",
        handle,
        Role::Encoder,
        Ctl::SetComplexity(complexity),
    )
}

/// # Safety
/// `complexity` must be null or valid for one `i32` write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bridge_encoder_get_complexity(handle: u64, complexity: *mut i32) -> i32 {
    unsafe {
        get(
            "bridge_encoder_get_complexity",
            handle,
            Role::Encoder,
            Ctl::GetComplexity,
            complexity,
        )
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn bridge_encoder_set_max_bandwidth(handle: u64, max_bw: i32) -> i32 {
    set(
        "bridge_encoder_set_max_bandwidth",
        handle,
        Role::Encoder,
        Ctl::SetMaxBandwidth(max_bw),
    )
}

/// # Safety
/// `max_bw` must be null or valid for one `i32` write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bridge_encoder_get_max_bandwidth(handle: u64, max_bw: *mut i32) -> i32 {
    unsafe {
        get(
            "bridge_encoder_get_max_bandwidth",
            handle,
            Role::Encoder,
            Ctl::GetMaxBandwidth,
            max_bw,
        )
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn bridge_encoder_set_inband_fec(handle: u64, fec: i32) -> i32 {
    set("bridge_encoder_set_inband_fec", handle, Role::Encoder, Ctl::SetInbandFec(fec))
}

/// # Safety
/// `fec` must be null or valid for one `i32` write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bridge_encoder_get_inband_fec(handle: u64, fec: *mut i32) -> i32 {
    unsafe { get("bridge_encoder_get_inband_fec", handle, Role::Encoder, Ctl::GetInbandFec, fec) }
}

#[unsafe(no_mangle)]
pub extern "C" fn bridge_encoder_set_packet_loss_perc(handle: u64, loss_perc: i32) -> i32 {
    set(
        "bridge_encoder_set_packet_loss_perc",
        handle,
        Role::Encoder,
        Ctl::SetPacketLossPerc(loss_perc),
    )
}

/// # Safety
/// `loss_perc` must be null or valid for one `i32` write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bridge_encoder_get_packet_loss_perc(
    handle: u64,
    loss_perc: *mut i32,
) -> i32 {
    unsafe {
        get(
            "bridge_encoder_get_packet_loss_perc",
            handle,
            Role::Encoder,
            Ctl::GetPacketLossPerc,
            loss_perc,
        )
    }
}

/// Restores default parameters and clears coding history.
#[unsafe(no_mangle)]
pub extern "C" fn bridge_encoder_reset_state(handle: u64) -> i32 {
    set("bridge_encoder_reset_state", handle, Role::Encoder, Ctl::ResetState)
}

/// Encodes `frame_size` samples per channel of interleaved PCM into `data`.
/// Returns the packet length, or a negative status.
///
/// # Safety
/// `pcm` must be valid for `frame_size * channels` reads and `data` for
/// `max_data_bytes` writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bridge_encoder_encode(
    handle: u64,
    pcm: *const i16,
    frame_size: i32,
    data: *mut u8,
    max_data_bytes: i32,
) -> i32 {
    const OP: &str = "bridge_encoder_encode";
    guard_status(OP, || {
        if pcm.is_null() || data.is_null() {
            return NULL_OUTPUT;
        }
        let (Ok(frame_size), Ok(max_data_bytes)) =
            (usize::try_from(frame_size), usize::try_from(max_data_bytes))
        else {
            return BAD_ARG;
        };

        let result = with_session(handle, Role::Encoder, OP, |session| {
            let channels = session.config().channels.count();
            let pcm = unsafe { slice::from_raw_parts(pcm, frame_size * channels) };
            let out = unsafe { slice::from_raw_parts_mut(data, max_data_bytes) };
            session.encode_to(pcm, frame_size, out)
        });
        match report(OP, result) {
            Ok(n) => n as i32,
            Err(e) => e.status(),
        }
    })
}
