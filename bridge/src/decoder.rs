//! Decoder exports.

use std::slice;

use opusctl_codec::error::{BAD_ARG, NULL_OUTPUT};
use opusctl_codec::{Ctl, Role};

use crate::guard::guard_status;
use crate::{config, create, destroy, get, report, set, with_session};

/// Creates a decoder. Returns its handle, or 0 with the status written to
/// `error` when non-null.
///
/// # Safety
/// `error` must be null or valid for one `i32` write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bridge_decoder_create(sample_rate: i32, channels: i32, error: *mut i32) -> u64 {
    let config = config(sample_rate, channels, None);
    unsafe { create("bridge_decoder_create", Role::Decoder, config, error) }
}

/// Destroys a decoder. The handle is invalid afterwards.
#[unsafe(no_mangle)]
pub extern "C" fn bridge_decoder_destroy(handle: u64) -> i32 {
    destroy("bridge_decoder_destroy", handle, Role::Decoder)
}

/// Clears decoding history and the last packet duration.
#[unsafe(no_mangle)]
pub extern "C" fn bridge_decoder_reset_state(handle: u64) -> i32 {
    set("bridge_decoder_reset_state", handle, Role::Decoder, Ctl::ResetState)
}

/// # Safety
/// `sample_rate` must be null or valid for one `i32` write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bridge_decoder_get_sample_rate(handle: u64, sample_rate: *mut i32) -> i32 {
    unsafe {
        get(
            "bridge_decoder_get_sample_rate",
            handle,
            Role::Decoder,
            Ctl::GetSampleRate,
            sample_rate,
        )
    }
}

/// Writes the samples per channel of the last decoded packet, or 0 before
/// the first one.
///
/// # Safety
/// `samples` must be null or valid for one `i32` write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bridge_decoder_get_last_packet_duration(
    handle: u64,
    samples: *mut i32,
) -> i32 {
    unsafe {
        get(
            "bridge_decoder_get_last_packet_duration",
            handle,
            Role::Decoder,
            Ctl::GetLastPacketDuration,
            samples,
        )
    }
}

/// Decodes `len` bytes from `data` into interleaved `pcm`, which holds up to
/// `frame_size` samples per channel. A null `data` or zero `len` conceals
/// one lost packet of `frame_size` samples. Returns samples per channel, or
/// a negative status.
///
/// # Safety
/// `data` must be null or valid for `len` reads, and `pcm` valid for
/// `frame_size * channels` writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bridge_decoder_decode(
    handle: u64,
    data: *const u8,
    len: i32,
    pcm: *mut i16,
    frame_size: i32,
) -> i32 {
    const OP: &str = "bridge_decoder_decode";
    guard_status(OP, || {
        if pcm.is_null() {
            return NULL_OUTPUT;
        }
        let (Ok(len), Ok(frame_size)) = (usize::try_from(len), usize::try_from(frame_size)) else {
            return BAD_ARG;
        };

        let result = with_session(handle, Role::Decoder, OP, |session| {
            let channels = session.config().channels.count();
            let out = unsafe { slice::from_raw_parts_mut(pcm, frame_size * channels) };
            if data.is_null() || len == 0 {
                return session.decode_lost(frame_size, out);
            }
            let packet = unsafe { slice::from_raw_parts(data, len) };
            session.decode(packet, out)
        });
        match report(OP, result) {
            Ok(n) => n as i32,
            Err(e) => e.status(),
        }
    })
}
