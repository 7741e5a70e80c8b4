use std::ffi::CStr;
use std::ptr;

use opusctl_bridge::*;
use opusctl_codec::error::{
    BAD_ARG, BUFFER_TOO_SMALL, INVALID_PACKET, INVALID_STATE, NULL_OUTPUT, OK, UNIMPLEMENTED,
};
use opusctl_codec::params::{APPLICATION_AUDIO, APPLICATION_VOIP, AUTO, BITRATE_MAX};
use opusctl_codec::toc::{BANDWIDTH_FULLBAND, BANDWIDTH_WIDEBAND};

fn encoder(sample_rate: i32) -> u64 {
    let mut error = -100;
    let handle = unsafe { bridge_encoder_create(sample_rate, 1, APPLICATION_VOIP, &mut error) };
    assert_eq!(error, OK);
    assert_ne!(handle, 0);
    handle
}

fn decoder(sample_rate: i32) -> u64 {
    let mut error = -100;
    let handle = unsafe { bridge_decoder_create(sample_rate, 1, &mut error) };
    assert_eq!(error, OK);
    assert_ne!(handle, 0);
    handle
}

fn read(f: unsafe extern "C" fn(u64, *mut i32) -> i32, handle: u64) -> i32 {
    let mut value = -12345;
    assert_eq!(unsafe { f(handle, &mut value) }, OK);
    value
}

#[test]
fn test_create_rejects_bad_config() {
    let mut error = 0;
    let handle = unsafe { bridge_encoder_create(44100, 1, APPLICATION_AUDIO, &mut error) };
    assert_eq!(handle, 0);
    assert_eq!(error, BAD_ARG);

    let handle = unsafe { bridge_decoder_create(48000, 0, &mut error) };
    assert_eq!(handle, 0);
    assert_eq!(error, BAD_ARG);

    // A null error slot is allowed.
    let handle = unsafe { bridge_encoder_create(48000, 1, 1, ptr::null_mut()) };
    assert_eq!(handle, 0);
}

#[test]
fn test_encoder_ctl_round_trips() {
    let enc = encoder(48000);

    assert_eq!(read(bridge_encoder_get_bitrate, enc), AUTO);
    assert_eq!(bridge_encoder_set_bitrate(enc, 64000), OK);
    assert_eq!(read(bridge_encoder_get_bitrate, enc), 64000);

    assert_eq!(read(bridge_encoder_get_complexity, enc), 9);
    assert_eq!(bridge_encoder_set_complexity(enc, 4), OK);
    assert_eq!(bridge_encoder_set_complexity(enc, 11), BAD_ARG);
    assert_eq!(read(bridge_encoder_get_complexity, enc), 4);

    assert_eq!(read(bridge_encoder_get_max_bandwidth, enc), BANDWIDTH_FULLBAND);
    assert_eq!(bridge_encoder_set_max_bandwidth(enc, BANDWIDTH_WIDEBAND), OK);
    assert_eq!(bridge_encoder_set_max_bandwidth(enc, 1000), BAD_ARG);
    assert_eq!(read(bridge_encoder_get_max_bandwidth, enc), BANDWIDTH_WIDEBAND);

    assert_eq!(bridge_encoder_set_inband_fec(enc, 1), OK);
    assert_eq!(bridge_encoder_set_inband_fec(enc, 3), BAD_ARG);
    assert_eq!(read(bridge_encoder_get_inband_fec, enc), 1);

    assert_eq!(bridge_encoder_set_packet_loss_perc(enc, 25), OK);
    assert_eq!(bridge_encoder_set_packet_loss_perc(enc, 101), BAD_ARG);
    assert_eq!(read(bridge_encoder_get_packet_loss_perc, enc), 25);

    assert_eq!(bridge_encoder_set_dtx(enc, 1), OK);
    assert_eq!(read(bridge_encoder_get_dtx, enc), 1);
    assert_eq!(read(bridge_encoder_get_in_dtx, enc), 0);

    assert_eq!(bridge_encoder_reset_state(enc), OK);
    assert_eq!(read(bridge_encoder_get_bitrate, enc), AUTO);
    assert_eq!(read(bridge_encoder_get_dtx, enc), 0);
    assert_eq!(read(bridge_encoder_get_sample_rate, enc), 48000);

    assert_eq!(bridge_encoder_destroy(enc), OK);
}

#[test]
fn test_null_output_pointer() {
    let enc = encoder(16000);
    let dec = decoder(16000);
    unsafe {
        assert_eq!(bridge_encoder_get_dtx(enc, ptr::null_mut()), NULL_OUTPUT);
        assert_eq!(bridge_encoder_get_bitrate(enc, ptr::null_mut()), NULL_OUTPUT);
        assert_eq!(
            bridge_decoder_get_last_packet_duration(dec, ptr::null_mut()),
            NULL_OUTPUT
        );
        assert_eq!(bridge_ctl(enc, 4017, 0, ptr::null_mut()), NULL_OUTPUT);
        // Setters never touch the output slot.
        assert_eq!(bridge_ctl(enc, 4016, 1, ptr::null_mut()), OK);
    }
    assert_eq!(read(bridge_encoder_get_dtx, enc), 1);
    bridge_encoder_destroy(enc);
    bridge_decoder_destroy(dec);
}

#[test]
fn test_destroyed_and_stale_handles() {
    let enc = encoder(48000);
    assert_eq!(bridge_encoder_destroy(enc), OK);
    assert_eq!(bridge_encoder_destroy(enc), INVALID_STATE);
    assert_eq!(bridge_encoder_set_bitrate(enc, 64000), INVALID_STATE);
    let mut value = 0;
    assert_eq!(
        unsafe { bridge_encoder_get_sample_rate(enc, &mut value) },
        INVALID_STATE
    );

    assert_eq!(bridge_encoder_set_dtx(0, 1), INVALID_STATE);
    assert_eq!(bridge_decoder_reset_state(u64::MAX), INVALID_STATE);
}

#[test]
fn test_role_mismatch() {
    let enc = encoder(48000);
    let dec = decoder(48000);

    assert_eq!(bridge_encoder_set_dtx(dec, 1), UNIMPLEMENTED);
    assert_eq!(bridge_decoder_reset_state(enc), UNIMPLEMENTED);
    let mut value = 0;
    assert_eq!(
        unsafe { bridge_decoder_get_last_packet_duration(enc, &mut value) },
        UNIMPLEMENTED
    );
    assert_eq!(unsafe { bridge_ctl(dec, 4002, 64000, ptr::null_mut()) }, UNIMPLEMENTED);

    // Destroy checks the role too, and leaves the session alive.
    assert_eq!(bridge_decoder_destroy(enc), UNIMPLEMENTED);
    assert_eq!(bridge_encoder_destroy(enc), OK);
    assert_eq!(bridge_decoder_destroy(dec), OK);
}

#[test]
fn test_raw_ctl() {
    let dec = decoder(24000);
    let mut value = 0;
    unsafe {
        assert_eq!(bridge_ctl(dec, 4029, 0, &mut value), OK);
        assert_eq!(value, 24000);
        assert_eq!(bridge_ctl(dec, 4039, 0, &mut value), OK);
        assert_eq!(value, 0);
        assert_eq!(bridge_ctl(dec, 4028, 0, ptr::null_mut()), OK);
        assert_eq!(bridge_ctl(dec, 9999, 0, &mut value), UNIMPLEMENTED);
    }
    bridge_decoder_destroy(dec);
}

#[test]
fn test_encode_decode_tracks_duration() {
    let enc = encoder(48000);
    let dec = decoder(48000);

    let pcm = vec![0i16; 1920];
    let mut packet = vec![0u8; 4000];
    let n = unsafe { bridge_encoder_encode(enc, pcm.as_ptr(), 1920, packet.as_mut_ptr(), 4000) };
    assert!(n > 0);

    let mut out = vec![0i16; 5760];
    let samples = unsafe {
        bridge_decoder_decode(dec, packet.as_ptr(), n, out.as_mut_ptr(), 5760)
    };
    assert_eq!(samples, 1920);
    assert_eq!(read(bridge_decoder_get_last_packet_duration, dec), 1920);

    // Lost packet.
    let samples = unsafe { bridge_decoder_decode(dec, ptr::null(), 0, out.as_mut_ptr(), 480) };
    assert_eq!(samples, 480);
    assert_eq!(read(bridge_decoder_get_last_packet_duration, dec), 480);

    // Corrupt packet leaves the duration alone.
    let bad = [0xFBu8];
    let status = unsafe { bridge_decoder_decode(dec, bad.as_ptr(), 1, out.as_mut_ptr(), 5760) };
    assert_eq!(status, INVALID_PACKET);
    assert_eq!(read(bridge_decoder_get_last_packet_duration, dec), 480);

    // Output too short for the packet.
    let status = unsafe { bridge_decoder_decode(dec, packet.as_ptr(), n, out.as_mut_ptr(), 960) };
    assert_eq!(status, BUFFER_TOO_SMALL);

    assert_eq!(read(bridge_decoder_get_sample_rate, dec), 48000);
    bridge_encoder_destroy(enc);
    bridge_decoder_destroy(dec);
}

#[test]
fn test_encode_frame_sizes() {
    let enc = encoder(48000);
    let pcm = vec![1000i16; 5760];
    let mut packet = vec![0u8; 4000];

    let n = unsafe { bridge_encoder_encode(enc, pcm.as_ptr(), 0, packet.as_mut_ptr(), 4000) };
    assert_eq!(n, BAD_ARG);

    assert_eq!(bridge_encoder_set_bitrate(enc, BITRATE_MAX), OK);
    for frame_size in [3840, 5760] {
        let n = unsafe {
            bridge_encoder_encode(enc, pcm.as_ptr(), frame_size, packet.as_mut_ptr(), 4000)
        };
        assert!(n > 0 && n <= 4000, "frame {} gave {}", frame_size, n);
    }
    bridge_encoder_destroy(enc);
}

#[test]
fn test_strerror() {
    let msg = unsafe { CStr::from_ptr(bridge_strerror(NULL_OUTPUT)) };
    assert_eq!(msg.to_str().unwrap(), "null output pointer");
    let msg = unsafe { CStr::from_ptr(bridge_strerror(-99)) };
    assert_eq!(msg.to_str().unwrap(), "unknown error");
}
