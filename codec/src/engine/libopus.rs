//! Engine backed by the system libopus.

use std::ptr;

use tracing::debug;

use super::CodecEngine;
use super::ffi::{self, OpusDecoder, OpusEncoder};
use crate::error::{CodecError, Result};
use crate::params::ParameterStore;
use crate::protocol::Request;
use crate::session::Role;

enum Handle {
    Encoder(*mut OpusEncoder),
    Decoder(*mut OpusDecoder),
}

/// libopus encoder or decoder.
///
/// DTX is decided by the session, so the native encoder always runs with
/// its own DTX switched off.
pub struct LibopusEngine {
    handle: Handle,
}

// Safety: The handle is owned by exactly one engine and never shared.
unsafe impl Send for LibopusEngine {}

impl Drop for LibopusEngine {
    fn drop(&mut self) {
        match self.handle {
            Handle::Encoder(enc) if !enc.is_null() => unsafe { ffi::opus_encoder_destroy(enc) },
            Handle::Decoder(dec) if !dec.is_null() => unsafe { ffi::opus_decoder_destroy(dec) },
            _ => {}
        }
        self.handle = Handle::Encoder(ptr::null_mut());
    }
}

fn check(ret: i32, context: &str) -> Result<()> {
    if ret != ffi::OPUS_OK {
        debug!(ret, context, error = %ffi::error_string(ret), "libopus: call failed");
        return Err(CodecError::from_status(ret, context));
    }
    Ok(())
}

impl LibopusEngine {
    pub fn new(role: Role, params: &ParameterStore) -> Result<Self> {
        let fs = params.sample_rate().hz() as i32;
        let channels = params.channels().count() as i32;
        let mut error: i32 = 0;

        let handle = match role {
            Role::Encoder => {
                let enc = unsafe {
                    ffi::opus_encoder_create(fs, channels, params.application().into(), &mut error)
                };
                if enc.is_null() || error != ffi::OPUS_OK {
                    return Err(CodecError::from_status(error, "opus_encoder_create"));
                }
                Handle::Encoder(enc)
            }
            Role::Decoder => {
                let dec = unsafe { ffi::opus_decoder_create(fs, channels, &mut error) };
                if dec.is_null() || error != ffi::OPUS_OK {
                    return Err(CodecError::from_status(error, "opus_decoder_create"));
                }
                Handle::Decoder(dec)
            }
        };

        Ok(Self { handle })
    }

    fn encoder_set(&mut self, request: Request, value: i32) -> Result<()> {
        if let Handle::Encoder(enc) = self.handle {
            let ret = unsafe { ffi::opus_encoder_ctl(enc, request.code(), value) };
            check(ret, request.name())?;
        }
        Ok(())
    }
}

impl CodecEngine for LibopusEngine {
    fn configure(&mut self, params: &ParameterStore) -> Result<()> {
        self.encoder_set(Request::SetBitrate, params.bitrate().into())?;
        self.encoder_set(Request::SetComplexity, params.complexity())?;
        self.encoder_set(Request::SetMaxBandwidth, params.max_bandwidth().into())?;
        self.encoder_set(Request::SetInbandFec, params.inband_fec() as i32)?;
        self.encoder_set(Request::SetPacketLossPerc, params.packet_loss_perc())?;
        self.encoder_set(Request::SetDtx, 0)
    }

    fn encode(
        &mut self,
        _params: &ParameterStore,
        pcm: &[i16],
        frame_size: usize,
        out: &mut [u8],
    ) -> Result<usize> {
        let Handle::Encoder(enc) = self.handle else {
            return Err(CodecError::Unsupported {
                op: "encode",
                role: Role::Decoder,
            });
        };

        let n = unsafe {
            ffi::opus_encode(
                enc,
                pcm.as_ptr(),
                frame_size as i32,
                out.as_mut_ptr(),
                out.len() as i32,
            )
        };
        if n < 0 {
            return Err(CodecError::from_status(n, "opus_encode"));
        }
        Ok(n as usize)
    }

    fn decode(
        &mut self,
        packet: Option<&[u8]>,
        frame_size: usize,
        pcm: &mut [i16],
    ) -> Result<usize> {
        let Handle::Decoder(dec) = self.handle else {
            return Err(CodecError::Unsupported {
                op: "decode",
                role: Role::Encoder,
            });
        };

        let (data_ptr, data_len) = match packet {
            Some(data) if !data.is_empty() => (data.as_ptr(), data.len() as i32),
            _ => (ptr::null(), 0),
        };

        let n = unsafe {
            ffi::opus_decode(
                dec,
                data_ptr,
                data_len,
                pcm.as_mut_ptr(),
                frame_size as i32,
                0,
            )
        };
        if n < 0 {
            return Err(CodecError::from_status(n, "opus_decode"));
        }
        Ok(n as usize)
    }

    fn reset(&mut self) -> Result<()> {
        let code = Request::ResetState.code();
        let ret = match self.handle {
            Handle::Encoder(enc) => unsafe { ffi::opus_encoder_ctl(enc, code) },
            Handle::Decoder(dec) => unsafe { ffi::opus_decoder_ctl(dec, code) },
        };
        check(ret, "reset_state")
    }
}
