//! Dependency-free engine.
//!
//! Produces packets with correct TOC bytes, frame counts and bitrate-sized
//! payloads, and decodes any valid packet to silence of the right length.
//! It stands in for a real codec wherever only packet shape and session
//! state matter: tests, dry runs and the CLI simulator.

use tracing::trace;

use super::CodecEngine;
use crate::error::{CodecError, Result};
use crate::packet::{MAX_FRAME_BYTES, frame_layout, sample_count};
use crate::params::{Bitrate, ParameterStore};
use crate::session::Role;
use crate::toc::{Configuration, FrameCode, Toc};

/// Simulated encoder/decoder.
#[derive(Debug)]
pub struct SimEngine {
    role: Role,
    sample_rate: u32,
    channels: usize,
    frames: u64,
}

impl SimEngine {
    pub fn new(role: Role, params: &ParameterStore) -> Self {
        Self {
            role,
            sample_rate: params.sample_rate().hz(),
            channels: params.channels().count(),
            frames: 0,
        }
    }

    /// Frames processed since creation or the last reset.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn payload_bytes(&self, params: &ParameterStore, frame_us: u32) -> usize {
        let bits_per_second = match params.bitrate() {
            Bitrate::Max => return MAX_FRAME_BYTES,
            // Same rule libopus uses to resolve OPUS_AUTO.
            Bitrate::Auto => {
                let frame_rate = 1_000_000 / frame_us.max(1) as u64;
                60 * frame_rate + (self.sample_rate as u64) * self.channels as u64
            }
            Bitrate::Bits(bits) => bits as u64,
        };
        let bytes = bits_per_second * frame_us as u64 / 8_000_000;
        (bytes as usize).clamp(1, MAX_FRAME_BYTES)
    }
}

impl CodecEngine for SimEngine {
    fn configure(&mut self, _params: &ParameterStore) -> Result<()> {
        Ok(())
    }

    fn encode(
        &mut self,
        params: &ParameterStore,
        _pcm: &[i16],
        frame_size: usize,
        out: &mut [u8],
    ) -> Result<usize> {
        if self.role != Role::Encoder {
            return Err(CodecError::Unsupported {
                op: "encode",
                role: self.role,
            });
        }

        let (duration, count) = frame_layout(frame_size, self.sample_rate)?;
        let config = Configuration::select(
            params.application(),
            params.effective_bandwidth(),
            duration,
        );
        let stereo = self.channels == 2;

        let (header, code) = match count {
            1 => (1, FrameCode::One),
            _ => (2, FrameCode::Arbitrary),
        };
        // Every frame needs at least one byte.
        if out.len() < header + count {
            return Err(CodecError::BufferTooSmall {
                needed: header + count,
                actual: out.len(),
            });
        }
        // The rate is capped by what fits in `out`, as libopus does.
        let room = (out.len() - header) / count;
        let per_frame = self.payload_bytes(params, duration.micros()).min(room);
        let needed = header + per_frame * count;

        out[0] = Toc::build(config, stereo, code).0;
        if count > 1 {
            out[1] = count as u8;
        }
        out[header..needed].fill(0);

        self.frames += count as u64;
        trace!(config = config.0, count, bytes = needed, "sim: encoded");
        Ok(needed)
    }

    fn decode(
        &mut self,
        packet: Option<&[u8]>,
        frame_size: usize,
        pcm: &mut [i16],
    ) -> Result<usize> {
        if self.role != Role::Decoder {
            return Err(CodecError::Unsupported {
                op: "decode",
                role: self.role,
            });
        }

        let samples = match packet {
            Some(data) => sample_count(data, self.sample_rate)?,
            None => frame_size,
        };
        let len = samples * self.channels;
        if pcm.len() < len {
            return Err(CodecError::BufferTooSmall {
                needed: len,
                actual: pcm.len(),
            });
        }
        pcm[..len].fill(0);

        self.frames += 1;
        Ok(samples)
    }

    fn reset(&mut self) -> Result<()> {
        self.frames = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Packet;
    use crate::params::{Application, Channels, SampleRate};
    use crate::toc::{Bandwidth, ConfigurationMode};

    fn store(rate: SampleRate, application: Application) -> ParameterStore {
        ParameterStore::new(rate, Channels::Mono, application)
    }

    #[test]
    fn test_encode_toc() {
        let params = store(SampleRate::Hz48000, Application::Audio);
        let mut engine = SimEngine::new(Role::Encoder, &params);
        let mut buf = vec![0u8; 4000];
        let n = engine.encode(&params, &[0; 960], 960, &mut buf).unwrap();
        let packet = Packet::from_slice(&buf[..n]);
        assert_eq!(packet.mode(), ConfigurationMode::Celt);
        assert_eq!(packet.bandwidth(), Bandwidth::Fullband);
        assert_eq!(packet.samples(48000).unwrap(), 960);
        assert_eq!(engine.frames(), 1);
    }

    #[test]
    fn test_voip_mode_selection() {
        let params = store(SampleRate::Hz16000, Application::Voip);
        let mut engine = SimEngine::new(Role::Encoder, &params);
        let mut buf = vec![0u8; 4000];
        let n = engine.encode(&params, &[0; 320], 320, &mut buf).unwrap();
        let packet = Packet::from_slice(&buf[..n]);
        assert_eq!(packet.mode(), ConfigurationMode::Silk);
        assert_eq!(packet.bandwidth(), Bandwidth::Wideband);

        let params = store(SampleRate::Hz48000, Application::Voip);
        let mut engine = SimEngine::new(Role::Encoder, &params);
        let n = engine.encode(&params, &[0; 960], 960, &mut buf).unwrap();
        assert_eq!(Packet::from_slice(&buf[..n]).mode(), ConfigurationMode::Hybrid);
    }

    #[test]
    fn test_long_frames_use_code3() {
        let params = store(SampleRate::Hz48000, Application::Audio);
        let mut engine = SimEngine::new(Role::Encoder, &params);
        let mut buf = vec![0u8; 8000];
        let n = engine.encode(&params, &[0; 4800], 4800, &mut buf).unwrap();
        let packet = Packet::from_slice(&buf[..n]);
        assert_eq!(packet.toc().frame_code(), FrameCode::Arbitrary);
        assert_eq!(packet.samples(48000).unwrap(), 4800);
    }

    #[test]
    fn test_payload_follows_bitrate() {
        let mut params = store(SampleRate::Hz48000, Application::Audio);
        let mut engine = SimEngine::new(Role::Encoder, &params);
        let mut buf = vec![0u8; 4000];

        params.store_bitrate(Bitrate::Bits(64000));
        // 64 kbit/s * 20 ms = 160 bytes, plus the TOC byte.
        let n = engine.encode(&params, &[0; 960], 960, &mut buf).unwrap();
        assert_eq!(n, 161);

        params.store_bitrate(Bitrate::Max);
        let n = engine.encode(&params, &[0; 960], 960, &mut buf).unwrap();
        assert_eq!(n, MAX_FRAME_BYTES + 1);
    }

    #[test]
    fn test_encode_buffer_too_small() {
        let params = store(SampleRate::Hz48000, Application::Audio);
        let mut engine = SimEngine::new(Role::Encoder, &params);
        assert!(matches!(
            engine.encode(&params, &[0; 960], 960, &mut []),
            Err(CodecError::BufferTooSmall { needed: 2, actual: 0 })
        ));
        let mut buf = [0u8; 7];
        assert!(matches!(
            engine.encode(&params, &[0; 5760], 5760, &mut buf),
            Err(CodecError::BufferTooSmall { needed: 8, actual: 7 })
        ));
    }

    #[test]
    fn test_payload_capped_by_buffer() {
        let mut params = store(SampleRate::Hz48000, Application::Audio);
        let mut engine = SimEngine::new(Role::Encoder, &params);
        params.store_bitrate(Bitrate::Max);

        let mut buf = [0u8; 4];
        let n = engine.encode(&params, &[0; 960], 960, &mut buf).unwrap();
        assert_eq!(n, 4);

        let mut buf = vec![0u8; 4000];
        let n = engine.encode(&params, &[0; 5760], 5760, &mut buf).unwrap();
        // 6 frames of (4000 - 2) / 6 bytes behind TOC and count.
        assert_eq!(n, 2 + 666 * 6);
        assert_eq!(Packet::from_slice(&buf[..n]).samples(48000).unwrap(), 5760);
    }

    #[test]
    fn test_decode_and_reset() {
        let params = store(SampleRate::Hz48000, Application::Voip);
        let mut engine = SimEngine::new(Role::Decoder, &params);
        let mut pcm = vec![1i16; 5760];
        let n = engine.decode(Some(&[0xF8, 0, 0]), 5760, &mut pcm).unwrap();
        assert_eq!(n, 960);
        assert!(pcm[..960].iter().all(|&s| s == 0));

        let n = engine.decode(None, 480, &mut pcm).unwrap();
        assert_eq!(n, 480);
        assert_eq!(engine.frames(), 2);

        engine.reset().unwrap();
        assert_eq!(engine.frames(), 0);
    }

    #[test]
    fn test_role_mismatch() {
        let params = store(SampleRate::Hz48000, Application::Voip);
        let mut engine = SimEngine::new(Role::Decoder, &params);
        let mut buf = vec![0u8; 4000];
        assert!(engine.encode(&params, &[0; 960], 960, &mut buf).is_err());
    }
}
