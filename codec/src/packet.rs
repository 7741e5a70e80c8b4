//! Opus packet type and packet inspection.

use std::time::Duration;

use crate::error::{CodecError, Result};
use crate::toc::{Bandwidth, Configuration, ConfigurationMode, FrameCode, FrameDuration, Toc};

/// Longest audio a single packet may carry.
pub const MAX_PACKET_DURATION: Duration = Duration::from_millis(120);

/// Largest payload a single frame may occupy.
pub const MAX_FRAME_BYTES: usize = 1275;

/// Splits an encoder frame of `frame_size` samples into Opus frames.
///
/// Durations from 2.5 to 60 ms map onto one frame; 80, 100 and 120 ms are
/// carried as several 20 ms frames. Anything else is rejected.
pub fn frame_layout(frame_size: usize, sample_rate: u32) -> Result<(FrameDuration, usize)> {
    if let Some(fd) = FrameDuration::from_samples(frame_size, sample_rate) {
        return Ok((fd, 1));
    }

    let twenty = FrameDuration::Duration20ms.samples(sample_rate);
    let max = twenty * 6;
    if twenty == 0 || frame_size == 0 || frame_size % twenty != 0 || frame_size > max {
        return Err(CodecError::invalid_argument(format!(
            "frame size {} is not a valid Opus frame at {} Hz",
            frame_size, sample_rate
        )));
    }
    Ok((FrameDuration::Duration20ms, frame_size / twenty))
}

/// Returns the number of frames in `data`.
///
/// Fails on an empty packet or a code 3 packet without (or with a zero)
/// frame count byte.
pub fn frame_count(data: &[u8]) -> Result<usize> {
    let Some(&first) = data.first() else {
        return Err(CodecError::invalid_packet("empty packet"));
    };

    match Toc::new(first).frame_code() {
        FrameCode::One => Ok(1),
        FrameCode::TwoEqual | FrameCode::TwoDifferent => Ok(2),
        FrameCode::Arbitrary => {
            let Some(&count_byte) = data.get(1) else {
                return Err(CodecError::invalid_packet("code 3 packet without frame count"));
            };
            let count = (count_byte & 0b0011_1111) as usize;
            if count == 0 {
                return Err(CodecError::invalid_packet("code 3 packet with zero frames"));
            }
            Ok(count)
        }
    }
}

/// Returns the number of samples per channel `data` decodes to at
/// `sample_rate`.
///
/// Packets longer than 120 ms are rejected.
pub fn sample_count(data: &[u8], sample_rate: u32) -> Result<usize> {
    let frames = frame_count(data)?;
    let per_frame = Toc::new(data[0])
        .configuration()
        .frame_duration()
        .samples(sample_rate);
    let samples = frames * per_frame;

    // samples * 25 > rate * 3 is the 120 ms bound without rounding.
    if samples as u64 * 25 > sample_rate as u64 * 3 {
        return Err(CodecError::invalid_packet(format!(
            "{} frames of {} samples exceed {}ms",
            frames,
            per_frame,
            MAX_PACKET_DURATION.as_millis()
        )));
    }

    Ok(samples)
}

/// Raw Opus packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet(pub Vec<u8>);

impl Packet {
    /// Creates a new packet from bytes.
    pub fn new(data: Vec<u8>) -> Self {
        Self(data)
    }

    /// Creates a packet from a byte slice.
    pub fn from_slice(data: &[u8]) -> Self {
        Self(data.to_vec())
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the packet is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true for a packet without payload, the shape emitted while
    /// the encoder is in DTX.
    pub fn is_dtx(&self) -> bool {
        match self.0.len() {
            1 => true,
            2 => self.toc().frame_code() == FrameCode::Arbitrary,
            _ => false,
        }
    }

    /// Returns the TOC byte of this packet.
    pub fn toc(&self) -> Toc {
        Toc::new(self.0.first().copied().unwrap_or(0))
    }

    /// Returns the configuration of this packet.
    pub fn configuration(&self) -> Configuration {
        self.toc().configuration()
    }

    /// Returns the mode (SILK, CELT, or Hybrid) of this packet.
    pub fn mode(&self) -> ConfigurationMode {
        self.configuration().mode()
    }

    /// Returns the bandwidth of this packet.
    pub fn bandwidth(&self) -> Bandwidth {
        self.configuration().bandwidth()
    }

    /// Returns the duration of each frame in this packet.
    pub fn frame_duration(&self) -> FrameDuration {
        self.configuration().frame_duration()
    }

    /// Returns the total duration of audio in this packet.
    pub fn duration(&self) -> Result<Duration> {
        let frames = frame_count(&self.0)?;
        Ok(self.frame_duration().duration() * frames as u32)
    }

    /// Returns the number of samples per channel at `sample_rate`.
    pub fn samples(&self, sample_rate: u32) -> Result<usize> {
        sample_count(&self.0, sample_rate)
    }
}

impl AsRef<[u8]> for Packet {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Packet {
    fn from(data: Vec<u8>) -> Self {
        Self(data)
    }
}

impl From<&[u8]> for Packet {
    fn from(data: &[u8]) -> Self {
        Self(data.to_vec())
    }
}
