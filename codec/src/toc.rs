//! Opus TOC (Table of Contents) byte.
//!
//! Implements RFC 6716 Section 3.1, in both directions: reading the TOC of a
//! received packet and building one for packets this crate emits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::params::Application;

/// `OPUS_BANDWIDTH_NARROWBAND`.
pub const BANDWIDTH_NARROWBAND: i32 = 1101;
/// `OPUS_BANDWIDTH_MEDIUMBAND`.
pub const BANDWIDTH_MEDIUMBAND: i32 = 1102;
/// `OPUS_BANDWIDTH_WIDEBAND`.
pub const BANDWIDTH_WIDEBAND: i32 = 1103;
/// `OPUS_BANDWIDTH_SUPERWIDEBAND`.
pub const BANDWIDTH_SUPERWIDEBAND: i32 = 1104;
/// `OPUS_BANDWIDTH_FULLBAND`.
pub const BANDWIDTH_FULLBAND: i32 = 1105;

/// TOC byte from an Opus packet header.
///
/// Layout:
/// ```text
///          0 1 2 3 4 5 6 7
///         +-+-+-+-+-+-+-+-+
///         | config  |s| c |
///         +-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toc(pub u8);

impl Toc {
    /// Creates a TOC from a byte.
    pub const fn new(byte: u8) -> Self {
        Self(byte)
    }

    /// Assembles a TOC byte from its fields.
    pub fn build(config: Configuration, stereo: bool, code: FrameCode) -> Self {
        let mut byte = config.0 << 3;
        if stereo {
            byte |= 0b0000_0100;
        }
        byte |= code.bits();
        Self(byte)
    }

    /// Returns the configuration number (0-31).
    pub fn configuration(&self) -> Configuration {
        Configuration(self.0 >> 3)
    }

    /// Returns true if the TOC indicates stereo audio.
    pub fn is_stereo(&self) -> bool {
        (self.0 & 0b0000_0100) != 0
    }

    /// Returns the frame code (number of frames per packet).
    pub fn frame_code(&self) -> FrameCode {
        FrameCode::from_bits(self.0 & 0b0000_0011)
    }
}

impl std::fmt::Display for Toc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "opus_toc: stereo={}, mode={}, bw={}, {}, {}",
            self.is_stereo(),
            self.configuration().mode(),
            self.configuration().bandwidth(),
            self.frame_code(),
            self.configuration().frame_duration(),
        )
    }
}

/// Opus configuration number (0-31).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Configuration(pub u8);

impl Configuration {
    /// Finds the configuration number for a mode, bandwidth and duration.
    ///
    /// Returns `None` for combinations the format cannot express, such as
    /// 2.5 ms SILK frames or fullband SILK.
    pub fn from_parts(
        mode: ConfigurationMode,
        bandwidth: Bandwidth,
        duration: FrameDuration,
    ) -> Option<Self> {
        use FrameDuration::*;

        let (base, index) = match mode {
            ConfigurationMode::Silk => {
                let base = match bandwidth {
                    Bandwidth::Narrowband => 0,
                    Bandwidth::Mediumband => 4,
                    Bandwidth::Wideband => 8,
                    _ => return None,
                };
                let index = match duration {
                    Duration10ms => 0,
                    Duration20ms => 1,
                    Duration40ms => 2,
                    Duration60ms => 3,
                    _ => return None,
                };
                (base, index)
            }
            ConfigurationMode::Hybrid => {
                let base = match bandwidth {
                    Bandwidth::Superwideband => 12,
                    Bandwidth::Fullband => 14,
                    _ => return None,
                };
                let index = match duration {
                    Duration10ms => 0,
                    Duration20ms => 1,
                    _ => return None,
                };
                (base, index)
            }
            ConfigurationMode::Celt => {
                let base = match bandwidth {
                    Bandwidth::Narrowband => 16,
                    Bandwidth::Mediumband => return None,
                    Bandwidth::Wideband => 20,
                    Bandwidth::Superwideband => 24,
                    Bandwidth::Fullband => 28,
                };
                let index = match duration {
                    Duration2500us => 0,
                    Duration5ms => 1,
                    Duration10ms => 2,
                    Duration20ms => 3,
                    _ => return None,
                };
                (base, index)
            }
        };
        Some(Self(base + index))
    }

    /// Picks the coding mode an encoder uses for this application,
    /// bandwidth and frame length.
    ///
    /// 40/60 ms frames are SILK-only (capped at wideband), sub-10 ms frames
    /// and non-VoIP applications use CELT, and VoIP uses SILK up to wideband
    /// and Hybrid above it. CELT has no mediumband configurations, so a
    /// mediumband cap is coded as wideband there, as libopus does.
    pub fn select(application: Application, bandwidth: Bandwidth, duration: FrameDuration) -> Self {
        let long_frame = duration >= FrameDuration::Duration40ms;
        let short_frame = duration < FrameDuration::Duration10ms;

        let (mode, bandwidth) = if long_frame {
            (ConfigurationMode::Silk, bandwidth.min(Bandwidth::Wideband))
        } else if short_frame || application != Application::Voip {
            let bandwidth = match bandwidth {
                Bandwidth::Mediumband => Bandwidth::Wideband,
                other => other,
            };
            (ConfigurationMode::Celt, bandwidth)
        } else if bandwidth <= Bandwidth::Wideband {
            (ConfigurationMode::Silk, bandwidth)
        } else {
            (ConfigurationMode::Hybrid, bandwidth)
        };

        // Every combination chosen above exists in the table.
        Self::from_parts(mode, bandwidth, duration).unwrap_or(Self(31))
    }

    /// Returns the configuration mode (SILK, CELT, or Hybrid).
    pub fn mode(&self) -> ConfigurationMode {
        match self.0 {
            0..=11 => ConfigurationMode::Silk,
            12..=15 => ConfigurationMode::Hybrid,
            _ => ConfigurationMode::Celt,
        }
    }

    /// Returns the audio bandwidth.
    pub fn bandwidth(&self) -> Bandwidth {
        match self.0 {
            0..=3 => Bandwidth::Narrowband,
            4..=7 => Bandwidth::Mediumband,
            8..=11 => Bandwidth::Wideband,
            12..=13 => Bandwidth::Superwideband,
            14..=15 => Bandwidth::Fullband,
            16..=19 => Bandwidth::Narrowband,
            20..=23 => Bandwidth::Wideband,
            24..=27 => Bandwidth::Superwideband,
            _ => Bandwidth::Fullband,
        }
    }

    /// Returns the duration of one frame.
    pub fn frame_duration(&self) -> FrameDuration {
        match self.0 {
            16 | 20 | 24 | 28 => FrameDuration::Duration2500us,
            17 | 21 | 25 | 29 => FrameDuration::Duration5ms,
            0 | 4 | 8 | 12 | 14 | 18 | 22 | 26 | 30 => FrameDuration::Duration10ms,
            2 | 6 | 10 => FrameDuration::Duration40ms,
            3 | 7 | 11 => FrameDuration::Duration60ms,
            _ => FrameDuration::Duration20ms,
        }
    }
}

/// Configuration mode (SILK, CELT, or Hybrid).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurationMode {
    Silk,
    Celt,
    Hybrid,
}

impl std::fmt::Display for ConfigurationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Silk => write!(f, "SILK"),
            Self::Celt => write!(f, "CELT"),
            Self::Hybrid => write!(f, "Hybrid"),
        }
    }
}

/// Frame code indicating number of frames per packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameCode {
    /// One frame in the packet.
    One,
    /// Two frames with equal compressed size.
    TwoEqual,
    /// Two frames with different compressed sizes.
    TwoDifferent,
    /// Arbitrary number of frames, count in the following byte.
    Arbitrary,
}

impl FrameCode {
    fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => Self::One,
            1 => Self::TwoEqual,
            2 => Self::TwoDifferent,
            _ => Self::Arbitrary,
        }
    }

    fn bits(&self) -> u8 {
        match self {
            Self::One => 0,
            Self::TwoEqual => 1,
            Self::TwoDifferent => 2,
            Self::Arbitrary => 3,
        }
    }
}

impl std::fmt::Display for FrameCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::One => write!(f, "code 0 (one frame)"),
            Self::TwoEqual => write!(f, "code 1 (two equal frames)"),
            Self::TwoDifferent => write!(f, "code 2 (two different frames)"),
            Self::Arbitrary => write!(f, "code 3 (arbitrary frames)"),
        }
    }
}

/// Duration of a single Opus frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FrameDuration {
    Duration2500us,
    Duration5ms,
    Duration10ms,
    Duration20ms,
    Duration40ms,
    Duration60ms,
}

impl FrameDuration {
    /// All single-frame durations, shortest first.
    pub const ALL: [FrameDuration; 6] = [
        Self::Duration2500us,
        Self::Duration5ms,
        Self::Duration10ms,
        Self::Duration20ms,
        Self::Duration40ms,
        Self::Duration60ms,
    ];

    /// Returns the duration in microseconds.
    pub fn micros(&self) -> u32 {
        match self {
            Self::Duration2500us => 2500,
            Self::Duration5ms => 5000,
            Self::Duration10ms => 10_000,
            Self::Duration20ms => 20_000,
            Self::Duration40ms => 40_000,
            Self::Duration60ms => 60_000,
        }
    }

    /// Returns the duration as a Duration.
    pub fn duration(&self) -> Duration {
        Duration::from_micros(self.micros() as u64)
    }

    /// Returns the number of samples per channel at `sample_rate`.
    pub fn samples(&self, sample_rate: u32) -> usize {
        (sample_rate as u64 * self.micros() as u64 / 1_000_000) as usize
    }

    /// Finds the duration whose length at `sample_rate` is exactly `samples`.
    pub fn from_samples(samples: usize, sample_rate: u32) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|fd| fd.samples(sample_rate) == samples)
    }
}

impl std::fmt::Display for FrameDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Duration2500us => write!(f, "2.5ms"),
            Self::Duration5ms => write!(f, "5ms"),
            Self::Duration10ms => write!(f, "10ms"),
            Self::Duration20ms => write!(f, "20ms"),
            Self::Duration40ms => write!(f, "40ms"),
            Self::Duration60ms => write!(f, "60ms"),
        }
    }
}

/// Audio bandwidth, ordered from narrowest to widest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bandwidth {
    /// 4 kHz passband.
    Narrowband,
    /// 6 kHz passband.
    Mediumband,
    /// 8 kHz passband.
    Wideband,
    /// 12 kHz passband.
    Superwideband,
    /// 20 kHz passband.
    Fullband,
}

impl Bandwidth {
    /// Returns the sample rate that fully covers this bandwidth.
    pub fn sample_rate(&self) -> u32 {
        match self {
            Self::Narrowband => 8000,
            Self::Mediumband => 12000,
            Self::Wideband => 16000,
            Self::Superwideband => 24000,
            Self::Fullband => 48000,
        }
    }

    /// Returns the widest bandwidth representable at `sample_rate`.
    pub fn for_sample_rate(sample_rate: u32) -> Self {
        match sample_rate {
            0..=8000 => Self::Narrowband,
            8001..=12000 => Self::Mediumband,
            12001..=16000 => Self::Wideband,
            16001..=24000 => Self::Superwideband,
            _ => Self::Fullband,
        }
    }
}

impl TryFrom<i32> for Bandwidth {
    type Error = CodecError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            BANDWIDTH_NARROWBAND => Ok(Self::Narrowband),
            BANDWIDTH_MEDIUMBAND => Ok(Self::Mediumband),
            BANDWIDTH_WIDEBAND => Ok(Self::Wideband),
            BANDWIDTH_SUPERWIDEBAND => Ok(Self::Superwideband),
            BANDWIDTH_FULLBAND => Ok(Self::Fullband),
            other => Err(CodecError::invalid_argument(format!(
                "bandwidth {} is not one of {}..={}",
                other, BANDWIDTH_NARROWBAND, BANDWIDTH_FULLBAND
            ))),
        }
    }
}

impl From<Bandwidth> for i32 {
    fn from(value: Bandwidth) -> Self {
        match value {
            Bandwidth::Narrowband => BANDWIDTH_NARROWBAND,
            Bandwidth::Mediumband => BANDWIDTH_MEDIUMBAND,
            Bandwidth::Wideband => BANDWIDTH_WIDEBAND,
            Bandwidth::Superwideband => BANDWIDTH_SUPERWIDEBAND,
            Bandwidth::Fullband => BANDWIDTH_FULLBAND,
        }
    }
}

impl std::fmt::Display for Bandwidth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Narrowband => write!(f, "Narrowband"),
            Self::Mediumband => write!(f, "Mediumband"),
            Self::Wideband => write!(f, "Wideband"),
            Self::Superwideband => write!(f, "Superwideband"),
            Self::Fullband => write!(f, "Fullband"),
        }
    }
}

/// Parses the frame count byte following the TOC byte for packets with
/// arbitrary frame counts (code 3).
///
/// Returns (is_vbr, has_padding, frame_count).
pub fn parse_frame_count_byte(byte: u8) -> (bool, bool, u8) {
    let is_vbr = (byte & 0b1000_0000) != 0;
    let has_padding = (byte & 0b0100_0000) != 0;
    let frame_count = byte & 0b0011_1111;
    (is_vbr, has_padding, frame_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toc_parsing() {
        // Config 9 (WB SILK 20ms), mono, one frame
        let toc = Toc::new(0b01001000);
        assert_eq!(toc.configuration().0, 9);
        assert!(!toc.is_stereo());
        assert_eq!(toc.frame_code(), FrameCode::One);
        assert_eq!(toc.configuration().mode(), ConfigurationMode::Silk);
        assert_eq!(toc.configuration().bandwidth(), Bandwidth::Wideband);
        assert_eq!(toc.configuration().frame_duration(), FrameDuration::Duration20ms);
    }

    #[test]
    fn test_toc_build_matches_parse() {
        let config = Configuration(31);
        let toc = Toc::build(config, true, FrameCode::Arbitrary);
        assert_eq!(toc.0, 0xFF);
        assert_eq!(toc.configuration(), config);
        assert!(toc.is_stereo());
        assert_eq!(toc.frame_code(), FrameCode::Arbitrary);

        let toc = Toc::build(Configuration(9), false, FrameCode::One);
        assert_eq!(toc.0, 0x48);
    }

    #[test]
    fn test_configuration_from_parts() {
        use ConfigurationMode::*;
        use FrameDuration::*;

        assert_eq!(
            Configuration::from_parts(Silk, Bandwidth::Wideband, Duration20ms),
            Some(Configuration(9))
        );
        assert_eq!(
            Configuration::from_parts(Hybrid, Bandwidth::Fullband, Duration10ms),
            Some(Configuration(14))
        );
        assert_eq!(
            Configuration::from_parts(Celt, Bandwidth::Fullband, Duration20ms),
            Some(Configuration(31))
        );
        assert_eq!(
            Configuration::from_parts(Celt, Bandwidth::Narrowband, Duration2500us),
            Some(Configuration(16))
        );
        assert_eq!(Configuration::from_parts(Celt, Bandwidth::Mediumband, Duration20ms), None);
        assert_eq!(Configuration::from_parts(Silk, Bandwidth::Fullband, Duration20ms), None);
        assert_eq!(Configuration::from_parts(Celt, Bandwidth::Wideband, Duration40ms), None);
        assert_eq!(Configuration::from_parts(Hybrid, Bandwidth::Wideband, Duration20ms), None);
    }

    #[test]
    fn test_from_parts_round_trips_every_configuration() {
        for n in 0..32u8 {
            let config = Configuration(n);
            let rebuilt = Configuration::from_parts(
                config.mode(),
                config.bandwidth(),
                config.frame_duration(),
            );
            assert_eq!(rebuilt, Some(config), "config {}", n);
        }
    }

    #[test]
    fn test_configuration_select() {
        use FrameDuration::*;

        let c = Configuration::select(Application::Voip, Bandwidth::Wideband, Duration20ms);
        assert_eq!(c.mode(), ConfigurationMode::Silk);
        let c = Configuration::select(Application::Voip, Bandwidth::Fullband, Duration10ms);
        assert_eq!(c.mode(), ConfigurationMode::Hybrid);
        let c = Configuration::select(Application::Voip, Bandwidth::Fullband, Duration60ms);
        assert_eq!(c.mode(), ConfigurationMode::Silk);
        assert_eq!(c.bandwidth(), Bandwidth::Wideband);
        let c = Configuration::select(Application::Audio, Bandwidth::Mediumband, Duration2500us);
        assert_eq!(c, Configuration(20));
        assert_eq!(c.bandwidth(), Bandwidth::Wideband);
        let c = Configuration::select(Application::Voip, Bandwidth::Mediumband, Duration5ms);
        assert_eq!(c.mode(), ConfigurationMode::Celt);
        assert_eq!(c.bandwidth(), Bandwidth::Wideband);
        let c = Configuration::select(Application::Voip, Bandwidth::Mediumband, Duration20ms);
        assert_eq!(c, Configuration(5));
        for app in [Application::Voip, Application::Audio, Application::RestrictedLowDelay] {
            for fd in FrameDuration::ALL {
                let c = Configuration::select(app, Bandwidth::Fullband, fd);
                assert_eq!(c.frame_duration(), fd);
            }
        }
    }

    #[test]
    fn test_toc_frame_codes() {
        assert_eq!(Toc::new(0b00000000).frame_code(), FrameCode::One);
        assert_eq!(Toc::new(0b00000001).frame_code(), FrameCode::TwoEqual);
        assert_eq!(Toc::new(0b00000010).frame_code(), FrameCode::TwoDifferent);
        assert_eq!(Toc::new(0b00000011).frame_code(), FrameCode::Arbitrary);
    }

    #[test]
    fn test_configuration_modes() {
        for i in 0..=11 {
            assert_eq!(Configuration(i).mode(), ConfigurationMode::Silk);
        }
        for i in 12..=15 {
            assert_eq!(Configuration(i).mode(), ConfigurationMode::Hybrid);
        }
        for i in 16..=31 {
            assert_eq!(Configuration(i).mode(), ConfigurationMode::Celt);
        }
    }

    #[test]
    fn test_frame_duration_samples() {
        assert_eq!(FrameDuration::Duration2500us.samples(48000), 120);
        assert_eq!(FrameDuration::Duration20ms.samples(48000), 960);
        assert_eq!(FrameDuration::Duration20ms.samples(16000), 320);
        assert_eq!(FrameDuration::Duration2500us.samples(8000), 20);
        assert_eq!(FrameDuration::Duration60ms.samples(12000), 720);
    }

    #[test]
    fn test_frame_duration_from_samples() {
        assert_eq!(
            FrameDuration::from_samples(960, 48000),
            Some(FrameDuration::Duration20ms)
        );
        assert_eq!(
            FrameDuration::from_samples(40, 16000),
            Some(FrameDuration::Duration2500us)
        );
        assert_eq!(FrameDuration::from_samples(1000, 48000), None);
    }

    #[test]
    fn test_bandwidth_ctl_values() {
        let pairs = [
            (Bandwidth::Narrowband, 1101),
            (Bandwidth::Mediumband, 1102),
            (Bandwidth::Wideband, 1103),
            (Bandwidth::Superwideband, 1104),
            (Bandwidth::Fullband, 1105),
        ];
        for (variant, raw) in pairs {
            assert_eq!(Bandwidth::try_from(raw).unwrap(), variant);
            assert_eq!(i32::from(variant), raw);
        }
        assert!(Bandwidth::try_from(1100).is_err());
        assert!(Bandwidth::try_from(-1000).is_err());
    }

    #[test]
    fn test_bandwidth_for_sample_rate() {
        assert_eq!(Bandwidth::for_sample_rate(8000), Bandwidth::Narrowband);
        assert_eq!(Bandwidth::for_sample_rate(12000), Bandwidth::Mediumband);
        assert_eq!(Bandwidth::for_sample_rate(16000), Bandwidth::Wideband);
        assert_eq!(Bandwidth::for_sample_rate(24000), Bandwidth::Superwideband);
        assert_eq!(Bandwidth::for_sample_rate(48000), Bandwidth::Fullband);
        assert!(Bandwidth::Narrowband < Bandwidth::Fullband);
    }

    #[test]
    fn test_frame_count_byte() {
        let (is_vbr, has_padding, count) = parse_frame_count_byte(0b11000011);
        assert!(is_vbr);
        assert!(has_padding);
        assert_eq!(count, 3);

        let (is_vbr, has_padding, count) = parse_frame_count_byte(0b00000101);
        assert!(!is_vbr);
        assert!(!has_padding);
        assert_eq!(count, 5);
    }

    #[test]
    fn test_toc_display() {
        let s = format!("{}", Toc::new(0b01001000));
        assert!(s.contains("stereo=false"));
        assert!(s.contains("SILK"));
        assert!(s.contains("Wideband"));
    }
}
