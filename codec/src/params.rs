//! Validated codec configuration.
//!
//! [`ParameterStore`] is the record every session owns. It is readable from
//! anywhere in the crate but only the controller writes to it, and every
//! write happens after validation so the record never holds an
//! out-of-range value.

use serde::{Deserialize, Serialize};

use crate::error::{CodecError, Result};
use crate::toc::Bandwidth;

/// `OPUS_AUTO`.
pub const AUTO: i32 = -1000;
/// `OPUS_BITRATE_MAX`.
pub const BITRATE_MAX: i32 = -1;

/// `OPUS_APPLICATION_VOIP`.
pub const APPLICATION_VOIP: i32 = 2048;
/// `OPUS_APPLICATION_AUDIO`.
pub const APPLICATION_AUDIO: i32 = 2049;
/// `OPUS_APPLICATION_RESTRICTED_LOWDELAY`.
pub const APPLICATION_RESTRICTED_LOWDELAY: i32 = 2051;

/// Highest complexity setting.
pub const MAX_COMPLEXITY: i32 = 10;
/// Complexity a fresh or reset encoder runs at.
pub const DEFAULT_COMPLEXITY: i32 = 9;

/// Bitrate configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bitrate {
    /// Let the encoder choose the bitrate.
    Auto,
    /// Maximum bitrate the packet size allows.
    Max,
    /// Explicit bitrate in bits per second.
    Bits(i32),
}

impl Bitrate {
    /// Returns an error unless this is a sentinel or a positive rate.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Bits(bits) if *bits <= 0 => Err(CodecError::invalid_argument(format!(
                "bitrate {} must be positive, AUTO ({}) or MAX ({})",
                bits, AUTO, BITRATE_MAX
            ))),
            _ => Ok(()),
        }
    }
}

impl Default for Bitrate {
    fn default() -> Self {
        Self::Auto
    }
}

impl TryFrom<i32> for Bitrate {
    type Error = CodecError;

    fn try_from(value: i32) -> Result<Self> {
        let bitrate = match value {
            AUTO => Self::Auto,
            BITRATE_MAX => Self::Max,
            bits => Self::Bits(bits),
        };
        bitrate.validate()?;
        Ok(bitrate)
    }
}

impl From<Bitrate> for i32 {
    fn from(value: Bitrate) -> Self {
        match value {
            Bitrate::Auto => AUTO,
            Bitrate::Max => BITRATE_MAX,
            Bitrate::Bits(bits) => bits,
        }
    }
}

/// Intended application profile, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Application {
    /// Best quality for voice signals.
    #[default]
    Voip,
    /// Best quality for non-voice signals.
    Audio,
    /// Minimum possible coding delay.
    RestrictedLowDelay,
}

impl TryFrom<i32> for Application {
    type Error = CodecError;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            APPLICATION_VOIP => Ok(Self::Voip),
            APPLICATION_AUDIO => Ok(Self::Audio),
            APPLICATION_RESTRICTED_LOWDELAY => Ok(Self::RestrictedLowDelay),
            other => Err(CodecError::invalid_argument(format!(
                "unknown application {}",
                other
            ))),
        }
    }
}

impl From<Application> for i32 {
    fn from(value: Application) -> Self {
        match value {
            Application::Voip => APPLICATION_VOIP,
            Application::Audio => APPLICATION_AUDIO,
            Application::RestrictedLowDelay => APPLICATION_RESTRICTED_LOWDELAY,
        }
    }
}

/// Channel count, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Channels {
    #[default]
    Mono,
    Stereo,
}

impl Channels {
    /// Returns the number of channels.
    pub fn count(&self) -> usize {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
        }
    }
}

impl TryFrom<u8> for Channels {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Self::Mono),
            2 => Ok(Self::Stereo),
            other => Err(CodecError::invalid_argument(format!(
                "channel count {} is not 1 or 2",
                other
            ))),
        }
    }
}

impl From<Channels> for u8 {
    fn from(value: Channels) -> Self {
        value.count() as u8
    }
}

/// Sample rate, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum SampleRate {
    Hz8000,
    Hz12000,
    Hz16000,
    Hz24000,
    #[default]
    Hz48000,
}

impl SampleRate {
    /// Returns the rate in Hz.
    pub fn hz(&self) -> u32 {
        match self {
            Self::Hz8000 => 8000,
            Self::Hz12000 => 12000,
            Self::Hz16000 => 16000,
            Self::Hz24000 => 24000,
            Self::Hz48000 => 48000,
        }
    }
}

impl TryFrom<u32> for SampleRate {
    type Error = CodecError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            8000 => Ok(Self::Hz8000),
            12000 => Ok(Self::Hz12000),
            16000 => Ok(Self::Hz16000),
            24000 => Ok(Self::Hz24000),
            48000 => Ok(Self::Hz48000),
            other => Err(CodecError::invalid_argument(format!(
                "sample rate {} is not one of 8000, 12000, 16000, 24000, 48000",
                other
            ))),
        }
    }
}

impl From<SampleRate> for u32 {
    fn from(value: SampleRate) -> Self {
        value.hz()
    }
}

/// Validated codec configuration owned by one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterStore {
    sample_rate: SampleRate,
    channels: Channels,
    application: Application,
    bitrate: Bitrate,
    complexity: i32,
    max_bandwidth: Bandwidth,
    inband_fec: bool,
    packet_loss_perc: i32,
    dtx: bool,
    in_dtx: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_packet_duration: Option<u32>,
}

impl ParameterStore {
    /// Creates a store holding the defaults for the given fixed settings.
    pub fn new(sample_rate: SampleRate, channels: Channels, application: Application) -> Self {
        Self {
            sample_rate,
            channels,
            application,
            bitrate: Bitrate::Auto,
            complexity: DEFAULT_COMPLEXITY,
            max_bandwidth: Bandwidth::Fullband,
            inband_fec: false,
            packet_loss_perc: 0,
            dtx: false,
            in_dtx: false,
            last_packet_duration: None,
        }
    }

    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    pub fn channels(&self) -> Channels {
        self.channels
    }

    pub fn application(&self) -> Application {
        self.application
    }

    pub fn bitrate(&self) -> Bitrate {
        self.bitrate
    }

    pub fn complexity(&self) -> i32 {
        self.complexity
    }

    pub fn max_bandwidth(&self) -> Bandwidth {
        self.max_bandwidth
    }

    pub fn inband_fec(&self) -> bool {
        self.inband_fec
    }

    pub fn packet_loss_perc(&self) -> i32 {
        self.packet_loss_perc
    }

    pub fn dtx(&self) -> bool {
        self.dtx
    }

    pub fn in_dtx(&self) -> bool {
        self.in_dtx
    }

    pub fn last_packet_duration(&self) -> Option<u32> {
        self.last_packet_duration
    }

    /// Bandwidth actually coded: the configured maximum, capped by what the
    /// sample rate can carry.
    pub fn effective_bandwidth(&self) -> Bandwidth {
        self.max_bandwidth
            .min(Bandwidth::for_sample_rate(self.sample_rate.hz()))
    }

    // Writers below assume the value was validated by the controller.

    pub(crate) fn store_bitrate(&mut self, bitrate: Bitrate) {
        self.bitrate = bitrate;
    }

    pub(crate) fn store_complexity(&mut self, complexity: i32) {
        self.complexity = complexity;
    }

    pub(crate) fn store_max_bandwidth(&mut self, bandwidth: Bandwidth) {
        self.max_bandwidth = bandwidth;
    }

    pub(crate) fn store_inband_fec(&mut self, enabled: bool) {
        self.inband_fec = enabled;
    }

    pub(crate) fn store_packet_loss_perc(&mut self, perc: i32) {
        self.packet_loss_perc = perc;
    }

    pub(crate) fn store_dtx(&mut self, enabled: bool) {
        self.dtx = enabled;
    }

    pub(crate) fn observe_in_dtx(&mut self, in_dtx: bool) {
        self.in_dtx = in_dtx;
    }

    pub(crate) fn observe_packet_duration(&mut self, samples: u32) {
        self.last_packet_duration = Some(samples);
    }

    /// Restores every mutable field, keeping the creation-time settings.
    pub(crate) fn restore_defaults(&mut self) {
        *self = Self::new(self.sample_rate, self.channels, self.application);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitrate_from_i32() {
        assert_eq!(Bitrate::try_from(AUTO).unwrap(), Bitrate::Auto);
        assert_eq!(Bitrate::try_from(BITRATE_MAX).unwrap(), Bitrate::Max);
        assert_eq!(Bitrate::try_from(64000).unwrap(), Bitrate::Bits(64000));
        assert!(Bitrate::try_from(0).is_err());
        assert!(Bitrate::try_from(-2).is_err());
        assert!(Bitrate::Bits(-5).validate().is_err());
    }

    #[test]
    fn test_bitrate_into_i32() {
        assert_eq!(i32::from(Bitrate::Auto), -1000);
        assert_eq!(i32::from(Bitrate::Max), -1);
        assert_eq!(i32::from(Bitrate::Bits(128000)), 128000);
    }

    #[test]
    fn test_application_values() {
        assert_eq!(Application::try_from(2048).unwrap(), Application::Voip);
        assert_eq!(Application::try_from(2049).unwrap(), Application::Audio);
        assert_eq!(Application::try_from(2051).unwrap(), Application::RestrictedLowDelay);
        assert!(Application::try_from(2050).is_err());
        assert_eq!(i32::from(Application::Audio), 2049);
    }

    #[test]
    fn test_sample_rate_and_channels() {
        assert_eq!(SampleRate::try_from(16000).unwrap().hz(), 16000);
        assert!(SampleRate::try_from(44100).is_err());
        assert_eq!(Channels::try_from(2).unwrap().count(), 2);
        assert!(Channels::try_from(3).is_err());
    }

    #[test]
    fn test_defaults() {
        let store = ParameterStore::new(SampleRate::Hz48000, Channels::Mono, Application::Voip);
        assert_eq!(store.bitrate(), Bitrate::Auto);
        assert_eq!(store.complexity(), DEFAULT_COMPLEXITY);
        assert_eq!(store.max_bandwidth(), Bandwidth::Fullband);
        assert!(!store.inband_fec());
        assert_eq!(store.packet_loss_perc(), 0);
        assert!(!store.dtx());
        assert!(!store.in_dtx());
        assert_eq!(store.last_packet_duration(), None);
    }

    #[test]
    fn test_restore_defaults_keeps_fixed_settings() {
        let mut store =
            ParameterStore::new(SampleRate::Hz16000, Channels::Stereo, Application::Audio);
        store.store_bitrate(Bitrate::Bits(24000));
        store.store_dtx(true);
        store.observe_packet_duration(320);
        store.restore_defaults();

        assert_eq!(store.sample_rate(), SampleRate::Hz16000);
        assert_eq!(store.channels(), Channels::Stereo);
        assert_eq!(store.application(), Application::Audio);
        assert_eq!(store.bitrate(), Bitrate::Auto);
        assert!(!store.dtx());
        assert_eq!(store.last_packet_duration(), None);
    }

    #[test]
    fn test_effective_bandwidth() {
        let mut store = ParameterStore::new(SampleRate::Hz16000, Channels::Mono, Application::Voip);
        assert_eq!(store.effective_bandwidth(), Bandwidth::Wideband);
        store.store_max_bandwidth(Bandwidth::Narrowband);
        assert_eq!(store.effective_bandwidth(), Bandwidth::Narrowband);
    }

    #[test]
    fn test_serialize_config() {
        let channels: Channels = serde_json::from_str("2").unwrap();
        assert_eq!(channels, Channels::Stereo);
        let rate: SampleRate = serde_json::from_str("24000").unwrap();
        assert_eq!(rate, SampleRate::Hz24000);
        assert!(serde_json::from_str::<SampleRate>("44100").is_err());
        let bitrate: Bitrate = serde_json::from_str(r#"{"bits":32000}"#).unwrap();
        assert_eq!(bitrate, Bitrate::Bits(32000));
        let bitrate: Bitrate = serde_json::from_str(r#""auto""#).unwrap();
        assert_eq!(bitrate, Bitrate::Auto);
    }
}
