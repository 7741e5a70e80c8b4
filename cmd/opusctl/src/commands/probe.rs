//! Probe command: TOC inspection and decoder-reported durations.

use clap::Args;
use opusctl_codec::{Packet, Role, SessionConfig};
use serde::Serialize;
use tracing::{debug, warn};

use super::{get_profile, open_session, output_result};
use crate::Cli;

/// Inspect Opus packets given as hex.
///
/// Each packet is parsed for its TOC byte and frame count, then fed to a
/// decoder session so the reported last packet duration can be compared
/// with the header. Packets are decoded in order on the same session.
#[derive(Args)]
pub struct ProbeCommand {
    /// Packets as hex strings (e.g. `f8fffe`)
    #[arg(required = true)]
    packets: Vec<String>,

    /// Decoder sample rate in Hz (defaults to the profile's)
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Decoder channel count (defaults to the profile's)
    #[arg(long)]
    channels: Option<u8>,
}

#[derive(Debug, Default, Serialize)]
struct PacketReport {
    hex: String,
    bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bandwidth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frame_duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stereo: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frame_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frames: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    samples: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_ms: Option<f64>,
    dtx: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    decoded_samples: Option<usize>,
    last_packet_duration: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn inspect(data: &[u8], sample_rate: u32) -> PacketReport {
    let packet = Packet::from_slice(data);
    let mut report = PacketReport {
        hex: hex::encode(data),
        bytes: data.len(),
        ..Default::default()
    };
    if packet.is_empty() {
        return report;
    }

    let toc = packet.toc();
    report.config = Some(toc.configuration().0);
    report.mode = Some(packet.mode().to_string());
    report.bandwidth = Some(format!("{:?}", packet.bandwidth()).to_lowercase());
    report.frame_duration = Some(packet.frame_duration().to_string());
    report.stereo = Some(toc.is_stereo());
    report.frame_code = Some(toc.frame_code().to_string());
    report.dtx = packet.is_dtx();

    match packet.samples(sample_rate) {
        Ok(samples) => {
            report.samples = Some(samples);
            report.duration_ms = Some(samples as f64 * 1000.0 / sample_rate as f64);
        }
        Err(e) => report.error = Some(e.to_string()),
    }
    // Frame count is reported even when the total is over the limit.
    report.frames = opusctl_codec::packet::frame_count(data).ok();
    report
}

impl ProbeCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let profile = get_profile(cli)?;
        let mut config = profile.session_config();
        if let Some(hz) = self.sample_rate {
            config.sample_rate = hz.try_into()?;
        }
        if let Some(channels) = self.channels {
            config.channels = channels.try_into()?;
        }
        let reports = self.probe(config, &profile)?;
        output_result(cli, &reports)
    }

    fn probe(
        &self,
        config: SessionConfig,
        profile: &opusctl_cli::Profile,
    ) -> anyhow::Result<Vec<PacketReport>> {
        let fs = config.sample_rate.hz();
        let (mut session, _) = open_session(Role::Decoder, config, profile)?;

        let mut reports = Vec::with_capacity(self.packets.len());
        for raw in &self.packets {
            let data = match hex::decode(raw.trim()) {
                Ok(data) => data,
                Err(e) => {
                    warn!(packet = %raw, "probe: bad hex");
                    reports.push(PacketReport {
                        hex: raw.clone(),
                        error: Some(format!("invalid hex: {}", e)),
                        ..Default::default()
                    });
                    continue;
                }
            };

            let mut report = inspect(&data, fs);
            if report.error.is_none() {
                match session.decode_vec(&data) {
                    Ok(pcm) => report.decoded_samples = Some(pcm.len() / config.channels.count()),
                    Err(e) => report.error = Some(e.to_string()),
                }
            }
            report.last_packet_duration = session.last_packet_duration()?.unwrap_or(0);
            debug!(bytes = data.len(), last = report.last_packet_duration, "probe: packet");
            reports.push(report);
        }

        session.close()?;
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inspect_single_frame() {
        // config 31: CELT fullband 20ms, mono, code 0
        let report = inspect(&[0xf8, 0xff, 0xfe], 48000);
        assert_eq!(report.config, Some(31));
        assert_eq!(report.mode.as_deref(), Some("CELT"));
        assert_eq!(report.bandwidth.as_deref(), Some("fullband"));
        assert_eq!(report.frame_duration.as_deref(), Some("20ms"));
        assert_eq!(report.stereo, Some(false));
        assert_eq!(report.frames, Some(1));
        assert_eq!(report.samples, Some(960));
        assert_eq!(report.duration_ms, Some(20.0));
        assert!(!report.dtx);
        assert!(report.error.is_none());
    }

    #[test]
    fn test_inspect_code3() {
        // config 31 code 3 with 3 frames
        let report = inspect(&[0xfb, 0x03, 0x00], 16000);
        assert_eq!(report.frames, Some(3));
        assert_eq!(report.samples, Some(960));
        assert_eq!(report.duration_ms, Some(60.0));
    }

    #[test]
    fn test_inspect_too_long() {
        // 7 frames of 20ms exceeds 120ms
        let report = inspect(&[0xfb, 0x07], 48000);
        assert_eq!(report.frames, Some(7));
        assert!(report.samples.is_none());
        assert!(report.error.is_some());
    }

    #[test]
    fn test_inspect_empty() {
        let report = inspect(&[], 48000);
        assert_eq!(report.bytes, 0);
        assert!(report.config.is_none());
    }
}
