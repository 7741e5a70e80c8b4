//! Simulate command: DTX decisions over alternating speech and silence.

use clap::Args;
use opusctl_codec::dtx::ACTIVITY_THRESHOLD;
use opusctl_codec::Role;
use opusctl_codec::session::MAX_PACKET_SIZE;
use serde::Serialize;
use tracing::debug;

use super::{get_profile, open_session, output_result};
use crate::Cli;

/// Encode alternating stretches of speech and silence and report which
/// frames DTX suppressed.
///
/// The pattern is a comma-separated list of `speech:MS` and `silence:MS`
/// segments, for example `speech:200,silence:1000,speech:100`. DTX is
/// switched on regardless of the profile.
#[derive(Args)]
pub struct SimulateCommand {
    /// Segments as KIND:MS, KIND being `speech` or `silence`
    #[arg(long, default_value = "speech:200,silence:1000,speech:100")]
    pattern: String,

    /// Frame length in milliseconds (2.5, 5, 10, 20, 40, 60, 80, 100, 120)
    #[arg(long, default_value_t = 20.0)]
    frame_ms: f64,

    /// Include every frame in the report, not just the transitions
    #[arg(long)]
    frames: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    Speech(u32),
    Silence(u32),
}

fn parse_pattern(pattern: &str) -> anyhow::Result<Vec<Segment>> {
    pattern
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|part| {
            let (kind, ms) = part
                .trim()
                .split_once(':')
                .ok_or_else(|| anyhow::anyhow!("segment '{}' is not KIND:MS", part))?;
            let ms: u32 = ms
                .parse()
                .map_err(|_| anyhow::anyhow!("segment '{}' has a bad duration", part))?;
            match kind {
                "speech" => Ok(Segment::Speech(ms)),
                "silence" => Ok(Segment::Silence(ms)),
                other => anyhow::bail!("unknown segment kind '{}'", other),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
struct FrameRecord {
    index: usize,
    time_ms: f64,
    speech: bool,
    bytes: usize,
    in_dtx: bool,
}

#[derive(Debug, Serialize)]
struct SimulationReport {
    sample_rate: u32,
    frame_size: usize,
    bitrate: i32,
    total_frames: usize,
    dtx_frames: usize,
    total_bytes: usize,
    transitions: Vec<FrameRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    frames: Vec<FrameRecord>,
}

impl SimulateCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let segments = parse_pattern(&self.pattern)?;
        let profile = get_profile(cli)?;
        let config = profile.session_config();
        let fs = config.sample_rate.hz();
        let channels = config.channels.count();

        let frame_size = (self.frame_ms * fs as f64 / 1000.0).round() as usize;
        if frame_size == 0 {
            anyhow::bail!("frame length {} ms is too short", self.frame_ms);
        }
        let (mut session, _) = open_session(Role::Encoder, config, &profile)?;
        session.set_dtx(true)?;

        // A tone well above the activity threshold stands in for speech.
        let amplitude = (ACTIVITY_THRESHOLD.sqrt() * 16.0) as i16;
        let speech: Vec<i16> = (0..frame_size * channels)
            .map(|i| if (i / channels) % 2 == 0 { amplitude } else { -amplitude })
            .collect();
        let silence = vec![0i16; frame_size * channels];

        let frame_us = frame_size as f64 * 1_000_000.0 / fs as f64;
        let mut packet = vec![0u8; MAX_PACKET_SIZE];
        let mut records = Vec::new();
        let mut elapsed_us = 0.0;

        for segment in segments {
            let (is_speech, ms) = match segment {
                Segment::Speech(ms) => (true, ms),
                Segment::Silence(ms) => (false, ms),
            };
            let count = (ms as f64 * 1000.0 / frame_us).ceil() as usize;
            for _ in 0..count {
                let pcm = if is_speech { &speech } else { &silence };
                let bytes = session.encode_to(pcm, frame_size, &mut packet)?;
                records.push(FrameRecord {
                    index: records.len(),
                    time_ms: elapsed_us / 1000.0,
                    speech: is_speech,
                    bytes,
                    in_dtx: session.in_dtx()?,
                });
                elapsed_us += frame_us;
            }
        }
        debug!(frames = records.len(), "simulate: done");

        let transitions = records
            .iter()
            .enumerate()
            .filter(|(i, r)| *i == 0 || records[i - 1].in_dtx != r.in_dtx)
            .map(|(_, r)| r.clone())
            .collect();

        let report = SimulationReport {
            sample_rate: fs,
            frame_size,
            bitrate: session.bitrate()?.into(),
            total_frames: records.len(),
            dtx_frames: records.iter().filter(|r| r.in_dtx).count(),
            total_bytes: records.iter().map(|r| r.bytes).sum(),
            transitions,
            frames: if self.frames { records } else { Vec::new() },
        };
        output_result(cli, &report)?;
        session.close()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pattern() {
        assert_eq!(
            parse_pattern("speech:200, silence:1000,speech:100").unwrap(),
            vec![
                Segment::Speech(200),
                Segment::Silence(1000),
                Segment::Speech(100)
            ]
        );
        assert!(parse_pattern("noise:100").is_err());
        assert!(parse_pattern("speech").is_err());
        assert!(parse_pattern("speech:abc").is_err());
        assert!(parse_pattern("").unwrap().is_empty());
    }
}
