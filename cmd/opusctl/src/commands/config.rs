//! Configuration management commands.

use clap::{Args, Subcommand};
use opusctl_cli::config::{BitrateSetting, Profile};
use opusctl_codec::{Application, Bandwidth, Channels, SampleRate};

use super::{get_config, output_result, print_success};
use crate::Cli;

/// Manage CLI configuration.
///
/// Profiles hold the settings every new session starts from, similar to
/// kubectl's context management.
///
/// Configuration is stored in ~/.opusctl/config.yaml
#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// Add or replace a profile
    #[command(name = "add-profile")]
    AddProfile {
        /// Profile name
        name: String,
        /// Sample rate in Hz (8000, 12000, 16000, 24000, 48000)
        #[arg(long, default_value_t = 48000, value_parser = parse_sample_rate)]
        sample_rate: u32,
        /// Channel count (1 or 2)
        #[arg(long, default_value_t = 1)]
        channels: u8,
        /// Application: voip, audio or restricted_low_delay
        #[arg(long, default_value = "voip", value_parser = parse_application)]
        application: Application,
        /// Bitrate in bits per second, `auto` or `max`
        #[arg(long)]
        bitrate: Option<BitrateSetting>,
        /// Encoder complexity (0-10)
        #[arg(long)]
        complexity: Option<i32>,
        /// Maximum bandwidth: narrowband, mediumband, wideband, superwideband, fullband
        #[arg(long, value_parser = parse_bandwidth)]
        max_bandwidth: Option<Bandwidth>,
        /// Enable in-band FEC
        #[arg(long)]
        inband_fec: Option<bool>,
        /// Expected packet loss percentage (0-100)
        #[arg(long)]
        packet_loss_perc: Option<i32>,
        /// Enable DTX
        #[arg(long)]
        dtx: Option<bool>,
    },
    /// Delete a profile
    #[command(name = "delete-profile")]
    DeleteProfile {
        /// Profile name
        name: String,
    },
    /// Set the current profile
    #[command(name = "use-profile")]
    UseProfile {
        /// Profile name
        name: String,
    },
    /// Display the current profile
    #[command(name = "get-profile")]
    GetProfile,
    /// List all profiles
    #[command(name = "list-profiles", alias = "get-profiles")]
    ListProfiles,
    /// View the current configuration
    View,
}

fn parse_sample_rate(s: &str) -> Result<u32, String> {
    let hz: u32 = s.parse().map_err(|_| format!("'{}' is not a number", s))?;
    SampleRate::try_from(hz).map(|_| hz).map_err(|e| e.to_string())
}

fn parse_application(s: &str) -> Result<Application, String> {
    serde_yaml::from_str(s).map_err(|_| format!("unknown application '{}'", s))
}

fn parse_bandwidth(s: &str) -> Result<Bandwidth, String> {
    serde_yaml::from_str(s).map_err(|_| format!("unknown bandwidth '{}'", s))
}

impl ConfigCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        match &self.command {
            ConfigSubcommand::AddProfile {
                name,
                sample_rate,
                channels,
                application,
                bitrate,
                complexity,
                max_bandwidth,
                inband_fec,
                packet_loss_perc,
                dtx,
            } => {
                let mut cfg = get_config(cli)?;

                let profile = Profile {
                    sample_rate: SampleRate::try_from(*sample_rate)?,
                    channels: Channels::try_from(*channels)?,
                    application: *application,
                    bitrate: *bitrate,
                    complexity: *complexity,
                    max_bandwidth: *max_bandwidth,
                    inband_fec: *inband_fec,
                    packet_loss_perc: *packet_loss_perc,
                    dtx: *dtx,
                    ..Default::default()
                };

                cfg.add_profile(name, profile)?;
                print_success(&format!("Profile \"{}\" added successfully", name));
                Ok(())
            }

            ConfigSubcommand::DeleteProfile { name } => {
                let mut cfg = get_config(cli)?;
                cfg.delete_profile(name)?;
                print_success(&format!("Profile \"{}\" deleted", name));
                Ok(())
            }

            ConfigSubcommand::UseProfile { name } => {
                let mut cfg = get_config(cli)?;
                cfg.use_profile(name)?;
                print_success(&format!("Switched to profile \"{}\"", name));
                Ok(())
            }

            ConfigSubcommand::GetProfile => {
                let cfg = get_config(cli)?;
                if cfg.current_profile.is_empty() {
                    println!("No current profile set");
                } else {
                    println!("{}", cfg.current_profile);
                }
                Ok(())
            }

            ConfigSubcommand::ListProfiles => {
                let cfg = get_config(cli)?;

                if cfg.profiles.is_empty() {
                    println!("No profiles configured");
                    return Ok(());
                }

                println!(
                    "{:<8} {:<20} {:<12} {:<9} {}",
                    "CURRENT", "NAME", "SAMPLE_RATE", "CHANNELS", "APPLICATION"
                );
                for (name, profile) in &cfg.profiles {
                    let current = if name == &cfg.current_profile { "*" } else { "" };
                    println!(
                        "{:<8} {:<20} {:<12} {:<9} {:?}",
                        current,
                        name,
                        profile.sample_rate.hz(),
                        profile.channels.count(),
                        profile.application
                    );
                }
                Ok(())
            }

            ConfigSubcommand::View => {
                let cfg = get_config(cli)?;
                eprintln!("Config file: {}", cfg.path().display());
                output_result(cli, &cfg)
            }
        }
    }
}
