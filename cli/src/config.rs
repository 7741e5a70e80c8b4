//! Configuration management for opusctl.
//!
//! Configuration is stored in ~/.opusctl/config.yaml and holds named
//! profiles: creation-time settings plus the ctl values applied to every
//! new session.

use std::collections::BTreeMap;
use std::path::PathBuf;

use opusctl_codec::{
    Application, Bandwidth, Bitrate, Channels, Ctl, SampleRate, SessionConfig,
};
use serde::{Deserialize, Serialize};

/// Default base configuration directory name.
pub const DEFAULT_BASE_DIR: &str = ".opusctl";
/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Name of the currently active profile.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub current_profile: String,

    /// Map of profile name to profile.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub profiles: BTreeMap<String, Profile>,

    /// Path to the config file (not serialized).
    #[serde(skip)]
    config_path: PathBuf,
}

/// Bitrate as written in YAML: a number of bits per second, `auto` or `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BitrateSetting {
    Bits(i32),
    Keyword(BitrateKeyword),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BitrateKeyword {
    Auto,
    Max,
}

impl From<BitrateSetting> for Bitrate {
    fn from(value: BitrateSetting) -> Self {
        match value {
            BitrateSetting::Bits(bits) => Bitrate::Bits(bits),
            BitrateSetting::Keyword(BitrateKeyword::Auto) => Bitrate::Auto,
            BitrateSetting::Keyword(BitrateKeyword::Max) => Bitrate::Max,
        }
    }
}

impl std::str::FromStr for BitrateSetting {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Keyword(BitrateKeyword::Auto)),
            "max" => Ok(Self::Keyword(BitrateKeyword::Max)),
            other => Ok(Self::Bits(other.parse().map_err(|_| {
                anyhow::anyhow!("bitrate must be a number, 'auto' or 'max', got '{}'", s)
            })?)),
        }
    }
}

/// A named set of session settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Profile name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default)]
    pub sample_rate: SampleRate,

    #[serde(default)]
    pub channels: Channels,

    #[serde(default)]
    pub application: Application,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<BitrateSetting>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bandwidth: Option<Bandwidth>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inband_fec: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packet_loss_perc: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtx: Option<bool>,
}

impl Profile {
    /// Creation-time settings for a session built from this profile.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(self.sample_rate, self.channels, self.application)
    }

    /// Setter ctls that bring a fresh encoder to this profile, in a fixed
    /// order. Values are not validated here; the session rejects bad ones.
    pub fn encoder_ctls(&self) -> Vec<Ctl> {
        let mut ctls = Vec::new();
        if let Some(bitrate) = self.bitrate {
            ctls.push(Ctl::SetBitrate(Bitrate::from(bitrate).into()));
        }
        if let Some(complexity) = self.complexity {
            ctls.push(Ctl::SetComplexity(complexity));
        }
        if let Some(bandwidth) = self.max_bandwidth {
            ctls.push(Ctl::SetMaxBandwidth(bandwidth.into()));
        }
        if let Some(fec) = self.inband_fec {
            ctls.push(Ctl::SetInbandFec(fec as i32));
        }
        if let Some(perc) = self.packet_loss_perc {
            ctls.push(Ctl::SetPacketLossPerc(perc));
        }
        if let Some(dtx) = self.dtx {
            ctls.push(Ctl::SetDtx(dtx as i32));
        }
        ctls
    }
}

impl Config {
    /// Gets the default config directory.
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(DEFAULT_BASE_DIR))
    }

    /// Gets the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        Self::default_config_dir().map(|dir| dir.join(DEFAULT_CONFIG_FILE))
    }

    /// Returns the config file path.
    pub fn path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Saves the configuration to disk.
    pub fn save(&self) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(&self.config_path, content)?;
        Ok(())
    }

    /// Adds or replaces a profile.
    pub fn add_profile(&mut self, name: &str, mut profile: Profile) -> anyhow::Result<()> {
        profile.name = name.to_string();
        self.profiles.insert(name.to_string(), profile);
        self.save()
    }

    /// Deletes a profile.
    pub fn delete_profile(&mut self, name: &str) -> anyhow::Result<()> {
        if self.profiles.remove(name).is_none() {
            anyhow::bail!("profile '{}' not found", name);
        }
        if self.current_profile == name {
            self.current_profile.clear();
        }
        self.save()
    }

    /// Sets the current profile.
    pub fn use_profile(&mut self, name: &str) -> anyhow::Result<()> {
        if !self.profiles.contains_key(name) {
            anyhow::bail!("profile '{}' not found", name);
        }
        self.current_profile = name.to_string();
        self.save()
    }

    /// Gets a specific profile.
    pub fn get_profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// Gets the current profile.
    pub fn get_current_profile(&self) -> Option<&Profile> {
        if self.current_profile.is_empty() {
            return None;
        }
        self.profiles.get(&self.current_profile)
    }

    /// Resolves the profile by name, or the current profile if no name is
    /// given. Falls back to the built-in defaults when neither exists.
    pub fn resolve_profile(&self, name: Option<&str>) -> anyhow::Result<Profile> {
        match name {
            Some(n) if !n.is_empty() => self
                .get_profile(n)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("profile '{}' not found", n)),
            _ => Ok(self.get_current_profile().cloned().unwrap_or_default()),
        }
    }

    /// Lists all profile names, sorted.
    pub fn list_profiles(&self) -> Vec<&str> {
        self.profiles.keys().map(|s| s.as_str()).collect()
    }
}

fn config_path(custom_path: Option<&str>) -> anyhow::Result<PathBuf> {
    match custom_path {
        Some(p) => Ok(PathBuf::from(p)),
        None => Config::default_config_path()
            .ok_or_else(|| anyhow::anyhow!("cannot determine config path")),
    }
}

/// Loads configuration, creating an empty file on first use.
pub fn load_config(custom_path: Option<&str>) -> anyhow::Result<Config> {
    let config_path = config_path(custom_path)?;

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut cfg: Config = if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        if content.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(&content)?
        }
    } else {
        let cfg = Config::default();
        std::fs::write(&config_path, serde_yaml::to_string(&cfg)?)?;
        cfg
    };

    cfg.config_path = config_path;
    Ok(cfg)
}
