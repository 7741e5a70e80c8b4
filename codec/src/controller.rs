//! Get/set operations against a session's parameter store.
//!
//! The controller checks the role, validates the value and only then writes,
//! so a failed call leaves the store exactly as it was.

use tracing::debug;

use crate::error::{CodecError, Result};
use crate::params::{Bitrate, MAX_COMPLEXITY, ParameterStore};
use crate::session::Role;
use crate::toc::Bandwidth;

/// Owns a [`ParameterStore`] on behalf of one session.
#[derive(Debug)]
pub struct StateController {
    role: Role,
    store: ParameterStore,
}

impl StateController {
    pub fn new(role: Role, store: ParameterStore) -> Self {
        Self { role, store }
    }

    /// Read-only view of the current parameters.
    pub fn store(&self) -> &ParameterStore {
        &self.store
    }

    pub fn role(&self) -> Role {
        self.role
    }

    fn require(&self, role: Role, op: &'static str) -> Result<()> {
        if self.role != role {
            return Err(CodecError::Unsupported {
                op,
                role: self.role,
            });
        }
        Ok(())
    }

    pub fn set_bitrate(&mut self, bitrate: Bitrate) -> Result<()> {
        self.require(Role::Encoder, "set_bitrate")?;
        bitrate.validate()?;
        debug!(?bitrate, "opus: set bitrate");
        self.store.store_bitrate(bitrate);
        Ok(())
    }

    pub fn bitrate(&self) -> Result<Bitrate> {
        self.require(Role::Encoder, "get_bitrate")?;
        Ok(self.store.bitrate())
    }

    pub fn set_complexity(&mut self, complexity: i32) -> Result<()> {
        self.require(Role::Encoder, "set_complexity")?;
        if !(0..=MAX_COMPLEXITY).contains(&complexity) {
            return Err(CodecError::invalid_argument(format!(
                "complexity {} is outside 0..={}",
                complexity, MAX_COMPLEXITY
            )));
        }
        debug!(complexity, "opus: set complexity");
        self.store.store_complexity(complexity);
        Ok(())
    }

    pub fn complexity(&self) -> Result<i32> {
        self.require(Role::Encoder, "get_complexity")?;
        Ok(self.store.complexity())
    }

    pub fn set_max_bandwidth(&mut self, bandwidth: Bandwidth) -> Result<()> {
        self.require(Role::Encoder, "set_max_bandwidth")?;
        debug!(%bandwidth, "opus: set max bandwidth");
        self.store.store_max_bandwidth(bandwidth);
        Ok(())
    }

    pub fn max_bandwidth(&self) -> Result<Bandwidth> {
        self.require(Role::Encoder, "get_max_bandwidth")?;
        Ok(self.store.max_bandwidth())
    }

    pub fn set_inband_fec(&mut self, enabled: bool) -> Result<()> {
        self.require(Role::Encoder, "set_inband_fec")?;
        debug!(enabled, "opus: set inband fec");
        self.store.store_inband_fec(enabled);
        Ok(())
    }

    pub fn inband_fec(&self) -> Result<bool> {
        self.require(Role::Encoder, "get_inband_fec")?;
        Ok(self.store.inband_fec())
    }

    pub fn set_packet_loss_perc(&mut self, perc: i32) -> Result<()> {
        self.require(Role::Encoder, "set_packet_loss_perc")?;
        if !(0..=100).contains(&perc) {
            return Err(CodecError::invalid_argument(format!(
                "packet loss {}% is outside 0..=100",
                perc
            )));
        }
        debug!(perc, "opus: set packet loss percentage");
        self.store.store_packet_loss_perc(perc);
        Ok(())
    }

    pub fn packet_loss_perc(&self) -> Result<i32> {
        self.require(Role::Encoder, "get_packet_loss_perc")?;
        Ok(self.store.packet_loss_perc())
    }

    pub fn set_dtx(&mut self, enabled: bool) -> Result<()> {
        self.require(Role::Encoder, "set_dtx")?;
        debug!(enabled, "opus: set dtx");
        self.store.store_dtx(enabled);
        Ok(())
    }

    pub fn dtx(&self) -> Result<bool> {
        self.require(Role::Encoder, "get_dtx")?;
        Ok(self.store.dtx())
    }

    pub fn in_dtx(&self) -> Result<bool> {
        self.require(Role::Encoder, "get_in_dtx")?;
        Ok(self.store.in_dtx())
    }

    pub fn sample_rate(&self) -> u32 {
        self.store.sample_rate().hz()
    }

    pub fn last_packet_duration(&self) -> Result<Option<u32>> {
        self.require(Role::Decoder, "get_last_packet_duration")?;
        Ok(self.store.last_packet_duration())
    }

    pub(crate) fn observe_in_dtx(&mut self, in_dtx: bool) {
        self.store.observe_in_dtx(in_dtx);
    }

    pub(crate) fn observe_packet_duration(&mut self, samples: u32) {
        self.store.observe_packet_duration(samples);
    }

    /// Puts back a snapshot taken before a change the engine refused.
    pub(crate) fn restore(&mut self, store: ParameterStore) {
        self.store = store;
    }

    /// Restores defaults for every mutable parameter.
    pub fn reset(&mut self) {
        debug!(role = %self.role, "opus: restore default parameters");
        self.store.restore_defaults();
    }
}
