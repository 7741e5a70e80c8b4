//! Encoder and decoder sessions.
//!
//! A [`Session`] owns one [`ParameterStore`] (through its
//! [`StateController`]) and one [`CodecEngine`]. It moves through
//! `Created → Active → Destroyed`; only an active session accepts
//! operations, and a closed one fails every call with
//! [`CodecError::InvalidState`].

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::controller::StateController;
use crate::dtx::{self, DtxTracker};
use crate::engine::{self, CodecEngine};
use crate::error::{CodecError, Result};
use crate::packet::{Packet, frame_layout, sample_count};
use crate::params::{Application, Bitrate, Channels, ParameterStore, SampleRate};
use crate::toc::{Bandwidth, Configuration, FrameCode, FrameDuration, Toc};

/// Maximum packet size produced by [`Session::encode`].
pub const MAX_PACKET_SIZE: usize = 4000;

/// Which half of the codec a session is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Encoder,
    Decoder,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Encoder => write!(f, "encoder"),
            Role::Decoder => write!(f, "decoder"),
        }
    }
}

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    Created,
    Active,
    Destroyed,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::Created => write!(f, "created"),
            Lifecycle::Active => write!(f, "active"),
            Lifecycle::Destroyed => write!(f, "destroyed"),
        }
    }
}

/// Creation-time settings. None of these change after the session starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub sample_rate: SampleRate,
    #[serde(default)]
    pub channels: Channels,
    /// Ignored by decoders.
    #[serde(default)]
    pub application: Application,
}

impl SessionConfig {
    pub fn new(sample_rate: SampleRate, channels: Channels, application: Application) -> Self {
        Self {
            sample_rate,
            channels,
            application,
        }
    }
}

struct Inner {
    controller: StateController,
    engine: Box<dyn CodecEngine>,
    dtx: DtxTracker,
}

/// An encoder or decoder session.
///
/// Sessions are `Send` but not `Sync`: every operation takes `&mut self`,
/// so sharing one across threads needs a lock around it.
pub struct Session {
    role: Role,
    config: SessionConfig,
    state: Lifecycle,
    inner: Option<Inner>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("role", &self.role)
            .field("config", &self.config)
            .field("state", &self.state)
            .field("params", &self.inner.as_ref().map(|i| i.controller.store()))
            .finish()
    }
}

impl Session {
    /// Creates an encoder session on the default engine.
    pub fn encoder(config: SessionConfig) -> Result<Self> {
        Self::new(Role::Encoder, config)
    }

    /// Creates a decoder session on the default engine.
    pub fn decoder(config: SessionConfig) -> Result<Self> {
        Self::new(Role::Decoder, config)
    }

    /// Creates a session for `role` on the default engine.
    pub fn new(role: Role, config: SessionConfig) -> Result<Self> {
        let store = ParameterStore::new(config.sample_rate, config.channels, config.application);
        let engine = engine::default_engine(role, &store)?;
        Self::with_engine(role, config, engine)
    }

    /// Creates a session driving the given engine.
    pub fn with_engine(
        role: Role,
        config: SessionConfig,
        mut engine: Box<dyn CodecEngine>,
    ) -> Result<Self> {
        let store = ParameterStore::new(config.sample_rate, config.channels, config.application);
        let mut session = Self {
            role,
            config,
            state: Lifecycle::Created,
            inner: None,
        };

        engine.configure(&store)?;
        session.inner = Some(Inner {
            controller: StateController::new(role, store),
            engine,
            dtx: DtxTracker::new(),
        });
        session.state = Lifecycle::Active;

        debug!(
            %role,
            sample_rate = config.sample_rate.hz(),
            channels = config.channels.count(),
            "opus: session active"
        );
        Ok(session)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> Lifecycle {
        self.state
    }

    pub fn config(&self) -> SessionConfig {
        self.config
    }

    pub fn is_active(&self) -> bool {
        self.state == Lifecycle::Active
    }

    /// Destroys the session and releases its parameters and engine.
    ///
    /// Closing twice fails with [`CodecError::InvalidState`].
    pub fn close(&mut self) -> Result<()> {
        self.inner()?;
        self.inner = None;
        self.state = Lifecycle::Destroyed;
        debug!(role = %self.role, "opus: session destroyed");
        Ok(())
    }

    fn inner(&self) -> Result<&Inner> {
        match (&self.inner, self.state) {
            (Some(inner), Lifecycle::Active) => Ok(inner),
            _ => Err(CodecError::InvalidState(self.state)),
        }
    }

    fn inner_mut(&mut self) -> Result<&mut Inner> {
        match (&mut self.inner, self.state) {
            (Some(inner), Lifecycle::Active) => Ok(inner),
            _ => Err(CodecError::InvalidState(self.state)),
        }
    }

    fn require(&self, role: Role, op: &'static str) -> Result<()> {
        self.inner()?;
        if self.role != role {
            return Err(CodecError::Unsupported {
                op,
                role: self.role,
            });
        }
        Ok(())
    }

    /// Runs a controller setter and pushes the result to the engine.
    ///
    /// If the engine refuses the new parameters the store is rolled back.
    fn apply(&mut self, set: impl FnOnce(&mut StateController) -> Result<()>) -> Result<()> {
        let inner = self.inner_mut()?;
        let before = inner.controller.store().clone();
        set(&mut inner.controller)?;
        if let Err(e) = inner.engine.configure(inner.controller.store()) {
            inner.controller.restore(before);
            return Err(e);
        }
        Ok(())
    }

    /// Snapshot of the current parameters.
    pub fn parameters(&self) -> Result<&ParameterStore> {
        Ok(self.inner()?.controller.store())
    }

    // Encoder parameters.

    pub fn set_bitrate(&mut self, bitrate: Bitrate) -> Result<()> {
        self.apply(|c| c.set_bitrate(bitrate))
    }

    pub fn bitrate(&self) -> Result<Bitrate> {
        self.inner()?.controller.bitrate()
    }

    pub fn set_complexity(&mut self, complexity: i32) -> Result<()> {
        self.apply(|c| c.set_complexity(complexity))
    }

    pub fn complexity(&self) -> Result<i32> {
        self.inner()?.controller.complexity()
    }

    pub fn set_max_bandwidth(&mut self, bandwidth: Bandwidth) -> Result<()> {
        self.apply(|c| c.set_max_bandwidth(bandwidth))
    }

    pub fn max_bandwidth(&self) -> Result<Bandwidth> {
        self.inner()?.controller.max_bandwidth()
    }

    pub fn set_inband_fec(&mut self, enabled: bool) -> Result<()> {
        self.apply(|c| c.set_inband_fec(enabled))
    }

    pub fn inband_fec(&self) -> Result<bool> {
        self.inner()?.controller.inband_fec()
    }

    pub fn set_packet_loss_perc(&mut self, perc: i32) -> Result<()> {
        self.apply(|c| c.set_packet_loss_perc(perc))
    }

    pub fn packet_loss_perc(&self) -> Result<i32> {
        self.inner()?.controller.packet_loss_perc()
    }

    pub fn set_dtx(&mut self, enabled: bool) -> Result<()> {
        self.apply(|c| c.set_dtx(enabled))
    }

    pub fn dtx(&self) -> Result<bool> {
        self.inner()?.controller.dtx()
    }

    /// Whether the most recently encoded frame was suppressed by DTX.
    pub fn in_dtx(&self) -> Result<bool> {
        self.inner()?.controller.in_dtx()
    }

    // Both roles.

    pub fn sample_rate(&self) -> Result<u32> {
        Ok(self.inner()?.controller.sample_rate())
    }

    /// Restores default parameters and clears all coding history.
    ///
    /// If the engine fails to reset, the parameters are left as they were.
    pub fn reset_state(&mut self) -> Result<()> {
        let inner = self.inner_mut()?;
        inner.engine.reset()?;

        let before = inner.controller.store().clone();
        inner.controller.reset();
        if let Err(e) = inner.engine.configure(inner.controller.store()) {
            inner.controller.restore(before);
            return Err(e);
        }
        inner.dtx.reset();
        Ok(())
    }

    // Decoder state.

    /// Samples per channel of the last decoded or concealed packet, `None`
    /// before the first one.
    pub fn last_packet_duration(&self) -> Result<Option<u32>> {
        self.inner()?.controller.last_packet_duration()
    }

    /// Encodes one frame of interleaved PCM.
    ///
    /// `frame_size` is samples per channel and must be 2.5, 5, 10, 20, 40,
    /// 60, 80, 100 or 120 ms at the session rate.
    pub fn encode(&mut self, pcm: &[i16], frame_size: usize) -> Result<Packet> {
        let mut out = vec![0u8; MAX_PACKET_SIZE];
        let n = self.encode_to(pcm, frame_size, &mut out)?;
        out.truncate(n);
        Ok(Packet::new(out))
    }

    /// Encodes one frame into `out` and returns the packet length.
    pub fn encode_to(&mut self, pcm: &[i16], frame_size: usize, out: &mut [u8]) -> Result<usize> {
        self.require(Role::Encoder, "encode")?;
        let config = self.config;
        let inner = self.inner_mut()?;

        let fs = config.sample_rate.hz();
        let (duration, count) = frame_layout(frame_size, fs)?;
        let len = frame_size * config.channels.count();
        if pcm.len() < len {
            return Err(CodecError::invalid_argument(format!(
                "pcm holds {} samples, frame needs {}",
                pcm.len(),
                len
            )));
        }
        let pcm = &pcm[..len];

        // The tracker only advances once the frame is actually written.
        let store = inner.controller.store();
        let mut tracker = inner.dtx.clone();
        let suppress = store.dtx()
            && tracker.update(
                dtx::is_active(pcm),
                (frame_size as u64 * 1_000_000 / fs as u64) as u32,
            );

        let n = if suppress {
            let toc = Configuration::select(
                store.application(),
                store.effective_bandwidth(),
                duration,
            );
            write_dtx_packet(toc, config.channels == Channels::Stereo, count, out)?
        } else {
            inner.engine.encode(store, pcm, frame_size, out)?
        };

        inner.dtx = tracker;
        inner.controller.observe_in_dtx(suppress);
        trace!(frame_size, bytes = n, in_dtx = suppress, "opus: encoded");
        Ok(n)
    }

    /// Decodes `packet` into interleaved `pcm` and returns samples per
    /// channel.
    ///
    /// An empty packet is treated as lost and concealed across the whole of
    /// `pcm`. Invalid packets fail with [`CodecError::InvalidPacket`] and
    /// leave the session untouched.
    pub fn decode(&mut self, packet: &[u8], pcm: &mut [i16]) -> Result<usize> {
        self.require(Role::Decoder, "decode")?;
        let channels = self.config.channels.count();
        if packet.is_empty() {
            return self.decode_lost(pcm.len() / channels, pcm);
        }

        let fs = self.config.sample_rate.hz();
        let inner = self.inner_mut()?;

        let samples = sample_count(packet, fs)?;
        if pcm.len() < samples * channels {
            return Err(CodecError::BufferTooSmall {
                needed: samples * channels,
                actual: pcm.len(),
            });
        }

        let n = inner.engine.decode(Some(packet), pcm.len() / channels, pcm)?;
        inner.controller.observe_packet_duration(n as u32);
        trace!(bytes = packet.len(), samples = n, "opus: decoded");
        Ok(n)
    }

    /// Conceals one lost packet of `frame_size` samples per channel.
    pub fn decode_lost(&mut self, frame_size: usize, pcm: &mut [i16]) -> Result<usize> {
        self.require(Role::Decoder, "decode")?;
        let channels = self.config.channels.count();
        let fs = self.config.sample_rate.hz();
        let inner = self.inner_mut()?;

        let step = FrameDuration::Duration2500us.samples(fs);
        let max = step * 48;
        if frame_size == 0 || frame_size % step != 0 || frame_size > max {
            return Err(CodecError::invalid_argument(format!(
                "concealment size {} is not a multiple of 2.5ms up to 120ms at {} Hz",
                frame_size, fs
            )));
        }
        if pcm.len() < frame_size * channels {
            return Err(CodecError::BufferTooSmall {
                needed: frame_size * channels,
                actual: pcm.len(),
            });
        }

        let n = inner.engine.decode(None, frame_size, pcm)?;
        inner.controller.observe_packet_duration(n as u32);
        trace!(samples = n, "opus: concealed");
        Ok(n)
    }

    /// Decodes `packet` into a freshly allocated buffer sized for the
    /// longest legal packet.
    pub fn decode_vec(&mut self, packet: &[u8]) -> Result<Vec<i16>> {
        let max = FrameDuration::Duration20ms.samples(self.config.sample_rate.hz()) * 6;
        let channels = self.config.channels.count();
        let mut pcm = vec![0i16; max * channels];
        let n = self.decode(packet, &mut pcm)?;
        pcm.truncate(n * channels);
        Ok(pcm)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.state == Lifecycle::Active {
            debug!(role = %self.role, "opus: session dropped without close");
        }
    }
}

/// Writes the payload-free packet sent for a suppressed frame: the TOC
/// alone, or TOC plus frame count when the frame spans several 20 ms frames.
fn write_dtx_packet(
    config: Configuration,
    stereo: bool,
    count: usize,
    out: &mut [u8],
) -> Result<usize> {
    let needed = if count == 1 { 1 } else { 2 };
    if out.len() < needed {
        return Err(CodecError::BufferTooSmall {
            needed,
            actual: out.len(),
        });
    }

    if count == 1 {
        out[0] = Toc::build(config, stereo, FrameCode::One).0;
    } else {
        out[0] = Toc::build(config, stereo, FrameCode::Arbitrary).0;
        out[1] = count as u8;
    }
    Ok(needed)
}
