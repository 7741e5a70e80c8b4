//! Opus encoder/decoder session control.
//!
//! This crate manages the lifecycle and configuration of Opus encoder and
//! decoder sessions:
//!
//! - `session`: encoder/decoder sessions and their lifecycle
//! - `params` / `controller`: the validated parameter record and its get/set operations
//! - `protocol`: the numeric ctl vocabulary and dispatch
//! - `registry`: sessions addressed by integer handles
//! - `toc` / `packet`: RFC 6716 packet inspection
//! - `engine`: the signal-processing backend (`sim` or `libopus`)
//!
//! # Example
//!
//! ```rust
//! use opusctl_codec::{Bitrate, Session, SessionConfig};
//!
//! let mut encoder = Session::encoder(SessionConfig::default())?;
//! encoder.set_bitrate(Bitrate::Bits(64000))?;
//! assert_eq!(encoder.bitrate()?, Bitrate::Bits(64000));
//!
//! encoder.reset_state()?;
//! assert_eq!(encoder.bitrate()?, Bitrate::Auto);
//! assert_eq!(encoder.sample_rate()?, 48000);
//! # Ok::<(), opusctl_codec::CodecError>(())
//! ```

pub mod controller;
pub mod dtx;
pub mod engine;
pub mod error;
pub mod packet;
pub mod params;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod toc;

pub use controller::StateController;
pub use engine::CodecEngine;
pub use error::{CodecError, Result};
pub use packet::Packet;
pub use params::{Application, Bitrate, Channels, ParameterStore, SampleRate};
pub use protocol::{Ctl, Reply, Request, dispatch};
pub use registry::{HandleId, SessionRegistry};
pub use session::{Lifecycle, Role, Session, SessionConfig};
pub use toc::{Bandwidth, FrameDuration, Toc};
