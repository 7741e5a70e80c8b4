//! Signal-processing engines.
//!
//! A session drives exactly one engine. The engine turns PCM into packets
//! and back; everything about configuration validity, lifecycle and DTX is
//! decided by the session before the engine is called.

#[cfg(feature = "libopus")]
mod ffi;
#[cfg(feature = "libopus")]
mod libopus;
#[cfg(feature = "sim")]
mod sim;

#[cfg(feature = "libopus")]
pub use libopus::LibopusEngine;
#[cfg(feature = "sim")]
pub use sim::SimEngine;

use crate::error::Result;
use crate::params::ParameterStore;
use crate::session::Role;

/// The encoder/decoder engine behind a session.
pub trait CodecEngine: Send {
    /// Applies the current parameters. Called once at creation, after every
    /// successful setter and after a reset.
    fn configure(&mut self, params: &ParameterStore) -> Result<()>;

    /// Encodes `frame_size` samples per channel from `pcm` into `out`.
    /// Returns the packet length.
    fn encode(
        &mut self,
        params: &ParameterStore,
        pcm: &[i16],
        frame_size: usize,
        out: &mut [u8],
    ) -> Result<usize>;

    /// Decodes `packet` into `pcm`, or conceals `frame_size` samples when
    /// `packet` is `None`. Returns samples per channel written.
    fn decode(&mut self, packet: Option<&[u8]>, frame_size: usize, pcm: &mut [i16])
    -> Result<usize>;

    /// Clears all coding history.
    fn reset(&mut self) -> Result<()>;
}

/// Builds the engine compiled into this crate for `role`.
///
/// libopus wins when both engines are enabled.
#[allow(unreachable_code, unused_variables)]
pub fn default_engine(role: Role, params: &ParameterStore) -> Result<Box<dyn CodecEngine>> {
    #[cfg(feature = "libopus")]
    return Ok(Box::new(LibopusEngine::new(role, params)?));

    #[cfg(feature = "sim")]
    return Ok(Box::new(SimEngine::new(role, params)));

    Err(crate::error::CodecError::Internal(
        "no codec engine compiled in; enable `sim` or `libopus`".to_string(),
    ))
}
