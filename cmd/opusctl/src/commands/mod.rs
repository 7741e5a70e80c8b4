//! Command implementations for opusctl.

mod config;
mod ctl;
mod probe;
mod simulate;
mod util;

pub use config::ConfigCommand;
pub use ctl::CtlCommand;
pub use probe::ProbeCommand;
pub use simulate::SimulateCommand;
pub(crate) use util::*;
