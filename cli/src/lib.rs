//! CLI utilities for opusctl.
//!
//! Profile configuration, ctl scripts and result output shared by the
//! command-line front end.

pub mod config;
pub mod output;
pub mod request;
pub mod script;

pub use config::{BitrateSetting, Config, Profile, load_config};
pub use output::{Output, OutputFormat};
pub use request::{RequestError, load_script, load_script_from_stdin, validate_steps};
pub use script::{Script, Step, StepResult, run_ctls, run_steps};
