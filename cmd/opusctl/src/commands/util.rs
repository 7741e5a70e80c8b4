//! Utility functions for CLI commands.

use opusctl_cli::config::{Config, Profile, load_config};
use opusctl_cli::{Output, OutputFormat, Script, StepResult, run_ctls};
use opusctl_codec::{Role, Session, SessionConfig};

use crate::Cli;

/// Gets the global configuration.
pub fn get_config(cli: &Cli) -> anyhow::Result<Config> {
    load_config(cli.config.as_deref())
}

/// Gets the profile to use: `-p`, then the current profile, then defaults.
pub fn get_profile(cli: &Cli) -> anyhow::Result<Profile> {
    get_config(cli)?.resolve_profile(cli.profile.as_deref())
}

/// Creates a session and, for encoders, applies the profile's ctl values.
///
/// A profile value the session rejects is an error: the caller asked for a
/// configuration that cannot exist.
pub fn open_session(
    role: Role,
    config: SessionConfig,
    profile: &Profile,
) -> anyhow::Result<(Session, Vec<StepResult>)> {
    let mut session = Session::new(role, config)?;
    if role != Role::Encoder {
        return Ok((session, Vec::new()));
    }

    let applied = run_ctls(&mut session, &profile.encoder_ctls());
    if let Some(failed) = applied.iter().find(|r| !r.is_ok()) {
        anyhow::bail!(
            "profile '{}' sets {} to an invalid value: {}",
            profile.name,
            failed.request,
            failed.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok((session, applied))
}

/// Loads the `-f` script, or stdin for `-`. Returns `None` when no file
/// was given.
pub fn load_input(cli: &Cli) -> anyhow::Result<Option<Script>> {
    match cli.input.as_deref() {
        None => Ok(None),
        Some("-") => Ok(Some(opusctl_cli::load_script_from_stdin()?)),
        Some(path) => Ok(Some(opusctl_cli::load_script(path)?)),
    }
}

/// Outputs result as JSON or YAML.
pub fn output_result<T: serde::Serialize>(cli: &Cli, result: &T) -> anyhow::Result<()> {
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Yaml
    };
    Output::new(format, cli.output.clone()).write(result)
}

/// Prints success message.
pub fn print_success(msg: &str) {
    eprintln!("\x1b[32m✓\x1b[0m {}", msg);
}
