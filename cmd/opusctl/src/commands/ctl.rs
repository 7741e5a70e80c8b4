//! Ctl command: run requests against a fresh session.

use clap::{Args, ValueEnum};
use opusctl_cli::script::{RequestRef, Step, StepResult, run_steps};
use opusctl_cli::validate_steps;
use opusctl_codec::{ParameterStore, Request, Role};
use serde::Serialize;
use tracing::debug;

use super::{get_profile, load_input, open_session, output_result};
use crate::Cli;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RoleArg {
    Encoder,
    Decoder,
}

impl From<RoleArg> for Role {
    fn from(value: RoleArg) -> Self {
        match value {
            RoleArg::Encoder => Role::Encoder,
            RoleArg::Decoder => Role::Decoder,
        }
    }
}

/// Run ctl requests against a fresh session.
///
/// Requests come from the command line as `NAME[=VALUE]` (for example
/// `SET_BITRATE=64000 GET_BITRATE`) or from a script given with -f.
/// Command-line requests run after the script's steps.
#[derive(Args)]
pub struct CtlCommand {
    /// Session role (overrides the script)
    #[arg(long, value_enum)]
    role: Option<RoleArg>,

    /// Requests as NAME[=VALUE]; NAME may also be a numeric code
    #[arg(value_parser = parse_step)]
    requests: Vec<Step>,

    /// List the known requests and exit
    #[arg(long)]
    list: bool,
}

#[derive(Serialize)]
struct CtlReport<'a> {
    role: Role,
    sample_rate: u32,
    channels: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    profile: Vec<StepResult>,
    results: Vec<StepResult>,
    parameters: &'a ParameterStore,
}

#[derive(Serialize)]
struct RequestInfo {
    name: &'static str,
    code: i32,
    direction: String,
    role: String,
}

fn parse_step(s: &str) -> Result<Step, String> {
    let (name, value) = match s.split_once('=') {
        Some((name, value)) => {
            let value = value
                .trim()
                .parse::<i32>()
                .map_err(|_| format!("'{}' is not an integer", value))?;
            (name.trim(), Some(value))
        }
        None => (s.trim(), None),
    };

    let request = match name.parse::<i32>() {
        Ok(code) => RequestRef::Code(code),
        Err(_) => {
            let upper = name.to_uppercase().replace('-', "_");
            let upper = upper.strip_prefix("OPUS_").unwrap_or(&upper);
            let request = Request::ALL
                .into_iter()
                .find(|r| r.name() == upper)
                .ok_or_else(|| format!("unknown request '{}'", name))?;
            RequestRef::Name(request)
        }
    };
    Ok(Step { request, value })
}

impl CtlCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        if self.list {
            let list: Vec<_> = Request::ALL
                .into_iter()
                .map(|r| RequestInfo {
                    name: r.name(),
                    code: r.code(),
                    direction: format!("{:?}", r.direction()).to_lowercase(),
                    role: r.role().map_or("both".to_string(), |role| role.to_string()),
                })
                .collect();
            return output_result(cli, &list);
        }

        let profile = get_profile(cli)?;
        let mut script = load_input(cli)?.unwrap_or_default();
        validate_steps(&self.requests)?;
        script.steps.extend(self.requests.iter().cloned());
        if script.steps.is_empty() {
            anyhow::bail!("no requests given; pass NAME[=VALUE] arguments or a script with -f");
        }

        let role = self
            .role
            .map(Role::from)
            .or(script.role)
            .unwrap_or(Role::Encoder);
        let config = script.session_config(profile.session_config());
        debug!(%role, ?config, steps = script.steps.len(), "ctl: opening session");

        let (mut session, applied) = open_session(role, config, &profile)?;
        let results = run_steps(&mut session, &script.steps);

        let report = CtlReport {
            role,
            sample_rate: config.sample_rate.hz(),
            channels: config.channels.count(),
            profile: applied,
            results,
            parameters: session.parameters()?,
        };
        output_result(cli, &report)?;
        session.close()?;
        Ok(())
    }
}
