//! Scripted ctl sequences.
//!
//! A script names the session to create and lists ctl steps:
//!
//! ```yaml
//! role: encoder
//! sample_rate: 48000
//! steps:
//!   - request: SET_BITRATE
//!     value: 64000
//!   - request: GET_BITRATE
//!   - request: 4028        # raw codes work too
//! ```
//!
//! Every step runs even if an earlier one failed; failures are recorded
//! with their status code, the same way a C caller would see them.

use opusctl_codec::{
    Application, Channels, CodecError, Ctl, Reply, Request, Role, SampleRate, Session,
    SessionConfig, dispatch,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A request given by name or by numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestRef {
    Code(i32),
    Name(Request),
}

impl TryFrom<RequestRef> for Request {
    type Error = CodecError;

    fn try_from(value: RequestRef) -> Result<Self, CodecError> {
        match value {
            RequestRef::Name(request) => Ok(request),
            RequestRef::Code(code) => Request::try_from(code),
        }
    }
}

/// One ctl call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub request: RequestRef,
    /// Argument for setters; ignored otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<i32>,
}

/// A session description and the steps to run against it.
///
/// Settings left out fall back to the active profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<SampleRate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<Channels>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<Application>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Script {
    /// Merges the script's session settings over `base`.
    pub fn session_config(&self, base: SessionConfig) -> SessionConfig {
        SessionConfig::new(
            self.sample_rate.unwrap_or(base.sample_rate),
            self.channels.unwrap_or(base.channels),
            self.application.unwrap_or(base.application),
        )
    }
}

/// Outcome of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepResult {
    pub request: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arg: Option<i32>,
    pub status: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepResult {
    pub fn is_ok(&self) -> bool {
        self.status == 0
    }
}

fn record(request: String, arg: Option<i32>, result: Result<Reply, CodecError>) -> StepResult {
    match result {
        Ok(reply) => StepResult {
            request,
            arg,
            status: 0,
            value: reply.value(),
            error: None,
        },
        Err(e) => StepResult {
            request,
            arg,
            status: e.status(),
            value: None,
            error: Some(e.to_string()),
        },
    }
}

/// Runs ctls against `session`, recording every outcome.
pub fn run_ctls(session: &mut Session, ctls: &[Ctl]) -> Vec<StepResult> {
    ctls.iter()
        .map(|ctl| {
            debug!(%ctl, "ctl");
            record(ctl.request().name().to_string(), ctl.arg(), dispatch(session, *ctl))
        })
        .collect()
}

/// Runs script steps against `session`.
pub fn run_steps(session: &mut Session, steps: &[Step]) -> Vec<StepResult> {
    steps
        .iter()
        .map(|step| match Request::try_from(step.request) {
            Ok(request) => {
                let ctl = Ctl::new(request, step.value.unwrap_or(0));
                debug!(%ctl, "ctl");
                record(request.name().to_string(), ctl.arg(), dispatch(session, ctl))
            }
            Err(e) => {
                let name = match step.request {
                    RequestRef::Code(code) => code.to_string(),
                    RequestRef::Name(request) => request.name().to_string(),
                };
                record(name, step.value, Err(e))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"
role: encoder
sample_rate: 16000
steps:
  - request: SET_BITRATE
    value: 64000
  - request: GET_BITRATE
  - request: SET_COMPLEXITY
    value: 42
  - request: 4028
  - request: GET_BITRATE
  - request: GET_LAST_PACKET_DURATION
  - request: 1234
"#;

    #[test]
    fn test_parse_script() {
        let script: Script = serde_yaml::from_str(SCRIPT).unwrap();
        assert_eq!(script.role, Some(Role::Encoder));
        assert_eq!(script.steps.len(), 7);
        assert_eq!(script.steps[0].request, RequestRef::Name(Request::SetBitrate));
        assert_eq!(script.steps[3].request, RequestRef::Code(4028));

        let config = script.session_config(SessionConfig::default());
        assert_eq!(config.sample_rate, SampleRate::Hz16000);
        assert_eq!(config.channels, Channels::Mono);
    }

    #[test]
    fn test_run_steps() {
        let script: Script = serde_yaml::from_str(SCRIPT).unwrap();
        let mut session = Session::encoder(script.session_config(SessionConfig::default())).unwrap();
        let results = run_steps(&mut session, &script.steps);

        assert!(results[0].is_ok());
        assert_eq!(results[1].value, Some(64000));
        assert_eq!(results[2].status, -1);
        assert!(results[2].error.is_some());
        assert!(results[3].is_ok());
        assert_eq!(results[3].request, "RESET_STATE");
        assert_eq!(results[4].value, Some(-1000));
        assert_eq!(results[5].status, -5);
        assert_eq!(results[6].status, -5);
        assert_eq!(results[6].request, "1234");
    }

    #[test]
    fn test_run_ctls() {
        let mut session = Session::encoder(SessionConfig::default()).unwrap();
        let results = run_ctls(&mut session, &[Ctl::SetDtx(1), Ctl::GetDtx, Ctl::SetDtx(5)]);
        assert!(results[0].is_ok());
        assert_eq!(results[0].arg, Some(1));
        assert_eq!(results[1].value, Some(1));
        assert_eq!(results[2].status, -1);
    }
}
