//! Loading ctl scripts from files or stdin.
//!
//! A script is parsed as YAML or JSON, then checked step by step before
//! anything runs. Raw numeric codes are passed through unchecked so a
//! script can exercise the unknown-request path.

use opusctl_codec::Request;
use opusctl_codec::protocol::Direction;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use thiserror::Error;

use crate::script::{RequestRef, Script, Step};

/// Error type for script loading.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("failed to read script: {0}")]
    ReadFile(#[from] io::Error),
    #[error("failed to parse YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),
    #[error("failed to parse JSON: {0}")]
    ParseJson(#[from] serde_json::Error),
    #[error("step {index} ({request}): {reason}")]
    InvalidStep {
        index: usize,
        request: &'static str,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Yaml,
    Json,
}

impl Format {
    fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// JSON documents are objects; anything else is read as YAML.
    fn sniff(data: &[u8]) -> Self {
        match data.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') => Self::Json,
            _ => Self::Yaml,
        }
    }
}

/// Loads and validates a script file.
pub fn load_script(path: impl AsRef<Path>) -> Result<Script, RequestError> {
    let data = fs::read(path.as_ref())?;
    parse_script(&data, path.as_ref())
}

/// Loads and validates a script from stdin.
pub fn load_script_from_stdin() -> Result<Script, RequestError> {
    let mut data = Vec::new();
    io::stdin().read_to_end(&mut data)?;
    parse_with(&data, Format::sniff(&data))
}

/// Parses and validates script data. The format follows the file
/// extension, or the content when the extension is not recognized.
pub fn parse_script(data: &[u8], path: impl AsRef<Path>) -> Result<Script, RequestError> {
    let format = Format::from_path(path.as_ref()).unwrap_or_else(|| Format::sniff(data));
    parse_with(data, format)
}

fn parse_with(data: &[u8], format: Format) -> Result<Script, RequestError> {
    let script: Script = match format {
        Format::Yaml => serde_yaml::from_slice(data)?,
        Format::Json => serde_json::from_slice(data)?,
    };
    validate_steps(&script.steps)?;
    Ok(script)
}

/// Checks that setters carry a value and that nothing else does.
pub fn validate_steps(steps: &[Step]) -> Result<(), RequestError> {
    for (index, step) in steps.iter().enumerate() {
        let request = match step.request {
            RequestRef::Name(request) => request,
            RequestRef::Code(code) => match Request::try_from(code) {
                Ok(request) => request,
                Err(_) => continue,
            },
        };
        let reason = match (request.direction(), step.value) {
            (Direction::Set, None) => "a value is required",
            (Direction::Get | Direction::Action, Some(_)) => "takes no value",
            _ => continue,
        };
        return Err(RequestError::InvalidStep {
            index,
            request: request.name(),
            reason,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use opusctl_codec::Role;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_yaml() {
        let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
        writeln!(
            file,
            "role: decoder\nsteps:\n  - request: SET_COMPLEXITY\n    value: 9\n  - request: GET_SAMPLE_RATE"
        )
        .unwrap();

        let script = load_script(file.path()).unwrap();
        assert_eq!(script.role, Some(Role::Decoder));
        assert_eq!(script.steps.len(), 2);
        assert_eq!(script.steps[0].value, Some(9));
    }

    #[test]
    fn test_load_json() {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        writeln!(
            file,
            r#"{{"steps": [{{"request": "SET_DTX", "value": 1}}, {{"request": 4017}}]}}"#
        )
        .unwrap();

        let script = load_script(file.path()).unwrap();
        assert!(script.role.is_none());
        assert_eq!(script.steps[1].request, RequestRef::Code(4017));
    }

    #[test]
    fn test_parse_unknown_extension() {
        let yaml = b"steps:\n  - request: GET_BITRATE";
        assert_eq!(parse_script(yaml, "script.txt").unwrap().steps.len(), 1);

        let json = br#"  {"steps": [{"request": "RESET_STATE"}]}"#;
        assert_eq!(parse_script(json, "script").unwrap().steps.len(), 1);
    }

    #[test]
    fn test_parse_invalid() {
        let result = parse_script(b"steps: [{{{{", "script.yaml");
        assert!(matches!(result, Err(RequestError::ParseYaml(_))));

        let result = parse_script(b"{\"steps\": ", "script.json");
        assert!(matches!(result, Err(RequestError::ParseJson(_))));
    }

    #[test]
    fn test_setter_without_value() {
        let data = b"steps:\n  - request: GET_BITRATE\n  - request: SET_BITRATE";
        let err = parse_script(data, "script.yaml").unwrap_err();
        assert!(matches!(
            err,
            RequestError::InvalidStep {
                index: 1,
                request: "SET_BITRATE",
                ..
            }
        ));
        assert_eq!(err.to_string(), "step 1 (SET_BITRATE): a value is required");

        // Codes are checked by what they resolve to.
        let data = b"steps:\n  - request: 4002";
        assert!(parse_script(data, "script.yaml").is_err());
    }

    #[test]
    fn test_value_on_getter_or_action() {
        let data = b"steps:\n  - request: GET_DTX\n    value: 1";
        assert!(matches!(
            parse_script(data, "script.yaml"),
            Err(RequestError::InvalidStep { index: 0, request: "GET_DTX", .. })
        ));

        let data = b"steps:\n  - request: 4028\n    value: 0";
        assert!(matches!(
            parse_script(data, "script.yaml"),
            Err(RequestError::InvalidStep { request: "RESET_STATE", .. })
        ));
    }

    #[test]
    fn test_unknown_code_passes() {
        let data = b"steps:\n  - request: 1234\n    value: 7\n  - request: 1235";
        let script = parse_script(data, "script.yaml").unwrap();
        assert_eq!(script.steps.len(), 2);
    }
}
