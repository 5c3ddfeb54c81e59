/*!
shared.rs - request building for Dashboard actions.

Focus:
  - split_token: "key=value" -> (key, value)
  - convert_value: raw string -> typed ParamValue per ParamKind
  - build_payload: validate tokens against an ActionSpec
  - build_request: resolve action + build payload + inject credentials
  - load_param_file: JSON / YAML object -> key=value tokens

Everything here is pure (no network). The param-file loader is the only
function that touches the filesystem.
*/

use std::collections::BTreeMap;

use thiserror::Error;

use crate::cmd::actions::{self, ActionSpec, ParamKind};

/// Payload keys carrying the Bugzilla account credentials.
pub const LOGIN_KEY: &str = "Bugzilla_login";
pub const PASSWORD_KEY: &str = "Bugzilla_password";

const TRUE_LITERALS: [&str; 3] = ["1", "true", "yes"];
const FALSE_LITERALS: [&str; 3] = ["0", "false", "no"];

/* ---- Errors ---- */

/// Locally detected problems with the command line. All of these terminate
/// the process with usage text and exit status 1.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    #[error("Must specify action")]
    MissingAction,

    #[error("Argument '{0}' is not in key=value format")]
    MalformedArgument(String),

    #[error("Invalid action '{0}'")]
    UnknownAction(String),

    #[error("Action '{action}' does not take '{param}' argument")]
    UnknownParameter { action: String, param: String },

    #[error("Argument '{param}': '{value}' is not a valid integer")]
    InvalidInteger { param: String, value: String },

    #[error("Argument '{param}': '{value}' is not a valid boolean value")]
    InvalidBoolean { param: String, value: String },

    #[error("Action '{action}' requires '{param}' argument")]
    MissingRequiredParameter { action: String, param: String },

    #[error("Param file '{path}': {reason}")]
    ParamFile { path: String, reason: String },

    #[error("Invalid URL '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("Timeout must be between 1 and {max} seconds, got {value}")]
    InvalidTimeout { value: u64, max: u64 },
}

/* ---- Data Structures ---- */

/// A converted parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Integer(i64),
    Text(String),
    Boolean(bool),
}

/// Validated arguments for one remote call, keyed by parameter name.
pub type Payload = BTreeMap<String, ParamValue>;

/// Bugzilla account credentials forwarded inside every payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub login: Option<String>,
    pub password: Option<String>,
}

/// A fully validated remote call, ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub action: &'static ActionSpec,
    pub payload: Payload,
}

impl Request {
    pub fn method_name(&self) -> String {
        self.action.method_name()
    }
}

/* ---- Token Parsing / Conversion ---- */

/// Split a `key=value` token on the first `=`.
pub fn split_token(token: &str) -> Result<(&str, &str), UsageError> {
    token
        .split_once('=')
        .ok_or_else(|| UsageError::MalformedArgument(token.to_string()))
}

/// Convert a raw value according to the declared parameter kind.
pub fn convert_value(param: &str, raw: &str, kind: ParamKind) -> Result<ParamValue, UsageError> {
    match kind {
        ParamKind::Text => Ok(ParamValue::Text(raw.to_string())),
        ParamKind::Integer => raw
            .trim()
            .parse::<i64>()
            .map(ParamValue::Integer)
            .map_err(|_| UsageError::InvalidInteger {
                param: param.to_string(),
                value: raw.to_string(),
            }),
        ParamKind::Boolean => parse_bool(raw)
            .map(ParamValue::Boolean)
            .ok_or_else(|| UsageError::InvalidBoolean {
                param: param.to_string(),
                value: raw.to_string(),
            }),
    }
}

/// Case-insensitive match against the accepted boolean literals.
pub fn parse_bool(raw: &str) -> Option<bool> {
    let norm = raw.trim().to_ascii_lowercase();
    if TRUE_LITERALS.contains(&norm.as_str()) {
        Some(true)
    } else if FALSE_LITERALS.contains(&norm.as_str()) {
        Some(false)
    } else {
        None
    }
}

/* ---- Payload Building ---- */

/// Validate `tokens` against `action` and build its payload.
///
/// Tokens are processed in order; a repeated key keeps the last value.
/// Required parameters are checked only after every token was accepted.
/// Defaults are never injected.
pub fn build_payload<'a, I>(action: &ActionSpec, tokens: I) -> Result<Payload, UsageError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut payload = Payload::new();

    for token in tokens {
        let (key, raw) = split_token(token)?;
        let spec = action
            .param(key)
            .ok_or_else(|| UsageError::UnknownParameter {
                action: action.name.to_string(),
                param: key.to_string(),
            })?;
        let value = convert_value(key, raw, spec.kind)?;
        payload.insert(key.to_string(), value);
    }

    if let Some(missing) = action
        .params
        .iter()
        .find(|p| p.required && !payload.contains_key(p.name))
    {
        return Err(UsageError::MissingRequiredParameter {
            action: action.name.to_string(),
            param: missing.name.to_string(),
        });
    }

    Ok(payload)
}

/// Add the account credentials to a validated payload. Absent values are
/// left out rather than sent empty.
pub fn apply_credentials(payload: &mut Payload, credentials: &Credentials) {
    if let Some(login) = &credentials.login {
        payload.insert(LOGIN_KEY.to_string(), ParamValue::Text(login.clone()));
    }
    if let Some(password) = &credentials.password {
        payload.insert(PASSWORD_KEY.to_string(), ParamValue::Text(password.clone()));
    }
}

/// Resolve `action_name`, validate `tokens`, and attach `credentials`.
pub fn build_request<'a, I>(
    action_name: Option<&str>,
    tokens: I,
    credentials: &Credentials,
) -> Result<Request, UsageError>
where
    I: IntoIterator<Item = &'a str>,
{
    let name = action_name.ok_or(UsageError::MissingAction)?;
    let action =
        actions::resolve(name).ok_or_else(|| UsageError::UnknownAction(name.to_string()))?;
    let mut payload = build_payload(action, tokens)?;
    apply_credentials(&mut payload, credentials);
    Ok(Request { action, payload })
}

/* ---- Parameter File Loading ---- */

/// Read a JSON (or YAML, by extension) object and turn each entry into a
/// `key=value` token. String values are taken verbatim, anything else is
/// stringified (`5`, `true`, ...).
pub fn load_param_file(path: &str) -> Result<Vec<String>, UsageError> {
    let fail = |reason: String| UsageError::ParamFile {
        path: path.to_string(),
        reason,
    };

    let raw = std::fs::read_to_string(path).map_err(|e| fail(e.to_string()))?;
    let lower = path.to_ascii_lowercase();

    let value: serde_json::Value = if lower.ends_with(".yaml") || lower.ends_with(".yml") {
        let yaml_v: serde_yaml::Value =
            serde_yaml::from_str(&raw).map_err(|e| fail(format!("invalid YAML: {e}")))?;
        serde_json::to_value(yaml_v).map_err(|e| fail(format!("unsupported YAML: {e}")))?
    } else {
        serde_json::from_str(&raw).map_err(|e| fail(format!("invalid JSON: {e}")))?
    };

    let obj = value
        .as_object()
        .ok_or_else(|| fail("root must be an object".to_string()))?;

    Ok(obj
        .iter()
        .map(|(k, v)| match v {
            serde_json::Value::String(s) => format!("{k}={s}"),
            other => format!("{k}={other}"),
        })
        .collect())
}

/* ---- Tests ---- */

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cmd::actions::ACTIONS;
    use std::path::PathBuf;

    /// Param file in the temp dir, unique per process, removed on drop.
    pub(crate) struct TempParamFile(PathBuf);

    impl TempParamFile {
        pub(crate) fn new(name: &str, contents: &str) -> Self {
            let path = std::env::temp_dir()
                .join(format!("dashboard_client_{}_{name}", std::process::id()));
            std::fs::write(&path, contents).unwrap();
            TempParamFile(path)
        }

        pub(crate) fn path(&self) -> String {
            self.0.to_string_lossy().into_owned()
        }
    }

    impl Drop for TempParamFile {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.0);
        }
    }

    fn save_overlay() -> &'static ActionSpec {
        actions::resolve("save_overlay").unwrap()
    }

    #[test]
    fn split_on_first_equals() {
        assert_eq!(split_token("a=b=c").unwrap(), ("a", "b=c"));
        assert_eq!(split_token("a=").unwrap(), ("a", ""));
        assert_eq!(
            split_token("novalue").unwrap_err(),
            UsageError::MalformedArgument("novalue".into())
        );
    }

    #[test]
    fn boolean_literals_case_insensitive() {
        for t in ["1", "true", "TRUE", "True", "yes", "YeS", " yes "] {
            assert_eq!(parse_bool(t), Some(true), "{t}");
        }
        for f in ["0", "false", "FALSE", "no", "No"] {
            assert_eq!(parse_bool(f), Some(false), "{f}");
        }
        for bad in ["", "y", "n", "on", "off", "2", "truee", "nope"] {
            assert_eq!(parse_bool(bad), None, "{bad}");
        }
    }

    #[test]
    fn integer_conversion() {
        assert_eq!(
            convert_value("n", "42", ParamKind::Integer).unwrap(),
            ParamValue::Integer(42)
        );
        assert_eq!(
            convert_value("n", "-7", ParamKind::Integer).unwrap(),
            ParamValue::Integer(-7)
        );
        assert_eq!(
            convert_value("n", "x42", ParamKind::Integer).unwrap_err(),
            UsageError::InvalidInteger {
                param: "n".into(),
                value: "x42".into()
            }
        );
        assert!(convert_value("n", "4.2", ParamKind::Integer).is_err());
    }

    #[test]
    fn text_passes_through() {
        assert_eq!(
            convert_value("t", "  spaced = text ", ParamKind::Text).unwrap(),
            ParamValue::Text("  spaced = text ".into())
        );
    }

    #[test]
    fn wrong_kind_rejected_for_every_declared_param() {
        for action in ACTIONS {
            for p in action.params {
                let token = format!("{}=not-a-value", p.name);
                let result = build_payload(action, [token.as_str()]);
                match p.kind {
                    ParamKind::Integer => assert!(
                        matches!(result, Err(UsageError::InvalidInteger { .. })),
                        "{}.{}",
                        action.name,
                        p.name
                    ),
                    ParamKind::Boolean => assert!(
                        matches!(result, Err(UsageError::InvalidBoolean { .. })),
                        "{}.{}",
                        action.name,
                        p.name
                    ),
                    ParamKind::Text => assert!(
                        !matches!(
                            result,
                            Err(UsageError::InvalidInteger { .. } | UsageError::InvalidBoolean { .. })
                        ),
                        "text accepts any value"
                    ),
                }
            }
        }
    }

    #[test]
    fn unknown_parameter_rejected() {
        let err = build_payload(save_overlay(), ["shared=true"]).unwrap_err();
        assert_eq!(
            err,
            UsageError::UnknownParameter {
                action: "save_overlay".into(),
                param: "shared".into()
            }
        );
    }

    #[test]
    fn missing_required_parameter() {
        let err = build_payload(save_overlay(), ["overlay_shared=true", "overlay_name=test"])
            .unwrap_err();
        assert_eq!(
            err,
            UsageError::MissingRequiredParameter {
                action: "save_overlay".into(),
                param: "overlay_description".into()
            }
        );
    }

    #[test]
    fn optional_parameter_absent_without_default_injection() {
        let payload = build_payload(
            save_overlay(),
            ["overlay_name=test", "overlay_description=demo"],
        )
        .unwrap();
        assert_eq!(payload.len(), 2);
        assert!(!payload.contains_key("overlay_shared"));
    }

    #[test]
    fn last_repeated_key_wins() {
        let payload = build_payload(
            save_overlay(),
            [
                "overlay_name=first",
                "overlay_description=d",
                "overlay_name=second",
            ],
        )
        .unwrap();
        assert_eq!(
            payload.get("overlay_name"),
            Some(&ParamValue::Text("second".into()))
        );
    }

    #[test]
    fn build_request_injects_credentials() {
        let creds = Credentials {
            login: Some("alice@example.org".into()),
            password: Some("s3cret".into()),
        };
        let req = build_request(
            Some("load_overlay"),
            ["overlay_user_id=3", "overlay_id=14"],
            &creds,
        )
        .unwrap();
        assert_eq!(req.method_name(), "Dashboard.load_overlay");
        assert_eq!(req.payload.get("overlay_id"), Some(&ParamValue::Integer(14)));
        assert_eq!(
            req.payload.get(LOGIN_KEY),
            Some(&ParamValue::Text("alice@example.org".into()))
        );
        assert_eq!(
            req.payload.get(PASSWORD_KEY),
            Some(&ParamValue::Text("s3cret".into()))
        );
    }

    #[test]
    fn build_request_without_credentials_omits_keys() {
        let req = build_request(Some("get_overlays"), [], &Credentials::default()).unwrap();
        assert!(req.payload.is_empty());
    }

    #[test]
    fn credentials_do_not_bypass_validation() {
        let err = build_request(
            Some("get_overlays"),
            ["Bugzilla_login=mallory"],
            &Credentials::default(),
        )
        .unwrap_err();
        assert!(matches!(err, UsageError::UnknownParameter { .. }));
    }

    #[test]
    fn build_request_action_errors() {
        let creds = Credentials::default();
        assert_eq!(
            build_request(None, [], &creds).unwrap_err(),
            UsageError::MissingAction
        );
        assert_eq!(
            build_request(Some("nuke"), [], &creds).unwrap_err(),
            UsageError::UnknownAction("nuke".into())
        );
    }

    #[test]
    fn param_file_json_entries_become_tokens() {
        let file = TempParamFile::new(
            "params.json",
            r#"{ "overlay_id": 5, "overlay_user_id": "2" }"#,
        );
        let mut tokens = load_param_file(&file.path()).unwrap();
        tokens.sort();
        assert_eq!(tokens, vec!["overlay_id=5", "overlay_user_id=2"]);
    }

    #[test]
    fn param_file_yaml_entries_become_tokens() {
        let file = TempParamFile::new(
            "params.yaml",
            "overlay_shared: false\noverlay_name: team board\n",
        );
        let mut tokens = load_param_file(&file.path()).unwrap();
        tokens.sort();
        assert_eq!(
            tokens,
            vec!["overlay_name=team board", "overlay_shared=false"]
        );
    }

    #[test]
    fn param_file_must_be_object() {
        let path = {
            let file = TempParamFile::new("array.json", "[1, 2]");
            let err = load_param_file(&file.path()).unwrap_err();
            assert!(matches!(err, UsageError::ParamFile { .. }));
            file.path()
        };
        assert!(!std::path::Path::new(&path).exists(), "temp file removed on drop");
    }

    #[test]
    fn param_file_missing_is_usage_error() {
        let err = load_param_file("/nonexistent/dashboard_params.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/dashboard_params.json"));
    }
}
