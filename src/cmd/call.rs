/*!
`call.rs`

Invokes one Dashboard action and prints its result.

Flow:
  1. Resolve settings (flags > env > defaults)
  2. Collect key=value tokens (param file first, command line overrides)
  3. Resolve the action and build the payload (plus credentials)
  4. Construct the XML-RPC client and invoke `Dashboard.<action>`
  5. Render the result (pretty | json | shell) unless --quiet

Steps 1-3 never touch the network; every usage error surfaces before a
client exists.

Errors are returned through `anyhow` carrying either a `UsageError` or an
`RpcError`; `main` decides what to print and the exit status.
*/

use std::io::{self, Write};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use tracing::debug;

use crate::cmd::output::{self, OutputFormat};
use crate::cmd::settings::{Settings, SettingsInput};
use crate::cmd::shared::{self, Request};
use crate::rpc::{RemoteCall, XmlRpcClient};

/* ---- Argument Struct ---- */

#[derive(Args, Debug, Clone, Default)]
pub struct CallArgs {
    /// URL to Bugzilla xmlrpc.cgi [env: DASHBOARD_URL] [default: http://localhost:8011/xmlrpc.cgi]
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// Username for Bugzilla account [env: DASHBOARD_USERNAME]
    #[arg(long)]
    pub username: Option<String>,

    /// Password for Bugzilla account [env: DASHBOARD_PASSWORD]
    #[arg(long)]
    pub password: Option<String>,

    /// Optional username for HTTP authentication (defaults to --username)
    #[arg(long = "http-username", alias = "http_username", value_name = "USERNAME")]
    pub http_username: Option<String>,

    /// Optional password for HTTP authentication (defaults to --password)
    #[arg(long = "http-password", alias = "http_password", value_name = "PASSWORD")]
    pub http_password: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
    pub format: OutputFormat,

    /// Load key=value arguments from a JSON or YAML object; command-line arguments win
    #[arg(long = "param-file", value_name = "PATH")]
    pub param_file: Option<String>,

    /// Request timeout in seconds (1-86400) [default: 30]
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Remote action to invoke
    #[arg(value_name = "ACTION")]
    pub action: Option<String>,

    /// Action arguments
    #[arg(value_name = "KEY=VALUE")]
    pub params: Vec<String>,
}

impl CallArgs {
    fn settings_input(&self) -> SettingsInput {
        SettingsInput {
            url: self.url.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            http_username: self.http_username.clone(),
            http_password: self.http_password.clone(),
            timeout_secs: self.timeout,
        }
    }
}

/* ---- Public Entry Point ---- */

pub fn execute_call(args: CallArgs, quiet: bool) -> Result<()> {
    let settings = Settings::resolve(&args.settings_input())?;
    let request = prepare(&args, &settings)?;

    debug!(
        endpoint = %settings.endpoint,
        tls = settings.endpoint.is_tls(),
        timeout = ?settings.timeout,
        "settings resolved"
    );

    let client = XmlRpcClient::new(
        settings.endpoint.clone(),
        settings.http_auth.clone(),
        settings.timeout,
    )?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    dispatch(&client, &request, args.format, quiet, &mut out)
}

/// Collect tokens and build the validated request. No network access.
pub fn prepare(args: &CallArgs, settings: &Settings) -> Result<Request> {
    let mut tokens: Vec<String> = match &args.param_file {
        Some(path) => shared::load_param_file(path)?,
        None => Vec::new(),
    };
    // later tokens overwrite earlier ones, so command-line values win
    tokens.extend(args.params.iter().cloned());

    let request = shared::build_request(
        args.action.as_deref(),
        tokens.iter().map(String::as_str),
        &settings.credentials,
    )?;
    debug!(
        action = request.action.name,
        params = request.payload.len(),
        "request built"
    );
    Ok(request)
}

/// Send `request` through `client` and render the result to `out`.
pub fn dispatch<C, W>(
    client: &C,
    request: &Request,
    format: OutputFormat,
    quiet: bool,
    out: &mut W,
) -> Result<()>
where
    C: RemoteCall,
    W: Write,
{
    let method = request.method_name();
    let started = Instant::now();
    let result = client.call(&method, &request.payload);
    debug!(
        method = %method,
        elapsed_ms = started.elapsed().as_millis() as u64,
        ok = result.is_ok(),
        "call finished"
    );
    let value = result?;

    if quiet {
        return Ok(());
    }
    output::render(format, request.action.name, &value, out)
        .with_context(|| format!("failed to write {format} output"))?;
    out.flush().context("failed to flush output")
}

/* ---- Tests ---- */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::shared::tests::TempParamFile;
    use crate::cmd::shared::{LOGIN_KEY, ParamValue, Payload, UsageError};
    use crate::rpc::RpcError;
    use serde_json::json;
    use std::cell::RefCell;

    /// Records calls and answers with a canned result.
    struct FakeRemote {
        reply: std::result::Result<serde_json::Value, RpcError>,
        calls: RefCell<Vec<(String, Payload)>>,
    }

    impl FakeRemote {
        fn answering(reply: std::result::Result<serde_json::Value, RpcError>) -> Self {
            Self {
                reply,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl RemoteCall for FakeRemote {
        fn call(
            &self,
            method: &str,
            payload: &Payload,
        ) -> std::result::Result<serde_json::Value, RpcError> {
            self.calls
                .borrow_mut()
                .push((method.to_string(), payload.clone()));
            self.reply.clone()
        }
    }

    fn args(action: &str, params: &[&str]) -> CallArgs {
        CallArgs {
            username: Some("alice".into()),
            password: Some("pw".into()),
            action: Some(action.to_string()),
            params: params.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn settings_for(args: &CallArgs) -> Settings {
        Settings::resolve_with(&args.settings_input(), |_| None).unwrap()
    }

    fn usage_error(err: &anyhow::Error) -> &UsageError {
        err.downcast_ref::<UsageError>()
            .expect("expected a usage error")
    }

    #[test]
    fn save_overlay_missing_description_fails_before_any_call() {
        let a = args("save_overlay", &["overlay_shared=true", "overlay_name=test"]);
        let settings = settings_for(&a);
        let err = prepare(&a, &settings).unwrap_err();
        assert_eq!(
            usage_error(&err),
            &UsageError::MissingRequiredParameter {
                action: "save_overlay".into(),
                param: "overlay_description".into()
            }
        );
    }

    #[test]
    fn successful_call_renders_shell() {
        let a = args("get_overlays", &[]);
        let request = prepare(&a, &settings_for(&a)).unwrap();
        let remote = FakeRemote::answering(Ok(json!([{"id": 4, "name": "ops"}])));
        let mut out = Vec::new();

        dispatch(&remote, &request, OutputFormat::Shell, false, &mut out).unwrap();

        let calls = remote.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "Dashboard.get_overlays");
        assert_eq!(
            calls[0].1.get(LOGIN_KEY),
            Some(&ParamValue::Text("alice".into()))
        );
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "get_overlays_length=1\n\
             get_overlays_0_keys=\"get_overlays_0_id get_overlays_0_name\"\n\
             get_overlays_0_id=4\n\
             get_overlays_0_name=ops\n"
        );
    }

    #[test]
    fn quiet_suppresses_output() {
        let a = args("clear_workspace", &[]);
        let request = prepare(&a, &settings_for(&a)).unwrap();
        let remote = FakeRemote::answering(Ok(json!({"status": "ok"})));
        let mut out = Vec::new();
        dispatch(&remote, &request, OutputFormat::Json, true, &mut out).unwrap();
        assert!(out.is_empty());
        assert_eq!(remote.calls.borrow().len(), 1);
    }

    #[test]
    fn fault_is_surfaced_and_nothing_rendered() {
        let a = args("load_overlay", &["overlay_user_id=1", "overlay_id=99"]);
        let request = prepare(&a, &settings_for(&a)).unwrap();
        let remote = FakeRemote::answering(Err(RpcError::Fault {
            code: 32000,
            message: "Overlay 99 does not exist".into(),
        }));
        let mut out = Vec::new();
        let err = dispatch(&remote, &request, OutputFormat::Pretty, false, &mut out).unwrap_err();
        assert!(out.is_empty());
        assert!(matches!(
            err.downcast_ref::<RpcError>(),
            Some(RpcError::Fault { code: 32000, .. })
        ));
    }

    #[test]
    fn param_file_overridden_by_command_line() {
        let file = TempParamFile::new(
            "call_params.json",
            r#"{"overlay_name": "from-file", "overlay_description": "file desc"}"#,
        );
        let mut a = args("save_overlay", &["overlay_name=from-cli"]);
        a.param_file = Some(file.path());

        let request = prepare(&a, &settings_for(&a)).unwrap();
        assert_eq!(
            request.payload.get("overlay_name"),
            Some(&ParamValue::Text("from-cli".into()))
        );
        assert_eq!(
            request.payload.get("overlay_description"),
            Some(&ParamValue::Text("file desc".into()))
        );
    }

    #[test]
    fn missing_action_is_usage_error() {
        let a = CallArgs::default();
        let err = prepare(&a, &settings_for(&a)).unwrap_err();
        assert_eq!(usage_error(&err), &UsageError::MissingAction);
    }

    #[test]
    fn malformed_token_is_usage_error() {
        let a = args("get_feed", &["https://example.org/feed.rss"]);
        let err = prepare(&a, &settings_for(&a)).unwrap_err();
        assert!(matches!(
            usage_error(&err),
            UsageError::MalformedArgument(_)
        ));
    }
}
