//! XML-RPC transport for the Dashboard service.
//!
//! parse_endpoint -> Endpoint (http/https only)
//! XmlRpcClient   -> one blocking call per invocation, optional HTTP Basic-Auth
//! RemoteCall     -> seam between request building and the network
//!
//! Results come back as `serde_json::Value` so the output renderers work on a
//! single value model.
use std::fmt;
use std::time::Duration;

use base64::Engine as _;
use thiserror::Error;
use tracing::{debug, trace};
use url::Url;

use crate::cmd::shared::{ParamValue, Payload, UsageError};

/// Failure of a remote call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    /// The server answered with an XML-RPC fault.
    #[error("{message}")]
    Fault { code: i32, message: String },

    /// The request never produced a well-formed response.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Something that can invoke a named remote procedure with a payload.
pub trait RemoteCall {
    fn call(&self, method: &str, payload: &Payload) -> Result<serde_json::Value, RpcError>;
}

/// A validated service URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
}

impl Endpoint {
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn is_tls(&self) -> bool {
        self.url.scheme() == "https"
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // never echo credentials embedded in the URL
        let mut shown = self.url.clone();
        let _ = shown.set_password(None);
        write!(f, "{shown}")
    }
}

/// Parse a `--url` value. Only `http` and `https` are accepted.
pub fn parse_endpoint(raw: &str) -> Result<Endpoint, UsageError> {
    let trimmed = raw.trim();
    let invalid = |reason: &str| UsageError::InvalidEndpoint {
        url: raw.to_string(),
        reason: reason.to_string(),
    };
    if trimmed.is_empty() {
        return Err(invalid("URL is empty"));
    }
    let url = Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(Endpoint { url }),
        other => Err(invalid(&format!("unsupported scheme '{other}'"))),
    }
}

/// HTTP Basic-Auth credentials, sent as an `Authorization` header.
#[derive(Clone, PartialEq, Eq)]
pub struct HttpAuth {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for HttpAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpAuth")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Blocking XML-RPC client bound to one endpoint.
pub struct XmlRpcClient {
    endpoint: Endpoint,
    http_auth: Option<HttpAuth>,
    http: reqwest::blocking::Client,
}

impl XmlRpcClient {
    pub fn new(
        endpoint: Endpoint,
        http_auth: Option<HttpAuth>,
        timeout: Duration,
    ) -> Result<Self, RpcError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            endpoint,
            http_auth,
            http,
        })
    }
}

impl RemoteCall for XmlRpcClient {
    fn call(&self, method: &str, payload: &Payload) -> Result<serde_json::Value, RpcError> {
        debug!(
            method,
            endpoint = %self.endpoint,
            http_auth = self.http_auth.is_some(),
            "invoking remote procedure"
        );

        let request = xmlrpc::Request::new(method).arg(payload_to_xmlrpc(payload));

        let mut builder = self.http.post(self.endpoint.url().as_str());
        if let Some(auth) = &self.http_auth {
            builder = builder.basic_auth(&auth.username, Some(&auth.password));
        }

        match request.call(builder) {
            Ok(value) => {
                trace!(?value, "raw XML-RPC response");
                Ok(xmlrpc_to_json(&value))
            }
            Err(err) => match err.fault() {
                Some(fault) => Err(RpcError::Fault {
                    code: fault.fault_code,
                    message: fault.fault_string.trim().to_string(),
                }),
                None => Err(RpcError::Transport(err.to_string())),
            },
        }
    }
}

/* ---- Value Conversion ---- */

/// Build the single struct argument of a Dashboard call.
pub fn payload_to_xmlrpc(payload: &Payload) -> xmlrpc::Value {
    let members = payload
        .iter()
        .map(|(k, v)| (k.clone(), param_to_xmlrpc(v)))
        .collect();
    xmlrpc::Value::Struct(members)
}

fn param_to_xmlrpc(value: &ParamValue) -> xmlrpc::Value {
    match value {
        // <i4> where it fits, <i8> otherwise
        ParamValue::Integer(n) => match i32::try_from(*n) {
            Ok(small) => xmlrpc::Value::Int(small),
            Err(_) => xmlrpc::Value::Int64(*n),
        },
        ParamValue::Text(s) => xmlrpc::Value::String(s.clone()),
        ParamValue::Boolean(b) => xmlrpc::Value::Bool(*b),
    }
}

/// Convert an XML-RPC response value into JSON.
///
/// dateTime becomes its ISO-8601 text, base64 is re-encoded as a base64
/// string, non-finite doubles become null.
pub fn xmlrpc_to_json(value: &xmlrpc::Value) -> serde_json::Value {
    use serde_json::Value as J;
    match value {
        xmlrpc::Value::Int(n) => J::from(*n),
        xmlrpc::Value::Int64(n) => J::from(*n),
        xmlrpc::Value::Bool(b) => J::Bool(*b),
        xmlrpc::Value::String(s) => J::String(s.clone()),
        xmlrpc::Value::Double(d) => serde_json::Number::from_f64(*d)
            .map(J::Number)
            .unwrap_or(J::Null),
        xmlrpc::Value::DateTime(dt) => J::String(dt.to_string()),
        xmlrpc::Value::Base64(bytes) => {
            J::String(base64::engine::general_purpose::STANDARD.encode(bytes))
        }
        xmlrpc::Value::Struct(members) => J::Object(
            members
                .iter()
                .map(|(k, v)| (k.clone(), xmlrpc_to_json(v)))
                .collect(),
        ),
        xmlrpc::Value::Array(items) => J::Array(items.iter().map(xmlrpc_to_json).collect()),
        xmlrpc::Value::Nil => J::Null,
    }
}
