/*!
settings.rs - connection settings resolved once per invocation.

Precedence for every value: command-line flag, then environment variable,
then built-in default.

  DASHBOARD_URL       fallback for --url
  DASHBOARD_USERNAME  fallback for --username
  DASHBOARD_PASSWORD  fallback for --password

HTTP Basic-Auth credentials fall back to the account credentials and are only
used when both a username and a password are known.

--timeout must lie in 1..=MAX_TIMEOUT_SECS.
*/

use std::time::Duration;

use crate::cmd::shared::{Credentials, UsageError};
use crate::rpc::{self, Endpoint, HttpAuth};

pub const DEFAULT_URL: &str = "http://localhost:8011/xmlrpc.cgi";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const MAX_TIMEOUT_SECS: u64 = 86_400;

pub const ENV_URL: &str = "DASHBOARD_URL";
pub const ENV_USERNAME: &str = "DASHBOARD_USERNAME";
pub const ENV_PASSWORD: &str = "DASHBOARD_PASSWORD";

/// Raw option values as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct SettingsInput {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub http_username: Option<String>,
    pub http_password: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub endpoint: Endpoint,
    pub credentials: Credentials,
    pub http_auth: Option<HttpAuth>,
    pub timeout: Duration,
}

impl Settings {
    /// Resolve against the process environment.
    pub fn resolve(input: &SettingsInput) -> Result<Self, UsageError> {
        Self::resolve_with(input, |key| std::env::var(key).ok())
    }

    /// Resolve using `env` as the environment lookup.
    pub fn resolve_with<F>(input: &SettingsInput, env: F) -> Result<Self, UsageError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let from_env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let url = input
            .url
            .clone()
            .or_else(|| from_env(ENV_URL))
            .unwrap_or_else(|| DEFAULT_URL.to_string());
        let endpoint = rpc::parse_endpoint(&url)?;

        let credentials = Credentials {
            login: input.username.clone().or_else(|| from_env(ENV_USERNAME)),
            password: input.password.clone().or_else(|| from_env(ENV_PASSWORD)),
        };

        let http_user = non_empty(input.http_username.clone()).or_else(|| credentials.login.clone());
        let http_pass =
            non_empty(input.http_password.clone()).or_else(|| credentials.password.clone());
        let http_auth = match (http_user, http_pass) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Some(HttpAuth { username, password })
            }
            _ => None,
        };

        let timeout_secs = input.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if !(1..=MAX_TIMEOUT_SECS).contains(&timeout_secs) {
            return Err(UsageError::InvalidTimeout {
                value: timeout_secs,
                max: MAX_TIMEOUT_SECS,
            });
        }

        Ok(Settings {
            endpoint,
            credentials,
            http_auth,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.is_empty())
}
