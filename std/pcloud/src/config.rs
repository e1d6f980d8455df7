//! Startup configuration.
//!
//! Every setting is a command-line flag with an environment fallback, read
//! once at startup. Secrets are never printed by `Debug`.

use crate::client::DEFAULT_API_URL;
use clap::Args;
use pcmcp::Token;
use std::fmt;

#[derive(Args, Clone)]
pub struct Config {
    /// Base URL of the pCloud API.
    #[arg(long, env = "PCLOUD_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Long-lived access token (OAuth). Takes precedence over email/password.
    #[arg(long, env = "PCLOUD_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Account email used by `login` when the call supplies none.
    #[arg(long, env = "PCLOUD_EMAIL")]
    pub email: Option<String>,

    /// Account password used by `login` when the call supplies none.
    #[arg(long, env = "PCLOUD_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Device name reported when logging in.
    #[arg(long, env = "DEVICE_NAME", default_value = "pCloud MCP Client")]
    pub device_name: String,

    /// Lifetime of a login-issued token, in seconds.
    #[arg(long, default_value_t = 30 * 86_400)]
    pub token_expire_secs: u64,

    /// Idle lifetime of a login-issued token, in seconds.
    #[arg(long, default_value_t = 7 * 86_400)]
    pub token_inactive_expire_secs: u64,

    /// Do not log in at startup even when email and password are set.
    #[arg(long)]
    pub no_auto_login: bool,

    /// Name reported by `initialize`.
    #[arg(long, env = "PCLOUD_MCP_SERVER_NAME", default_value = "pCloud MCP Server")]
    pub server_name: String,

    /// Requests handled concurrently. Responses stay in request order.
    #[arg(
        long,
        env = "PCLOUD_MCP_MAX_IN_FLIGHT",
        default_value_t = 1,
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub max_in_flight: u16,
}

impl Config {
    /// Token to seed the session with.
    pub fn initial_token(&self) -> Option<Token> {
        self.access_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .map(|token| Token::Access(token.to_string()))
    }

    /// Whether to log in before serving.
    pub fn wants_auto_login(&self) -> bool {
        !self.no_auto_login && self.initial_token().is_none() && self.credentials().is_some()
    }

    /// Configured email and password, when both are non-empty.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let email = self.email.as_deref().filter(|v| !v.is_empty())?;
        let password = self.password.as_deref().filter(|v| !v.is_empty())?;
        Some((email, password))
    }

    pub fn login_settings(&self) -> LoginSettings {
        LoginSettings {
            email: self.email.clone().filter(|v| !v.is_empty()),
            password: self.password.clone().filter(|v| !v.is_empty()),
            device: self.device_name.clone(),
            expire_secs: self.token_expire_secs,
            inactive_expire_secs: self.token_inactive_expire_secs,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            access_token: None,
            email: None,
            password: None,
            device_name: "pCloud MCP Client".into(),
            token_expire_secs: 30 * 86_400,
            token_inactive_expire_secs: 7 * 86_400,
            no_auto_login: false,
            server_name: "pCloud MCP Server".into(),
            max_in_flight: 1,
        }
    }
}

fn redact<T>(value: &Option<T>) -> &'static str {
    if value.is_some() { "<redacted>" } else { "<unset>" }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_url", &self.api_url)
            .field("access_token", &redact(&self.access_token))
            .field("email", &self.email)
            .field("password", &redact(&self.password))
            .field("device_name", &self.device_name)
            .field("token_expire_secs", &self.token_expire_secs)
            .field("token_inactive_expire_secs", &self.token_inactive_expire_secs)
            .field("no_auto_login", &self.no_auto_login)
            .field("server_name", &self.server_name)
            .field("max_in_flight", &self.max_in_flight)
            .finish()
    }
}

/// What the `login` tool needs from the configuration.
#[derive(Clone)]
pub struct LoginSettings {
    pub email: Option<String>,
    pub password: Option<String>,
    pub device: String,
    pub expire_secs: u64,
    pub inactive_expire_secs: u64,
}

impl fmt::Debug for LoginSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginSettings")
            .field("email", &self.email)
            .field("password", &redact(&self.password))
            .field("device", &self.device)
            .field("expire_secs", &self.expire_secs)
            .field("inactive_expire_secs", &self.inactive_expire_secs)
            .finish()
    }
}
