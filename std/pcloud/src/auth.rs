//! Login and logout.
//!
//! Both rotate the session token under its write lock, so calls that race
//! each other apply one after the other.

use crate::{
    client::{ApiRequest, ClientError, PcloudClient, succeeded},
    config::LoginSettings,
};
use pcmcp::{InvalidParams, Session, Token, Tool};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

/// Exchange email and password for an auth token and store it in `session`.
///
/// Returns pCloud's reply with the `auth` field removed. A rejected login
/// leaves the session untouched.
pub async fn login(
    client: &PcloudClient,
    session: &Session,
    settings: &LoginSettings,
    email: &str,
    password: &str,
) -> Result<Value, ClientError> {
    session
        .rotate(|current| async move {
            let request = ApiRequest::post("userinfo")
                .param("getauth", 1)
                .param("username", email)
                .param("password", password)
                .param("authexpire", settings.expire_secs)
                .param("authinactiveexpire", settings.inactive_expire_secs)
                .param("device", &settings.device);
            let mut body = client.send_with(None, request).await?;

            let issued = if succeeded(&body) {
                body.as_object_mut()
                    .and_then(|reply| reply.remove("auth"))
                    .and_then(|auth| auth.as_str().map(str::to_string))
            } else {
                None
            };
            match issued {
                Some(auth) => {
                    info!(email, "logged in to pCloud");
                    Ok::<_, ClientError>((Some(Token::Issued(auth)), body))
                }
                None => {
                    warn!(email, result = ?body.get("result"), "pCloud login rejected");
                    Ok::<_, ClientError>((current, body))
                }
            }
        })
        .await
}

/// Parameters for logging in.
#[derive(Default, Deserialize, JsonSchema)]
pub struct LoginParams {
    /// Account email. Defaults to the configured email.
    #[serde(default)]
    pub email: Option<String>,
    /// Account password. Defaults to the configured password.
    #[serde(default)]
    pub password: Option<String>,
}

pub struct Login {
    client: PcloudClient,
    settings: LoginSettings,
}

impl Login {
    pub fn new(client: PcloudClient, settings: LoginSettings) -> Self {
        Self { client, settings }
    }
}

fn pick(
    given: Option<String>,
    configured: &Option<String>,
    field: &str,
) -> Result<String, InvalidParams> {
    given
        .filter(|value| !value.is_empty())
        .or_else(|| configured.clone())
        .ok_or_else(|| InvalidParams::new(format!("no {field} given and none configured")))
}

impl Tool for Login {
    type Params = LoginParams;

    fn name(&self) -> &str {
        "login"
    }

    fn description(&self) -> &str {
        "Log in to pCloud with email and password and use the issued token for later calls"
    }

    async fn call(&self, session: &Session, params: LoginParams) -> anyhow::Result<Value> {
        let email = pick(params.email, &self.settings.email, "email")?;
        let password = pick(params.password, &self.settings.password, "password")?;
        Ok(login(&self.client, session, &self.settings, &email, &password).await?)
    }
}

/// Logout takes no parameters.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct LogoutParams {}

pub struct Logout {
    client: PcloudClient,
}

impl Logout {
    pub fn new(client: PcloudClient) -> Self {
        Self { client }
    }
}

impl Tool for Logout {
    type Params = LogoutParams;

    fn name(&self) -> &str {
        "logout"
    }

    fn description(&self) -> &str {
        "Invalidate the current pCloud token"
    }

    async fn call(&self, session: &Session, _params: LogoutParams) -> anyhow::Result<Value> {
        let client = &self.client;
        let body = session
            .rotate(|current| async move {
                let body = client
                    .send_with(current.as_ref(), ApiRequest::get("logout"))
                    .await?;
                if succeeded(&body) {
                    info!("logged out of pCloud; session token cleared");
                    Ok::<_, ClientError>((None, body))
                } else {
                    Ok::<_, ClientError>((current, body))
                }
            })
            .await?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::pick;

    #[test]
    fn explicit_credentials_win_over_configured() {
        let configured = Some("cfg@example.com".to_string());
        assert_eq!(
            pick(Some("me@example.com".into()), &configured, "email").unwrap(),
            "me@example.com"
        );
        assert_eq!(pick(None, &configured, "email").unwrap(), "cfg@example.com");
        assert_eq!(
            pick(Some(String::new()), &configured, "email").unwrap(),
            "cfg@example.com"
        );
    }

    #[test]
    fn missing_credentials_are_invalid_params() {
        let err = pick(None, &None, "password").unwrap_err();
        assert_eq!(err.0, "no password given and none configured");
    }
}
