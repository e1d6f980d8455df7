//! Thin async client for the pCloud HTTP API.
//!
//! Every call is a GET or POST to `<base>/<endpoint>` with query parameters
//! plus the session's auth parameter. Responses are decoded as JSON and
//! returned untouched; pCloud reports its own failures in the body
//! (`"result": <nonzero>`), which callers forward as-is.

use pcmcp::{Session, Token};
use reqwest::{Method, Url, multipart::Form};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Default pCloud API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.pcloud.com";

/// Failure to obtain a JSON body from pCloud.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("invalid API url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to build HTTP client")]
    Build(#[source] reqwest::Error),

    #[error("request to '{endpoint}' failed")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("'{endpoint}' returned a non-JSON body (HTTP {status})")]
    Decode {
        endpoint: String,
        status: u16,
        #[source]
        source: reqwest::Error,
    },
}

/// One outbound API call.
#[derive(Debug)]
pub struct ApiRequest {
    method: Method,
    endpoint: &'static str,
    query: Vec<(&'static str, String)>,
    form: Option<Form>,
}

impl ApiRequest {
    pub fn get(endpoint: &'static str) -> Self {
        Self::new(Method::GET, endpoint)
    }

    pub fn post(endpoint: &'static str) -> Self {
        Self::new(Method::POST, endpoint)
    }

    fn new(method: Method, endpoint: &'static str) -> Self {
        Self {
            method,
            endpoint,
            query: Vec::new(),
            form: None,
        }
    }

    /// Append a query parameter.
    pub fn param(mut self, key: &'static str, value: impl ToString) -> Self {
        self.query.push((key, value.to_string()));
        self
    }

    /// Attach a multipart body.
    pub fn multipart(mut self, form: Form) -> Self {
        self.form = Some(form);
        self
    }

    pub fn endpoint(&self) -> &'static str {
        self.endpoint
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn query(&self) -> &[(&'static str, String)] {
        &self.query
    }
}

/// Query parameter that carries `token`.
pub fn auth_param(token: &Token) -> &'static str {
    match token {
        Token::Access(_) => "access_token",
        Token::Issued(_) => "auth",
    }
}

#[derive(Debug, Clone)]
pub struct PcloudClient {
    http: reqwest::Client,
    base_url: Url,
}

impl PcloudClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("pcmcp-pcloud/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ClientError::Build)?;
        Self::with_http(http, base_url)
    }

    pub fn with_http(http: reqwest::Client, base_url: &str) -> Result<Self, ClientError> {
        let invalid = |reason: String| ClientError::InvalidUrl {
            url: base_url.to_string(),
            reason,
        };
        let base_url = Url::parse(base_url).map_err(|err| invalid(err.to_string()))?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(invalid("expected an http(s) base url".into()));
        }
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint_url(&self, endpoint: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(endpoint);
        }
        url
    }

    /// Send `request` authenticated with the session's current token.
    pub async fn send(&self, session: &Session, request: ApiRequest) -> Result<Value, ClientError> {
        let token = session.token().await;
        self.send_with(token.as_ref(), request).await
    }

    /// Send `request` with an explicit token.
    ///
    /// Used while the session's write lock is held, where reading the session
    /// again would deadlock.
    pub async fn send_with(
        &self,
        token: Option<&Token>,
        request: ApiRequest,
    ) -> Result<Value, ClientError> {
        let ApiRequest {
            method,
            endpoint,
            mut query,
            form,
        } = request;
        if let Some(token) = token {
            query.push((auth_param(token), token.secret().to_string()));
        }

        debug!(%method, endpoint, authenticated = token.is_some(), "calling pCloud");
        let mut builder = self
            .http
            .request(method, self.endpoint_url(endpoint))
            .query(&query);
        if let Some(form) = form {
            builder = builder.multipart(form);
        }

        let response = builder
            .send()
            .await
            .map_err(|source| ClientError::Request {
                endpoint: endpoint.to_string(),
                source,
            })?;
        let status = response.status();
        let body = response
            .json::<Value>()
            .await
            .map_err(|source| ClientError::Decode {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                source,
            })?;
        debug!(endpoint, status = status.as_u16(), result = ?body.get("result"), "pCloud replied");
        Ok(body)
    }

    /// Plain GET of a content URL (download hosts are not API endpoints).
    pub async fn fetch(&self, url: Url) -> Result<reqwest::Response, ClientError> {
        debug!(host = url.host_str(), "fetching content");
        self.http
            .get(url)
            .send()
            .await
            .map_err(|source| ClientError::Request {
                endpoint: "content".to_string(),
                source,
            })
    }
}

/// True when a pCloud body reports success (`"result": 0`, no `"error"`).
pub fn succeeded(body: &Value) -> bool {
    body.get("result").and_then(Value::as_i64) == Some(0) && body.get("error").is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_urls_extend_the_base_path() {
        let client = PcloudClient::new("https://api.pcloud.com").unwrap();
        assert_eq!(
            client.endpoint_url("listfolder").as_str(),
            "https://api.pcloud.com/listfolder"
        );

        let client = PcloudClient::new("http://127.0.0.1:8080/api/").unwrap();
        assert_eq!(
            client.endpoint_url("stat").as_str(),
            "http://127.0.0.1:8080/api/stat"
        );
    }

    #[test]
    fn rejects_unusable_base_urls() {
        assert!(matches!(
            PcloudClient::new("not a url"),
            Err(ClientError::InvalidUrl { .. })
        ));
        assert!(PcloudClient::new("mailto:someone@example.com").is_err());
        assert!(PcloudClient::new("ftp://api.pcloud.com").is_err());
    }

    #[test]
    fn token_kind_selects_auth_param() {
        assert_eq!(auth_param(&Token::Access("a".into())), "access_token");
        assert_eq!(auth_param(&Token::Issued("b".into())), "auth");
    }

    #[test]
    fn request_builder_collects_params() {
        let request = ApiRequest::get("renamefile")
            .param("fileid", 7u64)
            .param("toname", "b.txt");
        assert_eq!(request.endpoint(), "renamefile");
        assert_eq!(*request.method(), Method::GET);
        assert_eq!(
            request.query(),
            [("fileid", "7".to_string()), ("toname", "b.txt".to_string())]
        );
    }

    #[test]
    fn success_requires_zero_result_and_no_error() {
        assert!(succeeded(&serde_json::json!({"result": 0, "contents": []})));
        assert!(!succeeded(
            &serde_json::json!({"result": 2005, "error": "Directory does not exist."})
        ));
        assert!(!succeeded(&serde_json::json!({"error": 1000})));
    }
}
