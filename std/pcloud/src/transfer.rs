//! File content transfer: base64 in, base64 out.

use crate::client::{ApiRequest, PcloudClient};
use anyhow::Context;
use base64::{Engine, engine::general_purpose::STANDARD};
use pcmcp::{InvalidParams, Session, Tool};
use reqwest::{
    Url,
    multipart::{Form, Part},
};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

/// pCloud-style error code for a link without a usable host or path.
const INVALID_LINK: u16 = 1000;

/// Parameters for uploading a file.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct UploadFileParams {
    /// Name to save the file as.
    pub file_name: String,
    /// Base64-encoded file content.
    pub file_content_base64: String,
    /// Folder to upload into (0 is the root).
    #[serde(default)]
    pub folder_id: u64,
}

/// Uploads decoded content as a multipart body. Nothing is staged on disk.
pub struct UploadFile {
    client: PcloudClient,
}

impl UploadFile {
    pub fn new(client: PcloudClient) -> Self {
        Self { client }
    }
}

impl Tool for UploadFile {
    type Params = UploadFileParams;

    fn name(&self) -> &str {
        "upload_file"
    }

    fn description(&self) -> &str {
        "Upload a file to pCloud from base64-encoded content"
    }

    async fn call(&self, session: &Session, params: UploadFileParams) -> anyhow::Result<Value> {
        let content = decode_content(&params.file_content_base64)?;
        debug!(
            file_name = %params.file_name,
            bytes = content.len(),
            folder_id = params.folder_id,
            "uploading file"
        );

        let form = Form::new().part("file", Part::bytes(content).file_name(params.file_name));
        let request = ApiRequest::post("uploadfile")
            .param("folderid", params.folder_id)
            .multipart(form);
        Ok(self.client.send(session, request).await?)
    }
}

/// Parameters for downloading a file.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct DownloadFileParams {
    /// Id of the file.
    pub file_id: u64,
}

/// Resolves a download link, fetches the content and returns it with the
/// file's metadata.
pub struct DownloadFile {
    client: PcloudClient,
}

impl DownloadFile {
    pub fn new(client: PcloudClient) -> Self {
        Self { client }
    }
}

impl Tool for DownloadFile {
    type Params = DownloadFileParams;

    fn name(&self) -> &str {
        "download_file"
    }

    fn description(&self) -> &str {
        "Download a file from pCloud as base64-encoded content"
    }

    async fn call(&self, session: &Session, params: DownloadFileParams) -> anyhow::Result<Value> {
        let file_id = params.file_id;
        let link = self
            .client
            .send(session, ApiRequest::get("getfilelink").param("fileid", file_id))
            .await?;
        if reports_error(&link) {
            return Ok(link);
        }

        let metadata = self
            .client
            .send(session, ApiRequest::get("stat").param("fileid", file_id))
            .await?;
        if reports_error(&metadata) {
            return Ok(metadata);
        }

        let Some(url) = content_url(self.client.base_url(), &link) else {
            warn!(file_id, "file link response has no usable host or path");
            return Ok(json!({
                "error": INVALID_LINK,
                "message": "Invalid file link response",
            }));
        };

        let response = self.client.fetch(url).await?;
        let status = response.status();
        if !status.is_success() {
            warn!(file_id, status = status.as_u16(), "content download failed");
            return Ok(json!({
                "error": status.as_u16(),
                "message": "Failed to download file",
            }));
        }

        let content = response
            .bytes()
            .await
            .with_context(|| format!("reading content of file {file_id}"))?;
        debug!(file_id, bytes = content.len(), "downloaded file");
        Ok(json!({
            "metadata": metadata,
            "content_base64": STANDARD.encode(&content),
        }))
    }
}

/// Decode base64 content, ignoring line breaks and other ASCII whitespace.
fn decode_content(encoded: &str) -> Result<Vec<u8>, InvalidParams> {
    let compact: Vec<u8> = encoded
        .bytes()
        .filter(|byte| !byte.is_ascii_whitespace())
        .collect();
    STANDARD.decode(compact).map_err(|err| {
        InvalidParams::new(format!("file_content_base64 is not valid base64: {err}"))
    })
}

/// A reply carrying a non-zero `error` field.
fn reports_error(reply: &Value) -> bool {
    reply.get("error").is_some_and(|error| *error != 0)
}

/// `<scheme>://<hosts[0]><path>`, using the API's scheme.
fn content_url(base: &Url, link: &Value) -> Option<Url> {
    let host = link.get("hosts")?.as_array()?.first()?.as_str()?;
    let path = link.get("path")?.as_str()?;
    if host.is_empty() || !path.starts_with('/') {
        return None;
    }
    Url::parse(&format!("{}://{host}{path}", base.scheme())).ok()
}
