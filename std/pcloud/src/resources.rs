//! URI-addressed views of folders and files.

use crate::client::{ApiRequest, PcloudClient};
use pcmcp::{InvalidParams, Resource, Session, uri::UriVars};
use serde_json::Value;

fn numeric_id(vars: &UriVars, key: &str) -> Result<u64, InvalidParams> {
    let raw = vars.get(key).map(String::as_str).unwrap_or_default();
    raw.parse()
        .map_err(|_| InvalidParams::new(format!("{key} must be a numeric id, got '{raw}'")))
}

/// `pcloud://folder/{folder_id}`: the folder listing.
pub struct FolderContents {
    client: PcloudClient,
}

impl FolderContents {
    pub fn new(client: PcloudClient) -> Self {
        Self { client }
    }
}

impl Resource for FolderContents {
    fn uri_template(&self) -> &str {
        "pcloud://folder/{folder_id}"
    }

    fn name(&self) -> &str {
        "folder_contents"
    }

    fn description(&self) -> &str {
        "Contents of a pCloud folder"
    }

    async fn read(&self, session: &Session, vars: &UriVars) -> anyhow::Result<Value> {
        let folder_id = numeric_id(vars, "folder_id")?;
        let request = ApiRequest::get("listfolder").param("folderid", folder_id);
        Ok(self.client.send(session, request).await?)
    }
}

/// `pcloud://file/{file_id}`: the file's metadata.
pub struct FileInfo {
    client: PcloudClient,
}

impl FileInfo {
    pub fn new(client: PcloudClient) -> Self {
        Self { client }
    }
}

impl Resource for FileInfo {
    fn uri_template(&self) -> &str {
        "pcloud://file/{file_id}"
    }

    fn name(&self) -> &str {
        "file_info"
    }

    fn description(&self) -> &str {
        "Metadata of a pCloud file"
    }

    async fn read(&self, session: &Session, vars: &UriVars) -> anyhow::Result<Value> {
        let file_id = numeric_id(vars, "file_id")?;
        let request = ApiRequest::get("stat").param("fileid", file_id);
        Ok(self.client.send(session, request).await?)
    }
}
