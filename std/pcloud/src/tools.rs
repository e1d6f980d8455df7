//! File and folder tools.
//!
//! Most tools map one-to-one onto a pCloud endpoint: the params struct builds
//! the [`ApiRequest`] and [`ApiTool`] sends it and forwards the body.

use crate::client::{ApiRequest, PcloudClient};
use pcmcp::{Session, Tool};
use schemars::JsonSchema;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use std::marker::PhantomData;

/// Params of a tool that is a single pCloud call.
pub trait ApiCall: DeserializeOwned + JsonSchema + Send + 'static {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    fn request(self) -> ApiRequest;
}

/// Tool that sends `P`'s request and returns pCloud's reply unmodified.
pub struct ApiTool<P> {
    client: PcloudClient,
    _params: PhantomData<fn() -> P>,
}

impl<P: ApiCall> ApiTool<P> {
    pub fn new(client: PcloudClient) -> Self {
        Self {
            client,
            _params: PhantomData,
        }
    }
}

impl<P: ApiCall> Tool for ApiTool<P> {
    type Params = P;

    fn name(&self) -> &str {
        P::NAME
    }

    fn description(&self) -> &str {
        P::DESCRIPTION
    }

    async fn call(&self, session: &Session, params: P) -> anyhow::Result<Value> {
        Ok(self.client.send(session, params.request()).await?)
    }
}

/// `folderid` or `fileid`, depending on what the id names.
fn item_param(is_folder: bool) -> &'static str {
    if is_folder { "folderid" } else { "fileid" }
}

/// Parameters for listing a folder.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListFolderParams {
    /// Folder to list (0 is the root).
    #[serde(default)]
    pub folder_id: u64,
}

impl ApiCall for ListFolderParams {
    const NAME: &'static str = "list_folder";
    const DESCRIPTION: &'static str = "List the contents of a folder in pCloud";

    fn request(self) -> ApiRequest {
        ApiRequest::get("listfolder").param("folderid", self.folder_id)
    }
}

/// Parameters for creating a folder.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateFolderParams {
    /// Name of the new folder.
    pub name: String,
    /// Folder to create it in (0 is the root).
    #[serde(default)]
    pub parent_folder_id: u64,
}

impl ApiCall for CreateFolderParams {
    const NAME: &'static str = "create_folder";
    const DESCRIPTION: &'static str = "Create a new folder in pCloud";

    fn request(self) -> ApiRequest {
        ApiRequest::get("createfolder")
            .param("name", self.name)
            .param("folderid", self.parent_folder_id)
    }
}

/// Parameters for renaming a file or folder.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct RenameItemParams {
    /// Id of the file or folder.
    pub item_id: u64,
    /// New name.
    pub name: String,
    /// Whether `item_id` names a folder.
    #[serde(default)]
    pub is_folder: bool,
}

impl ApiCall for RenameItemParams {
    const NAME: &'static str = "rename_item";
    const DESCRIPTION: &'static str = "Rename a file or folder in pCloud";

    fn request(self) -> ApiRequest {
        let endpoint = if self.is_folder { "renamefolder" } else { "renamefile" };
        ApiRequest::get(endpoint)
            .param(item_param(self.is_folder), self.item_id)
            .param("toname", self.name)
    }
}

/// Parameters for deleting a file or folder.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeleteItemParams {
    /// Id of the file or folder.
    pub item_id: u64,
    /// Whether `item_id` names a folder.
    #[serde(default)]
    pub is_folder: bool,
}

impl ApiCall for DeleteItemParams {
    const NAME: &'static str = "delete_item";
    const DESCRIPTION: &'static str = "Delete a file or folder from pCloud";

    fn request(self) -> ApiRequest {
        let endpoint = if self.is_folder { "deletefolder" } else { "deletefile" };
        ApiRequest::get(endpoint).param(item_param(self.is_folder), self.item_id)
    }
}

/// Parameters for getting a download link.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetFileLinkParams {
    /// Id of the file.
    pub file_id: u64,
}

impl ApiCall for GetFileLinkParams {
    const NAME: &'static str = "get_file_link";
    const DESCRIPTION: &'static str = "Get a download link for a file";

    fn request(self) -> ApiRequest {
        ApiRequest::get("getfilelink").param("fileid", self.file_id)
    }
}

/// Parameters for getting file metadata.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetFileMetadataParams {
    /// Id of the file.
    pub file_id: u64,
}

impl ApiCall for GetFileMetadataParams {
    const NAME: &'static str = "get_file_metadata";
    const DESCRIPTION: &'static str = "Get metadata for a file";

    fn request(self) -> ApiRequest {
        ApiRequest::get("stat").param("fileid", self.file_id)
    }
}

/// Parameters for getting folder metadata.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetFolderMetadataParams {
    /// Id of the folder.
    pub folder_id: u64,
}

impl ApiCall for GetFolderMetadataParams {
    const NAME: &'static str = "get_folder_metadata";
    const DESCRIPTION: &'static str = "Get metadata for a folder";

    fn request(self) -> ApiRequest {
        ApiRequest::get("stat").param("folderid", self.folder_id)
    }
}

/// Parameters for searching.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchParams {
    /// Text to search for.
    pub query: String,
    /// Folder to search in (0 is the root).
    #[serde(default)]
    pub folder_id: u64,
}

impl ApiCall for SearchParams {
    const NAME: &'static str = "search";
    const DESCRIPTION: &'static str = "Search for files and folders in pCloud";

    fn request(self) -> ApiRequest {
        ApiRequest::get("search")
            .param("query", self.query)
            .param("folderid", self.folder_id)
    }
}

/// Parameters for creating a public link.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ShareItemParams {
    /// Id of the file or folder.
    pub item_id: u64,
    /// Whether `item_id` names a folder.
    #[serde(default)]
    pub is_folder: bool,
}

impl ApiCall for ShareItemParams {
    const NAME: &'static str = "share_item";
    const DESCRIPTION: &'static str = "Create a public link for a file or folder";

    fn request(self) -> ApiRequest {
        let endpoint = if self.is_folder {
            "getfolderpublink"
        } else {
            "getfilepublink"
        };
        ApiRequest::get(endpoint).param(item_param(self.is_folder), self.item_id)
    }
}

/// Parameters for copying a file.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CopyFileParams {
    /// Id of the file to copy.
    pub file_id: u64,
    /// Folder to copy it into.
    pub dest_folder_id: u64,
}

impl ApiCall for CopyFileParams {
    const NAME: &'static str = "copy_file";
    const DESCRIPTION: &'static str = "Copy a file to another folder";

    fn request(self) -> ApiRequest {
        ApiRequest::get("copyfile")
            .param("fileid", self.file_id)
            .param("tofolderid", self.dest_folder_id)
    }
}

/// Parameters for moving a file or folder.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct MoveItemParams {
    /// Id of the file or folder.
    pub item_id: u64,
    /// Folder to move it into.
    pub dest_folder_id: u64,
    /// Whether `item_id` names a folder.
    #[serde(default)]
    pub is_folder: bool,
}

impl ApiCall for MoveItemParams {
    const NAME: &'static str = "move_item";
    const DESCRIPTION: &'static str = "Move a file or folder to another folder";

    fn request(self) -> ApiRequest {
        let endpoint = if self.is_folder { "renamefolder" } else { "renamefile" };
        ApiRequest::get(endpoint)
            .param(item_param(self.is_folder), self.item_id)
            .param("tofolderid", self.dest_folder_id)
    }
}

/// Account details take no parameters.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct GetAccountInfoParams {}

impl ApiCall for GetAccountInfoParams {
    const NAME: &'static str = "get_account_info";
    const DESCRIPTION: &'static str = "Get information about the pCloud account";

    fn request(self) -> ApiRequest {
        ApiRequest::get("userinfo")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcmcp::schema::ParamSchema;
    use serde_json::json;

    fn query(request: &ApiRequest) -> Vec<(&str, &str)> {
        request
            .query()
            .iter()
            .map(|(k, v)| (*k, v.as_str()))
            .collect()
    }

    #[test]
    fn folder_flag_switches_endpoint_and_id_param() {
        let file = RenameItemParams {
            item_id: 5,
            name: "b.txt".into(),
            is_folder: false,
        }
        .request();
        assert_eq!(file.endpoint(), "renamefile");
        assert_eq!(query(&file), [("fileid", "5"), ("toname", "b.txt")]);

        let folder = DeleteItemParams {
            item_id: 9,
            is_folder: true,
        }
        .request();
        assert_eq!(folder.endpoint(), "deletefolder");
        assert_eq!(query(&folder), [("folderid", "9")]);
    }

    #[test]
    fn move_uses_rename_with_target_folder() {
        let request = MoveItemParams {
            item_id: 3,
            dest_folder_id: 8,
            is_folder: true,
        }
        .request();
        assert_eq!(request.endpoint(), "renamefolder");
        assert_eq!(query(&request), [("folderid", "3"), ("tofolderid", "8")]);
    }

    #[test]
    fn defaults_fill_optional_ids() {
        let params: ListFolderParams = serde_json::from_value(json!({})).unwrap();
        assert_eq!(params.folder_id, 0);
        let params: ShareItemParams = serde_json::from_value(json!({"item_id": 4})).unwrap();
        assert!(!params.is_folder);
        assert_eq!(params.request().endpoint(), "getfilepublink");
    }

    #[test]
    fn schemas_mark_only_required_fields() {
        assert!(ParamSchema::of::<ListFolderParams>().required().is_empty());
        assert_eq!(
            ParamSchema::of::<CreateFolderParams>().required(),
            ["name".to_string()]
        );
        assert_eq!(
            ParamSchema::of::<GetFileLinkParams>().required(),
            ["file_id".to_string()]
        );
        let schema = ParamSchema::of::<MoveItemParams>();
        assert!(schema.validate(&json!({"item_id": 1, "dest_folder_id": 2})).is_ok());
        assert!(schema.validate(&json!({"item_id": 1})).is_err());
    }

    #[test]
    fn metadata_and_account_requests() {
        let params: GetFileMetadataParams = serde_json::from_value(json!({"file_id": 11})).unwrap();
        assert_eq!(query(&params.request()), [("fileid", "11")]);
        let params: GetAccountInfoParams = serde_json::from_value(json!({})).unwrap();
        assert!(params.request().query().is_empty());
    }
}
