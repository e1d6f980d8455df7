//! pCloud tools for the pcmcp stdio server.
//!
//! Exposes the pCloud file API (listing, folder management, search, sharing,
//! upload and download) plus login/logout as tools, and folders and files as
//! `pcloud://` resources. Replies from pCloud are forwarded unmodified.

use crate::{
    auth::{Login, Logout},
    client::{PcloudClient, succeeded},
    config::Config,
    resources::{FileInfo, FolderContents},
    tools::{
        ApiTool, CopyFileParams, CreateFolderParams, DeleteItemParams, GetAccountInfoParams,
        GetFileLinkParams, GetFileMetadataParams, GetFolderMetadataParams, ListFolderParams,
        MoveItemParams, RenameItemParams, SearchParams, ShareItemParams,
    },
    transfer::{DownloadFile, UploadFile},
};
use pcmcp::{Registry, RegistryError, ServerInfo, Session};
use tracing::{info, warn};

pub mod auth;
pub mod client;
pub mod config;
pub mod resources;
pub mod tools;
pub mod transfer;

/// Register every pCloud tool and resource.
pub fn registry(client: &PcloudClient, config: &Config) -> Result<Registry, RegistryError> {
    Ok(Registry::builder()
        .tool(ApiTool::<ListFolderParams>::new(client.clone()))?
        .tool(ApiTool::<CreateFolderParams>::new(client.clone()))?
        .tool(ApiTool::<RenameItemParams>::new(client.clone()))?
        .tool(ApiTool::<DeleteItemParams>::new(client.clone()))?
        .tool(ApiTool::<GetFileLinkParams>::new(client.clone()))?
        .tool(ApiTool::<SearchParams>::new(client.clone()))?
        .tool(ApiTool::<GetFileMetadataParams>::new(client.clone()))?
        .tool(ApiTool::<GetFolderMetadataParams>::new(client.clone()))?
        .tool(ApiTool::<ShareItemParams>::new(client.clone()))?
        .tool(ApiTool::<CopyFileParams>::new(client.clone()))?
        .tool(ApiTool::<MoveItemParams>::new(client.clone()))?
        .tool(ApiTool::<GetAccountInfoParams>::new(client.clone()))?
        .tool(UploadFile::new(client.clone()))?
        .tool(DownloadFile::new(client.clone()))?
        .tool(Login::new(client.clone(), config.login_settings()))?
        .tool(Logout::new(client.clone()))?
        .resource(FolderContents::new(client.clone()))?
        .resource(FileInfo::new(client.clone()))?
        .build())
}

/// Identity reported by `initialize`.
pub fn server_info(config: &Config) -> ServerInfo {
    ServerInfo::new(&config.server_name, env!("CARGO_PKG_VERSION"))
}

/// Log in with the configured credentials when no access token is set.
///
/// Failures are logged; the server starts either way and `login` can be
/// retried as a tool call.
pub async fn auto_login(client: &PcloudClient, session: &Session, config: &Config) {
    if !config.wants_auto_login() {
        return;
    }
    let Some((email, password)) = config.credentials() else {
        return;
    };
    let settings = config.login_settings();
    match auth::login(client, session, &settings, email, password).await {
        Ok(reply) if succeeded(&reply) => info!(email, "auto-login succeeded"),
        Ok(reply) => warn!(
            email,
            result = ?reply.get("result"),
            error = ?reply.get("error"),
            "auto-login rejected by pCloud"
        ),
        Err(err) => warn!(email, error = %format!("{err:#}"), "auto-login failed"),
    }
}
