//! Request dispatch.
//!
//! [`Dispatcher`] is stateless between calls: everything mutable lives in
//! the injected [`Session`]. Each call yields at most one [`Response`];
//! notifications and undecodable lines yield none.

use crate::{
    error::{DispatchError, InvalidParams},
    protocol::{Call, Request, Response},
    registry::{CallError, Registry, ResourceEntry, ToolEntry},
    session::Session,
};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Identity reported by `initialize`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

impl ServerInfo {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

pub struct Dispatcher {
    registry: Registry,
    info: ServerInfo,
    session: Arc<Session>,
}

impl Dispatcher {
    pub fn new(registry: Registry, info: ServerInfo, session: Arc<Session>) -> Self {
        Self {
            registry,
            info,
            session,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Decode one raw input line and dispatch it.
    ///
    /// Blank lines produce no response. A line that is not JSON is answered
    /// with a parse error when `salvage_id` finds its id, and dropped
    /// otherwise. JSON that is not a request object is answered with
    /// `InvalidRequest` when it carries an id, and dropped otherwise.
    pub async fn handle_line(&self, line: &[u8]) -> Option<Response> {
        if line.iter().all(u8::is_ascii_whitespace) {
            return None;
        }

        let value: Value = match serde_json::from_slice(line) {
            Ok(value) => value,
            Err(err) => {
                let err = DispatchError::from(err);
                let id = salvage_id(line);
                warn!(error = %err, id = ?id, bytes = line.len(), "undecodable input line");
                return id.map(|id| Response::error(Some(id), err));
            }
        };

        let salvaged_id = value.get("id").filter(|id| !id.is_null()).cloned();
        match serde_json::from_value::<Request>(value) {
            Ok(request) => self.dispatch(request).await,
            Err(err) => {
                let err = DispatchError::InvalidRequest(err.to_string());
                warn!(error = %err, id = ?salvaged_id, "rejecting malformed request");
                salvaged_id.map(|id| Response::error(Some(id), err))
            }
        }
    }

    pub async fn dispatch(&self, request: Request) -> Option<Response> {
        let (reply, call) = request.split();
        let outcome = match call {
            Ok(call) => self.route(call).await,
            Err(err) => Err(err),
        };

        if let Err(err) = &outcome {
            if reply.notification {
                warn!(error = %err, "notification failed; no response sent");
            } else {
                debug!(id = ?reply.id, code = err.code(), error = %err, "request failed");
            }
        }
        reply.respond(outcome)
    }

    async fn route(&self, call: Call) -> Result<Value, DispatchError> {
        match call {
            Call::Initialize => Ok(json!({
                "serverInfo": {
                    "name": self.info.name,
                    "version": self.info.version,
                },
                "capabilities": {},
            })),
            Call::Initialized | Call::Ping => Ok(json!({})),
            Call::ListTools => {
                let tools: Vec<_> = self.registry.tools().map(ToolEntry::definition).collect();
                Ok(json!({ "tools": tools }))
            }
            Call::CallTool { name, params } => self.call_tool(&name, params).await,
            Call::ListResources => {
                let templates: Vec<_> = self
                    .registry
                    .resources()
                    .map(ResourceEntry::definition)
                    .collect();
                Ok(json!({ "resourceTemplates": templates }))
            }
            Call::ReadResource { uri } => self.read_resource(&uri).await,
        }
    }

    async fn call_tool(&self, name: &str, params: Value) -> Result<Value, DispatchError> {
        let tool = self
            .registry
            .tool(name)
            .ok_or_else(|| DispatchError::ToolNotFound(name.to_string()))?;

        let params = match params {
            Value::Null => Value::Object(Map::new()),
            params => params,
        };
        tool.schema()
            .validate(&params)
            .map_err(DispatchError::InvalidParams)?;

        debug!(tool = name, "invoking tool");
        match tool.call(&self.session, params).await {
            Ok(value) => Ok(value),
            Err(CallError::Params(err)) => Err(DispatchError::InvalidParams(err.to_string())),
            Err(CallError::Failed(err)) => Err(handler_failure(name, err)),
        }
    }

    async fn read_resource(&self, uri: &str) -> Result<Value, DispatchError> {
        let (entry, vars) = self
            .registry
            .resolve(uri)
            .ok_or_else(|| DispatchError::ResourceNotFound(uri.to_string()))?;
        debug!(uri, template = entry.template().as_str(), "reading resource");
        entry
            .read(&self.session, &vars)
            .await
            .map_err(|err| handler_failure(uri, err))
    }
}

/// Best-effort id recovery from a line that is not valid JSON: the first
/// `"id"` key followed by a number or string literal.
fn salvage_id(line: &[u8]) -> Option<Value> {
    let text = std::str::from_utf8(line).ok()?;
    let (_, rest) = text.split_once("\"id\"")?;
    let rest = rest.trim_start().strip_prefix(':')?;
    let mut values = serde_json::Deserializer::from_str(rest).into_iter::<Value>();
    match values.next()? {
        Ok(id @ (Value::Number(_) | Value::String(_))) => Some(id),
        _ => None,
    }
}

fn handler_failure(name: &str, err: anyhow::Error) -> DispatchError {
    if let Some(InvalidParams(message)) = err.downcast_ref::<InvalidParams>() {
        return DispatchError::InvalidParams(message.clone());
    }
    error!(tool = name, error = ?err, "handler failed");
    DispatchError::Handler {
        tool: name.to_string(),
        message: format!("{err:#}"),
    }
}
