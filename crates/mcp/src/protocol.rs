//! Request and response envelopes.
//!
//! Two request shapes share one line format:
//!
//! - JSON-RPC style: `{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":..,"arguments":..}}`
//! - tool style: `{"id":2,"type":"tool","tool":"list_folder","params":{"folder_id":0}}`
//!
//! Responses echo `id` verbatim and carry exactly one of `result` / `error`.

use crate::error::DispatchError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One decoded input line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonrpc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// What a request asks the server to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Initialize,
    Initialized,
    Ping,
    ListTools,
    CallTool { name: String, params: Value },
    ListResources,
    ReadResource { uri: String },
}

/// The part of a request needed to answer it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplyTo {
    pub jsonrpc: Option<String>,
    pub id: Option<Value>,
    /// No response is written for notifications.
    pub notification: bool,
}

impl ReplyTo {
    /// Build the response for `outcome`, or `None` for a notification.
    pub fn respond(self, outcome: Result<Value, DispatchError>) -> Option<Response> {
        if self.notification {
            return None;
        }
        let outcome = match outcome {
            Ok(value) => Outcome::Result(value),
            Err(err) => Outcome::Error(err.into()),
        };
        Some(Response {
            jsonrpc: self.jsonrpc,
            id: self.id,
            outcome,
        })
    }
}

impl Request {
    /// A JSON-RPC method message without an id.
    ///
    /// Tool-style messages are always answered: clients of that shape read
    /// one response line per request whether or not they sent an id.
    pub fn is_notification(&self) -> bool {
        self.id.is_none() && self.tool.is_none()
    }

    /// Separate the reply envelope from the call it requests.
    pub fn split(self) -> (ReplyTo, Result<Call, DispatchError>) {
        let reply = ReplyTo {
            notification: self.is_notification(),
            jsonrpc: self.jsonrpc,
            id: self.id,
        };
        let call = classify(self.method, self.kind, self.tool, self.params);
        (reply, call)
    }
}

fn classify(
    method: Option<String>,
    kind: Option<String>,
    tool: Option<String>,
    params: Option<Value>,
) -> Result<Call, DispatchError> {
    if let Some(name) = tool {
        return match kind.as_deref() {
            None | Some("tool") => Ok(Call::CallTool {
                name,
                params: params.unwrap_or(Value::Null),
            }),
            Some(other) => Err(DispatchError::InvalidRequest(format!(
                "unsupported message type '{other}'"
            ))),
        };
    }

    let Some(method) = method else {
        return Err(DispatchError::InvalidRequest(
            "expected a 'method' or 'tool' field".into(),
        ));
    };

    match method.as_str() {
        "initialize" => Ok(Call::Initialize),
        "initialized" | "notifications/initialized" => Ok(Call::Initialized),
        "ping" => Ok(Call::Ping),
        "tools/list" => Ok(Call::ListTools),
        "tools/call" => {
            let mut params = match params {
                Some(Value::Object(map)) => map,
                _ => {
                    return Err(DispatchError::InvalidParams(
                        "tools/call expects an object with 'name'".into(),
                    ));
                }
            };
            let name = match params.remove("name") {
                Some(Value::String(name)) => name,
                _ => {
                    return Err(DispatchError::InvalidParams(
                        "tools/call requires a string 'name'".into(),
                    ));
                }
            };
            let params = params.remove("arguments").unwrap_or(Value::Null);
            Ok(Call::CallTool { name, params })
        }
        "resources/list" | "resources/templates/list" => Ok(Call::ListResources),
        "resources/read" => {
            let uri = params
                .as_ref()
                .and_then(|p| p.get("uri"))
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    DispatchError::InvalidParams("resources/read requires a string 'uri'".into())
                })?;
            Ok(Call::ReadResource {
                uri: uri.to_string(),
            })
        }
        _ => Err(DispatchError::MethodNotFound(method)),
    }
}

/// One output line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonrpc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Either `"result": ..` or `"error": {..}`, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Result(Value),
    Error(ErrorObject),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Response {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: None,
            id,
            outcome: Outcome::Result(result),
        }
    }

    pub fn error(id: Option<Value>, error: impl Into<ErrorObject>) -> Self {
        Self {
            jsonrpc: None,
            id,
            outcome: Outcome::Error(error.into()),
        }
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.outcome {
            Outcome::Result(value) => Some(value),
            Outcome::Error(_) => None,
        }
    }

    pub fn error_object(&self) -> Option<&ErrorObject> {
        match &self.outcome {
            Outcome::Result(_) => None,
            Outcome::Error(error) => Some(error),
        }
    }
}
