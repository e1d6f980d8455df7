//! Tool and resource registry.
//!
//! Built once at startup with [`Registry::builder`], then shared read-only.
//! Names and templates are unique; registering one twice fails the build.

use crate::{
    error::RegistryError,
    schema::ParamSchema,
    session::Session,
    uri::{UriTemplate, UriVars},
};
use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::collections::HashMap;

/// A named operation exposed to clients.
///
/// `Params` is deserialized from the request and also provides the
/// advertised input schema.
pub trait Tool: Send + Sync + 'static {
    type Params: DeserializeOwned + JsonSchema + Send;

    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Run the tool. An [`InvalidParams`](crate::InvalidParams) error is
    /// reported as invalid params, anything else as a handler failure.
    fn call(
        &self,
        session: &Session,
        params: Self::Params,
    ) -> impl Future<Output = anyhow::Result<Value>> + Send;
}

/// A read-only view addressed by a URI template.
pub trait Resource: Send + Sync + 'static {
    fn uri_template(&self) -> &str;

    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn read(
        &self,
        session: &Session,
        vars: &UriVars,
    ) -> impl Future<Output = anyhow::Result<Value>> + Send;
}

/// Why an erased tool call did not produce a value.
#[derive(Debug)]
pub enum CallError {
    /// Params did not deserialize into the tool's parameter type.
    Params(serde_json::Error),
    Failed(anyhow::Error),
}

trait ErasedTool: Send + Sync {
    fn call_value<'a>(
        &'a self,
        session: &'a Session,
        params: Value,
    ) -> BoxFuture<'a, Result<Value, CallError>>;
}

impl<T: Tool> ErasedTool for T {
    fn call_value<'a>(
        &'a self,
        session: &'a Session,
        params: Value,
    ) -> BoxFuture<'a, Result<Value, CallError>> {
        Box::pin(async move {
            let params: T::Params = serde_json::from_value(params).map_err(CallError::Params)?;
            self.call(session, params).await.map_err(CallError::Failed)
        })
    }
}

trait ErasedResource: Send + Sync {
    fn read_value<'a>(
        &'a self,
        session: &'a Session,
        vars: &'a UriVars,
    ) -> BoxFuture<'a, anyhow::Result<Value>>;
}

impl<R: Resource> ErasedResource for R {
    fn read_value<'a>(
        &'a self,
        session: &'a Session,
        vars: &'a UriVars,
    ) -> BoxFuture<'a, anyhow::Result<Value>> {
        Box::pin(self.read(session, vars))
    }
}

/// Tool definition returned by `tools/list`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition<'a> {
    pub name: &'a str,
    pub description: &'a str,
    #[serde(rename = "inputSchema")]
    pub input_schema: &'a Value,
}

/// Resource template returned by `resources/list`.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceDefinition<'a> {
    #[serde(rename = "uriTemplate")]
    pub uri_template: &'a str,
    pub name: &'a str,
    pub description: &'a str,
}

/// A registered tool.
pub struct ToolEntry {
    name: String,
    description: String,
    schema: ParamSchema,
    handler: Box<dyn ErasedTool>,
}

impl ToolEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &ParamSchema {
        &self.schema
    }

    pub fn definition(&self) -> ToolDefinition<'_> {
        ToolDefinition {
            name: &self.name,
            description: &self.description,
            input_schema: self.schema.document(),
        }
    }

    /// Deserialize `params` and run the handler.
    pub async fn call(&self, session: &Session, params: Value) -> Result<Value, CallError> {
        self.handler.call_value(session, params).await
    }
}

/// A registered resource.
pub struct ResourceEntry {
    template: UriTemplate,
    name: String,
    description: String,
    handler: Box<dyn ErasedResource>,
}

impl ResourceEntry {
    pub fn template(&self) -> &UriTemplate {
        &self.template
    }

    pub fn definition(&self) -> ResourceDefinition<'_> {
        ResourceDefinition {
            uri_template: self.template.as_str(),
            name: &self.name,
            description: &self.description,
        }
    }

    pub async fn read(&self, session: &Session, vars: &UriVars) -> anyhow::Result<Value> {
        self.handler.read_value(session, vars).await
    }
}

/// Frozen table of tools and resources.
#[derive(Default)]
pub struct Registry {
    tools: Vec<ToolEntry>,
    index: HashMap<String, usize>,
    resources: Vec<ResourceEntry>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn tool(&self, name: &str) -> Option<&ToolEntry> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// Tools in registration order.
    pub fn tools(&self) -> impl Iterator<Item = &ToolEntry> {
        self.tools.iter()
    }

    pub fn resources(&self) -> impl Iterator<Item = &ResourceEntry> {
        self.resources.iter()
    }

    /// First resource whose template matches `uri`.
    pub fn resolve(&self, uri: &str) -> Option<(&ResourceEntry, UriVars)> {
        self.resources
            .iter()
            .find_map(|entry| entry.template.matches(uri).map(|vars| (entry, vars)))
    }
}

#[derive(Default)]
pub struct RegistryBuilder {
    registry: Registry,
}

impl RegistryBuilder {
    pub fn tool<T: Tool>(mut self, tool: T) -> Result<Self, RegistryError> {
        let name = tool.name().to_string();
        if self.registry.index.contains_key(&name) {
            return Err(RegistryError::DuplicateTool(name));
        }
        let entry = ToolEntry {
            description: tool.description().to_string(),
            schema: ParamSchema::of::<T::Params>(),
            name: name.clone(),
            handler: Box::new(tool),
        };
        self.registry.index.insert(name, self.registry.tools.len());
        self.registry.tools.push(entry);
        Ok(self)
    }

    pub fn resource<R: Resource>(mut self, resource: R) -> Result<Self, RegistryError> {
        let template = UriTemplate::parse(resource.uri_template())?;
        if self
            .registry
            .resources
            .iter()
            .any(|entry| entry.template == template)
        {
            return Err(RegistryError::DuplicateResource(template.as_str().to_string()));
        }
        self.registry.resources.push(ResourceEntry {
            template,
            name: resource.name().to_string(),
            description: resource.description().to_string(),
            handler: Box::new(resource),
        });
        Ok(self)
    }

    pub fn build(self) -> Registry {
        self.registry
    }
}
