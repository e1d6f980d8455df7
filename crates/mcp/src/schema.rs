//! Declared parameter shapes.
//!
//! Each tool's schema is generated from its typed parameter struct. Before a
//! handler runs, the raw params are checked against it: the value must be an
//! object, required fields must be present and every declared property must
//! have a compatible JSON type. Deeper constraints are left to serde when the
//! params are deserialized.

use schemars::{
    JsonSchema,
    schema::{InstanceType, Schema, SingleOrVec},
};
use serde_json::{Value, json};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct ParamSchema {
    document: Value,
    required: Vec<String>,
    properties: BTreeMap<String, Vec<InstanceType>>,
}

impl ParamSchema {
    /// Derive the schema of `T`.
    pub fn of<T: JsonSchema>() -> Self {
        let root = schemars::schema_for!(T);
        let (required, properties) = match root.schema.object.as_deref() {
            Some(object) => (
                object.required.iter().cloned().collect(),
                object
                    .properties
                    .iter()
                    .map(|(name, schema)| (name.clone(), instance_types(schema)))
                    .collect(),
            ),
            None => (Vec::new(), BTreeMap::new()),
        };
        let document = serde_json::to_value(&root).unwrap_or_else(|_| json!({"type": "object"}));
        Self {
            document,
            required,
            properties,
        }
    }

    /// The JSON Schema document, as advertised by `tools/list`.
    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// Coarse shape check of `params`.
    pub fn validate(&self, params: &Value) -> Result<(), String> {
        let Value::Object(map) = params else {
            return Err(format!("params must be an object, got {}", kind_of(params)));
        };

        if let Some(missing) = self.required.iter().find(|name| !map.contains_key(*name)) {
            return Err(format!("missing required parameter '{missing}'"));
        }

        for (name, value) in map {
            let Some(expected) = self.properties.get(name) else {
                continue;
            };
            if expected.is_empty() || expected.iter().any(|t| matches(t, value)) {
                continue;
            }
            let expected = expected
                .iter()
                .map(type_name)
                .collect::<Vec<_>>()
                .join(" or ");
            return Err(format!(
                "parameter '{name}' must be {expected}, got {}",
                kind_of(value)
            ));
        }
        Ok(())
    }
}

fn instance_types(schema: &Schema) -> Vec<InstanceType> {
    match schema {
        Schema::Object(object) => match &object.instance_type {
            Some(SingleOrVec::Single(single)) => vec![single.as_ref().clone()],
            Some(SingleOrVec::Vec(many)) => many.clone(),
            None => Vec::new(),
        },
        Schema::Bool(_) => Vec::new(),
    }
}

fn matches(expected: &InstanceType, value: &Value) -> bool {
    match expected {
        InstanceType::Null => value.is_null(),
        InstanceType::Boolean => value.is_boolean(),
        InstanceType::Integer => value.is_i64() || value.is_u64(),
        InstanceType::Number => value.is_number(),
        InstanceType::String => value.is_string(),
        InstanceType::Array => value.is_array(),
        InstanceType::Object => value.is_object(),
    }
}

fn type_name(kind: &InstanceType) -> &'static str {
    match kind {
        InstanceType::Null => "null",
        InstanceType::Boolean => "boolean",
        InstanceType::Integer => "integer",
        InstanceType::Number => "number",
        InstanceType::String => "string",
        InstanceType::Array => "array",
        InstanceType::Object => "object",
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
