pub mod application;

pub use application::{CheckApplicationGoal, ExtractApplicationInfo};

use schemars::{gen::SchemaSettings, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::application::ApplicationRecord;

/// A named function the model may ask to run against the session's record.
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn args(&self) -> &[ToolArg];

    /// When true the tool's output ends the turn and is shown to the user as-is.
    fn return_direct(&self) -> bool {
        false
    }

    fn call(&self, input: &str, record: &mut ApplicationRecord) -> String;

    fn default_serializer(&self) -> Value {
        let parameters = build_parameters_schema(self.args());
        json!({
            "type": "function",
            "function": {
                "name": self.name(),
                "description": self.description(),
                "parameters": parameters
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolSetError {
    #[error("Failed to find tool `{0}`")]
    ToolNotFound(String),
}

/// Ordered registry of the tools offered to the model.
#[derive(Default)]
pub struct ToolSet(pub Vec<Box<dyn Tool>>);

impl ToolSet {
    /// The two application tools, extraction first.
    #[must_use]
    pub fn application() -> Self {
        Self(vec![
            Box::new(ExtractApplicationInfo::new()),
            Box::new(CheckApplicationGoal::new()),
        ])
    }

    pub fn find_tool(&self, name: &str) -> Result<&dyn Tool, ToolSetError> {
        self.0
            .iter()
            .find(|t| t.name() == name)
            .map(|t| &**t)
            .ok_or_else(|| ToolSetError::ToolNotFound(name.to_string()))
    }

    pub fn add_tool(&mut self, tool: Box<dyn Tool>) {
        self.0.push(tool);
    }

    pub fn remove_tool(&mut self, name: &str) -> Result<(), ToolSetError> {
        let pos = self
            .0
            .iter()
            .position(|t| t.name() == name)
            .ok_or_else(|| ToolSetError::ToolNotFound(name.to_string()))?;
        self.0.remove(pos);
        Ok(())
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|t| t.name()).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Runs the tool registered under `name` with a plain-text argument.
    pub fn invoke(
        &self,
        name: &str,
        input: &str,
        record: &mut ApplicationRecord,
    ) -> Result<String, ToolSetError> {
        let tool = self.find_tool(name)?;
        debug!(tool = name, "Invoking tool");
        Ok(tool.call(input, record))
    }

    /// Runs a model-issued call, decoding its JSON arguments first.
    pub fn call(
        &self,
        call: &ToolCall,
        record: &mut ApplicationRecord,
    ) -> Result<ToolResponse, ToolSetError> {
        let tool = self.find_tool(&call.name)?;
        let input = call.input_for(tool.args().first().map(ToolArg::name));
        Ok(ToolResponse {
            id: call.id.clone(),
            name: call.name.clone(),
            content: tool.call(&input, record),
        })
    }
}

pub struct ToolArg {
    name: String,
    schema: Value,
}

impl ToolArg {
    pub fn new<T: JsonSchema + Serialize>(name: &str, description: &str) -> Self {
        let settings = SchemaSettings::default().with(|s| {
            s.inline_subschemas = true;
        });
        let generator = settings.into_generator();
        let schema = generator.into_root_schema_for::<T>();
        let mut schema_value = serde_json::to_value(&schema).unwrap_or_else(|_| json!({}));

        if let Some(obj) = schema_value.as_object_mut() {
            obj.remove("$schema");
            obj.remove("format");
            obj.remove("title");
            obj.insert("description".to_string(), json!(description));
        }

        ToolArg {
            name: name.to_string(),
            schema: schema_value,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Represents a tool call requested by the assistant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Raw JSON text as produced by the model.
    pub arguments: String,
}

impl ToolCall {
    /// Pulls the text input for a single-argument tool out of `arguments`.
    ///
    /// Models don't always honour the schema, so a missing key gives an empty
    /// input and anything that isn't a JSON object is passed through verbatim.
    #[must_use]
    pub fn input_for(&self, arg: Option<&str>) -> String {
        let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&self.arguments) else {
            return self.arguments.clone();
        };
        let value = match arg {
            Some(arg) => map.get(arg),
            None => map.values().next(),
        };
        match value {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }
}

/// Represents the output of a tool execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub id: String,
    pub name: String,
    pub content: String,
}

pub fn build_parameters_schema(args: &[ToolArg]) -> Value {
    let mut properties = serde_json::Map::new();
    let mut required = Vec::new();

    for arg in args {
        properties.insert(arg.name.clone(), arg.schema.clone());
        required.push(json!(arg.name));
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}
