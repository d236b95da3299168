//! Outbound commands
//!
//! Serialized as `{ "request": <RequestTypeName>, "type": <string>, ...attributes }`.

use serde_json::{Map, Value};

/// One outbound request to the backend
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    request: String,
    command_type: String,
    attributes: Map<String, Value>,
}

impl Command {
    pub fn new(request: impl Into<String>, command_type: impl Into<String>) -> Self {
        Self {
            request: request.into(),
            command_type: command_type.into(),
            attributes: Map::new(),
        }
    }

    /// Attach an attribute. `request` and `type` are reserved and ignored here.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        if name != "request" && name != "type" {
            self.attributes.insert(name, value.into());
        }
        self
    }

    /// Attach every entry of `attributes`
    pub fn with_all(self, attributes: Map<String, Value>) -> Self {
        attributes
            .into_iter()
            .fold(self, |command, (name, value)| command.with(name, value))
    }

    pub fn request(&self) -> &str {
        &self.request
    }

    pub fn command_type(&self) -> &str {
        &self.command_type
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Wire representation
    pub fn to_value(&self) -> Value {
        let mut object = Map::with_capacity(self.attributes.len() + 2);
        object.insert("request".to_string(), Value::String(self.request.clone()));
        object.insert("type".to_string(), Value::String(self.command_type.clone()));
        for (name, value) in &self.attributes {
            object.insert(name.clone(), value.clone());
        }
        Value::Object(object)
    }
}
