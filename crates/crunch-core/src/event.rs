use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// A discrete output produced by an evaluation function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    timestamp: i64,
    name: String,
    source: String,
    #[serde(default)]
    parameters: BTreeMap<String, Value>,
}

impl Event {
    pub fn new(timestamp: i64, name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            timestamp,
            name: name.into(),
            source: source.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_parameters(mut self, parameters: BTreeMap<String, Value>) -> Self {
        self.parameters.extend(parameters);
        self
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn parameter(&self, key: &str) -> Option<&Value> {
        self.parameters.get(key)
    }

    pub fn parameters(&self) -> &BTreeMap<String, Value> {
        &self.parameters
    }
}
