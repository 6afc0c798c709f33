use rustc_hash::FxHashMap;

use super::{RuntimeError, Value};

/// Variable bindings consulted and updated during evaluation.
pub trait Environment {
    fn get(&self, name: &str) -> Result<Value, RuntimeError>;
    fn set(&mut self, name: &str, value: Value);
}

/// A single flat scope of global variables.
#[derive(Debug, Clone, Default)]
pub struct Globals {
    values: FxHashMap<String, Value>,
}

impl Globals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Environment for Globals {
    fn get(&self, name: &str) -> Result<Value, RuntimeError> {
        self.values
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::UndeclaredVariable(name.to_string()))
    }

    fn set(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }
}
