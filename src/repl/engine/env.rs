//! Evaluator environment
//!
//! Variable state that persists across evaluations of one session.

use indexmap::IndexMap;

use super::value::Value;

/// Variables in definition order
#[derive(Debug, Default, Clone)]
pub struct Environment {
    variables: IndexMap<String, Value>,
}

impl Environment {
    /// Create an empty environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Define or overwrite a variable. Assigning nil removes it.
    pub fn define_var(
        &mut self,
        name: String,
        value: Value,
    ) {
        if value == Value::Nil {
            self.variables.shift_remove(&name);
        } else {
            self.variables.insert(name, value);
        }
    }

    /// Get a variable
    pub fn get_var(
        &self,
        name: &str,
    ) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Remove a variable, returning whether it existed
    pub fn remove_var(
        &mut self,
        name: &str,
    ) -> bool {
        self.variables.shift_remove(name).is_some()
    }

    /// Variable names in definition order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }
}
