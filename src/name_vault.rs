//! Stable textual names for SSA values.
//!
//! The symbolic backend identifies values by strings, so every value in the
//! analysis domain gets a name of the form `<function>_<local name>`, or
//! `<function>_<N>` for anonymous temporaries. Names are memoized: repeated
//! queries for the same value always return the same string, which is what
//! makes re-analysis produce identical expressions.

use crate::ir::{Function, Value};
use rustc_hash::FxHashMap;

/// Generates and remembers the name of each value.
///
/// The vault owns the temporary counter, so distinct analyses using distinct
/// vaults cannot interfere with each other.
pub struct NameVault {
    names: FxHashMap<Value, String>,
    values: FxHashMap<String, Value>,
    temp: u32,
}

impl NameVault {
    /// Create an empty vault.
    pub fn new() -> Self {
        Self {
            names: FxHashMap::default(),
            values: FxHashMap::default(),
            temp: 1,
        }
    }

    /// The name of `value`, generating and memoizing it on first use.
    pub fn name(&mut self, func: &Function, value: Value) -> &str {
        if !self.names.contains_key(&value) {
            let name = self.make_name(func, value);
            self.values.insert(name.clone(), value);
            self.names.insert(value, name);
        }
        &self.names[&value]
    }

    /// The already-generated name of `value`, if there is one.
    pub fn get(&self, value: Value) -> Option<&str> {
        self.names.get(&value).map(|s| s.as_str())
    }

    /// Reverse lookup: the value carrying `name`.
    pub fn value_of(&self, name: &str) -> Option<Value> {
        self.values.get(name).copied()
    }

    fn make_name(&mut self, func: &Function, value: Value) -> String {
        let base = match func.dfg.value_name(value) {
            Some(local) => local.to_string(),
            None => {
                let n = self.temp;
                self.temp += 1;
                n.to_string()
            }
        };
        format!("{}_{}", func.name, base).replace('.', "_")
    }
}
