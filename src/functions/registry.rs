//! # Function Registry

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::value::Value;

use super::builtins::builtins;
use super::call::FunctionCall;
use super::errors::{FunctionError, FunctionResult};
use super::function::{Accumulator, AggregateFn, FunctionKind, QueryFunction, ScalarFn};

/// Registry of named query functions
///
/// Names are case-insensitive and stored upper-cased.
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    functions: RwLock<BTreeMap<String, Arc<QueryFunction>>>,
}

impl FunctionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in function
    pub fn with_builtins() -> Self {
        let functions = builtins()
            .into_iter()
            .map(|(name, f)| (name.to_string(), Arc::new(f)))
            .collect();
        Self {
            functions: RwLock::new(functions),
        }
    }

    /// Register a function under a new name
    pub fn register(&self, name: &str, function: QueryFunction) -> FunctionResult<()> {
        let key = name.trim().to_ascii_uppercase();
        if key.is_empty() {
            return Err(FunctionError::Malformed(name.to_string()));
        }

        let mut functions = self
            .functions
            .write()
            .map_err(|_| FunctionError::Internal("Lock poisoned".into()))?;
        if functions.contains_key(&key) {
            return Err(FunctionError::AlreadyExists(key));
        }
        functions.insert(key, Arc::new(function));
        Ok(())
    }

    /// Register a scalar function
    pub fn register_scalar(&self, name: &str, f: ScalarFn) -> FunctionResult<()> {
        self.register(name, QueryFunction::Scalar(f))
    }

    /// Register an aggregate with its seed value
    pub fn register_aggregate(&self, name: &str, start: Value, step: AggregateFn) -> FunctionResult<()> {
        self.register(
            name,
            QueryFunction::Aggregate {
                start: Accumulator::starting_at(start),
                step,
            },
        )
    }

    /// Get function by name
    pub fn get(&self, name: &str) -> FunctionResult<Arc<QueryFunction>> {
        let key = name.trim().to_ascii_uppercase();
        let functions = self
            .functions
            .read()
            .map_err(|_| FunctionError::Internal("Lock poisoned".into()))?;
        functions
            .get(&key)
            .cloned()
            .ok_or(FunctionError::NotFound(key))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_ok()
    }

    pub fn kind(&self, name: &str) -> FunctionResult<FunctionKind> {
        Ok(self.get(name)?.kind())
    }

    /// Checks that a parsed call names a registered function
    pub fn check_call(&self, call: &FunctionCall) -> FunctionResult<FunctionKind> {
        self.kind(&call.name)
    }

    /// Registered names in order
    pub fn names(&self) -> Vec<String> {
        self.functions
            .read()
            .map(|f| f.keys().cloned().collect())
            .unwrap_or_default()
    }
}
