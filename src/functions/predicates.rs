//! # Predicate helper functions
//!
//! Helpers are called from inside `where` clauses, e.g.
//! `CROW(lat, lon, 51.5, -0.12) < 10`. They receive the row, whether the
//! row is a joined row (column names are then `table.column`) and the
//! raw arguments. They are kept apart from the query function registry.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::value::{get_path, Row, Value};

use super::errors::{FunctionError, FunctionResult};

/// Helper signature: `(row, is_join, args) -> scalar`
pub type PredicateHelper = Arc<dyn Fn(&Row, bool, &[Value]) -> FunctionResult<Value> + Send + Sync>;

/// Mean Earth radius used by `CROW`, in kilometres
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Registry of predicate helpers
#[derive(Default)]
pub struct PredicateHelpers {
    helpers: RwLock<BTreeMap<String, PredicateHelper>>,
}

impl std::fmt::Debug for PredicateHelpers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredicateHelpers")
            .field("names", &self.names())
            .finish()
    }
}

impl PredicateHelpers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `CROW` helper
    pub fn with_builtins() -> Self {
        let mut map = BTreeMap::new();
        map.insert("CROW".to_string(), Arc::new(crow) as PredicateHelper);
        Self {
            helpers: RwLock::new(map),
        }
    }

    pub fn register(&self, name: &str, helper: PredicateHelper) -> FunctionResult<()> {
        let key = name.trim().to_ascii_uppercase();
        let mut helpers = self
            .helpers
            .write()
            .map_err(|_| FunctionError::Internal("Lock poisoned".into()))?;
        if helpers.contains_key(&key) {
            return Err(FunctionError::AlreadyExists(key));
        }
        helpers.insert(key, helper);
        Ok(())
    }

    pub fn get(&self, name: &str) -> FunctionResult<PredicateHelper> {
        let key = name.trim().to_ascii_uppercase();
        let helpers = self
            .helpers
            .read()
            .map_err(|_| FunctionError::Internal("Lock poisoned".into()))?;
        helpers
            .get(&key)
            .cloned()
            .ok_or(FunctionError::HelperNotFound(key))
    }

    pub fn names(&self) -> Vec<String> {
        self.helpers
            .read()
            .map(|h| h.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// Great-circle distance in kilometres between the row's coordinates and
/// a reference point.
///
/// Args: `lat_column, lon_column, lat, lon`. Rows without numeric
/// coordinates yield `Null`.
pub fn crow(row: &Row, _is_join: bool, args: &[Value]) -> FunctionResult<Value> {
    if args.len() != 4 {
        return Err(FunctionError::invalid_args(
            "CROW",
            format!("expected 4 arguments, got {}", args.len()),
        ));
    }

    let column = |arg: &Value| -> FunctionResult<Option<f64>> {
        let name = arg
            .as_str()
            .ok_or_else(|| FunctionError::invalid_args("CROW", "coordinate columns must be names"))?;
        Ok(get_path(row, name).and_then(|v| v.as_f64()))
    };
    let point = |arg: &Value| -> FunctionResult<f64> {
        arg.as_f64()
            .ok_or_else(|| FunctionError::invalid_args("CROW", "reference point must be numeric"))
    };

    let ref_lat = point(&args[2])?;
    let ref_lon = point(&args[3])?;
    let (lat, lon) = match (column(&args[0])?, column(&args[1])?) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => return Ok(Value::Null),
    };

    Ok(Value::Float(haversine_km(lat, lon, ref_lat, ref_lon)))
}

/// Haversine distance between two (lat, lon) points in degrees
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}
