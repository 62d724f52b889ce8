//! Database and table configuration
//!
//! ```json
//! {
//!   "id": "main",
//!   "queue_queries": true,
//!   "tables": [
//!     {
//!       "name": "sessions",
//!       "model": [{"key": "id", "type": "uuid", "props": ["pk"]}],
//!       "ttl_secs": 3600
//!     }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::observability::{log_event_with_fields, Event};
use crate::schema::{ColumnDef, SchemaLoader, TableModel};

use super::errors::{ConfigError, ConfigResult};

/// Configuration for one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableConfig {
    pub name: String,
    /// Ordered column descriptors
    pub model: Vec<ColumnDef>,
    /// Overrides whether the primary key index is kept sorted.
    /// `None` sorts unless the key is a uuid or timeId.
    #[serde(default)]
    pub sort_index: Option<bool>,
    /// Rows older than this many seconds read as absent
    #[serde(default)]
    pub ttl_secs: Option<u64>,
    /// Whether relationship rebuild removes ids whose target row is gone
    #[serde(default)]
    pub prune_dangling_refs: bool,
}

impl TableConfig {
    pub fn new(name: impl Into<String>, model: Vec<ColumnDef>) -> Self {
        Self {
            name: name.into(),
            model,
            sort_index: None,
            ttl_secs: None,
            prune_dangling_refs: false,
        }
    }

    pub fn with_sort_index(mut self, sorted: bool) -> Self {
        self.sort_index = Some(sorted);
        self
    }

    pub fn with_ttl(mut self, secs: u64) -> Self {
        self.ttl_secs = Some(secs);
        self
    }

    pub fn with_pruning(mut self) -> Self {
        self.prune_dangling_refs = true;
        self
    }

    /// The table model described by this config
    pub fn table_model(&self) -> TableModel {
        TableModel::new(self.name.clone(), self.model.clone())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.name.is_empty() {
            return Err(ConfigError::Invalid("table name is empty".into()));
        }
        if self.ttl_secs == Some(0) {
            return Err(ConfigError::Invalid(format!(
                "table '{}': ttl_secs must be positive",
                self.name
            )));
        }
        Ok(())
    }
}

/// Configuration for a database instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Instance id handed to the adapter and stamped on change events
    pub id: String,
    /// Hold each query until the previous one completes
    #[serde(default)]
    pub queue_queries: bool,
    #[serde(default)]
    pub tables: Vec<TableConfig>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            id: "tabula".to_string(),
            queue_queries: false,
            tables: Vec::new(),
        }
    }
}

impl DatabaseConfig {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Config with queue-queries mode enabled
    pub fn queued(id: impl Into<String>) -> Self {
        Self {
            queue_queries: true,
            ..Self::new(id)
        }
    }

    pub fn with_table(mut self, table: TableConfig) -> Self {
        self.tables.push(table);
        self
    }

    pub fn table(&self, name: &str) -> Option<&TableConfig> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Validates the instance settings and every table.
    ///
    /// Table models are validated separately when the table is registered.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.id.is_empty() {
            return Err(ConfigError::Invalid("instance id is empty".into()));
        }

        let mut names = HashSet::new();
        for table in &self.tables {
            table.validate()?;
            if !names.insert(table.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "table '{}' configured twice",
                    table.name
                )));
            }
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: DatabaseConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;

        let tables = config.tables.len().to_string();
        log_event_with_fields(
            Event::ConfigLoaded,
            &[("id", config.id.as_str()), ("tables", tables.as_str())],
        );
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> ConfigResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&contents)
    }

    /// Adds a table for every `<table>.json` model file in `dir`.
    /// Tables already configured under the same name are left alone.
    pub fn with_model_dir(mut self, dir: &Path) -> ConfigResult<Self> {
        let mut loader = SchemaLoader::new(dir);
        loader
            .load_all()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        for model in loader.into_models() {
            if self.table(&model.name).is_none() {
                self.tables.push(TableConfig::new(model.name, model.columns));
            }
        }
        Ok(self)
    }
}
