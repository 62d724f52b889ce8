//! Table model loader
//!
//! Models are JSON column lists. They can be parsed from a string, or
//! loaded from a directory holding one `<table>.json` file per table.
//! Every loaded model is validated before it is returned.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::errors::{SchemaError, SchemaResult};
use super::types::{ColumnDef, TableModel};

/// Loads table models from JSON
pub struct SchemaLoader {
    /// Directory containing model files
    model_dir: PathBuf,
    /// Loaded models by table name
    models: BTreeMap<String, TableModel>,
}

impl SchemaLoader {
    /// Creates a loader reading `<model_dir>/<table>.json` files.
    pub fn new(model_dir: &Path) -> Self {
        Self {
            model_dir: model_dir.to_path_buf(),
            models: BTreeMap::new(),
        }
    }

    /// Returns the model directory path.
    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    /// Parses and validates one model from its JSON column list.
    pub fn parse_model(table: &str, json: &str) -> SchemaResult<TableModel> {
        let columns: Vec<ColumnDef> = serde_json::from_str(json)
            .map_err(|e| SchemaError::load_failed(format!("model '{}'", table), e.to_string()))?;
        let model = TableModel::new(table, columns);
        model.validate_structure()?;
        Ok(model)
    }

    /// Loads every `*.json` file in the model directory.
    ///
    /// Files are read in name order so the loaded set is deterministic.
    /// A missing directory loads nothing.
    pub fn load_all(&mut self) -> SchemaResult<usize> {
        if !self.model_dir.exists() {
            return Ok(0);
        }

        let entries = fs::read_dir(&self.model_dir).map_err(|e| {
            SchemaError::load_failed(self.model_dir.display().to_string(), e.to_string())
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().map(|x| x == "json").unwrap_or(false))
            .collect();
        paths.sort();

        for path in paths {
            let table = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| SchemaError::load_failed(path.display().to_string(), "invalid file name"))?
                .to_string();
            let contents = fs::read_to_string(&path)
                .map_err(|e| SchemaError::load_failed(path.display().to_string(), e.to_string()))?;
            let model = Self::parse_model(&table, &contents)?;
            self.models.insert(table, model);
        }

        Ok(self.models.len())
    }

    /// Returns a loaded model by table name
    pub fn get(&self, table: &str) -> Option<&TableModel> {
        self.models.get(table)
    }

    /// Consumes the loader, returning models in table-name order
    pub fn into_models(self) -> Vec<TableModel> {
        self.models.into_values().collect()
    }
}
