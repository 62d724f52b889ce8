//! Table data model definitions
//!
//! A table's model is an ordered list of column descriptors:
//!
//! ```json
//! [
//!   {"key": "id",   "type": "int",    "props": ["pk", "ai"]},
//!   {"key": "name", "type": "string", "props": ["trie"]},
//!   {"key": "team", "type": "teams",  "props": ["ref=>teams"]}
//! ]
//! ```
//!
//! Column types: int, float, number, string, bool, blob, map, any, uuid,
//! timeId, `T[]`, or the name of another table (relationship column).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::{CastTarget, Value};

use super::errors::{SchemaError, SchemaResult};

/// Column data type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    Any,
    Int,
    Float,
    String,
    Bool,
    Blob,
    Map,
    /// Random v4 uuid string, generated when absent on a primary key
    Uuid,
    /// Time-ordered id string, generated when absent on a primary key
    TimeId,
    /// Array of the element type
    Array(Box<ColumnType>),
    /// Primary key of a row in another table
    Table(String),
}

impl ColumnType {
    /// Parses a type name. Unknown identifiers are treated as table names.
    pub fn parse(name: &str) -> Self {
        let name = name.trim();
        if let Some(inner) = name.strip_suffix("[]") {
            return ColumnType::Array(Box::new(ColumnType::parse(inner)));
        }

        match name {
            "any" | "*" => ColumnType::Any,
            "int" | "integer" => ColumnType::Int,
            "float" | "number" => ColumnType::Float,
            "string" | "text" => ColumnType::String,
            "bool" | "boolean" => ColumnType::Bool,
            "blob" => ColumnType::Blob,
            "map" | "object" => ColumnType::Map,
            "array" => ColumnType::Array(Box::new(ColumnType::Any)),
            "uuid" => ColumnType::Uuid,
            "timeId" | "timeid" => ColumnType::TimeId,
            other => ColumnType::Table(other.to_string()),
        }
    }

    /// Returns true for types an auto-increment key may use
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Int | ColumnType::Float)
    }

    /// Table referenced by a relationship column type (`T` or `T[]`)
    pub fn referenced_table(&self) -> Option<&str> {
        match self {
            ColumnType::Table(t) => Some(t),
            ColumnType::Array(inner) => inner.referenced_table(),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, ColumnType::Array(_))
    }

    /// Casts a value to this column type
    pub fn coerce(&self, value: &Value) -> Value {
        match self {
            ColumnType::Any | ColumnType::Table(_) => value.clone(),
            ColumnType::Int => value.cast(CastTarget::Int),
            ColumnType::Float => value.cast(CastTarget::Float),
            ColumnType::String | ColumnType::Uuid | ColumnType::TimeId => {
                value.cast(CastTarget::String)
            }
            ColumnType::Bool => value.cast(CastTarget::Bool),
            ColumnType::Blob => value.cast(CastTarget::Blob),
            ColumnType::Map => value.cast(CastTarget::Map),
            ColumnType::Array(inner) => match value.cast(CastTarget::Array) {
                Value::Array(items) => Value::Array(items.iter().map(|v| inner.coerce(v)).collect()),
                other => other,
            },
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Any => write!(f, "any"),
            ColumnType::Int => write!(f, "int"),
            ColumnType::Float => write!(f, "float"),
            ColumnType::String => write!(f, "string"),
            ColumnType::Bool => write!(f, "bool"),
            ColumnType::Blob => write!(f, "blob"),
            ColumnType::Map => write!(f, "map"),
            ColumnType::Uuid => write!(f, "uuid"),
            ColumnType::TimeId => write!(f, "timeId"),
            ColumnType::Array(inner) => write!(f, "{}[]", inner),
            ColumnType::Table(t) => write!(f, "{}", t),
        }
    }
}

/// Recognized column properties
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnProp {
    /// Primary key
    Pk,
    /// Auto-increment (numeric primary keys only)
    Ai,
    /// Maintain a prefix trie over this column
    Trie,
    /// Maintain a secondary index over this column
    Idx,
    /// Foreign key into `table`, optionally naming the back-reference column
    Ref { table: String, column: Option<String> },
}

impl ColumnProp {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Some(target) = raw.strip_prefix("ref=>") {
            let (table, column) = match target.split_once('.') {
                Some((t, c)) => (t.to_string(), Some(c.to_string())),
                None => (target.to_string(), None),
            };
            if table.is_empty() {
                return None;
            }
            return Some(ColumnProp::Ref { table, column });
        }

        match raw {
            "pk" => Some(ColumnProp::Pk),
            "ai" => Some(ColumnProp::Ai),
            "trie" => Some(ColumnProp::Trie),
            "idx" => Some(ColumnProp::Idx),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnProp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnProp::Pk => write!(f, "pk"),
            ColumnProp::Ai => write!(f, "ai"),
            ColumnProp::Trie => write!(f, "trie"),
            ColumnProp::Idx => write!(f, "idx"),
            ColumnProp::Ref { table, column: None } => write!(f, "ref=>{}", table),
            ColumnProp::Ref { table, column: Some(c) } => write!(f, "ref=>{}.{}", table, c),
        }
    }
}

/// Serialized form of a column descriptor
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawColumn {
    key: String,
    #[serde(rename = "type")]
    col_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    props: Vec<String>,
}

/// A single column descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawColumn", into = "RawColumn")]
pub struct ColumnDef {
    pub key: String,
    pub col_type: ColumnType,
    pub default: Option<Value>,
    pub props: Vec<ColumnProp>,
}

impl TryFrom<RawColumn> for ColumnDef {
    type Error = String;

    fn try_from(raw: RawColumn) -> Result<Self, Self::Error> {
        let props = raw
            .props
            .iter()
            .map(|p| ColumnProp::parse(p).ok_or_else(|| format!("unknown column prop '{}'", p)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            key: raw.key,
            col_type: ColumnType::parse(&raw.col_type),
            default: raw.default,
            props,
        })
    }
}

impl From<ColumnDef> for RawColumn {
    fn from(def: ColumnDef) -> Self {
        Self {
            key: def.key,
            col_type: def.col_type.to_string(),
            default: def.default,
            props: def.props.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl ColumnDef {
    pub fn new(key: impl Into<String>, col_type: &str) -> Self {
        Self {
            key: key.into(),
            col_type: ColumnType::parse(col_type),
            default: None,
            props: Vec::new(),
        }
    }

    /// Adds a property given in its textual form, e.g. `"pk"` or `"ref=>teams"`.
    /// Unknown properties are ignored here and rejected by model validation
    /// when deserialized.
    pub fn with_prop(mut self, prop: &str) -> Self {
        if let Some(p) = ColumnProp::parse(prop) {
            self.props.push(p);
        }
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn has_prop(&self, prop: &ColumnProp) -> bool {
        self.props.contains(prop)
    }

    pub fn is_pk(&self) -> bool {
        self.has_prop(&ColumnProp::Pk)
    }

    pub fn is_auto_increment(&self) -> bool {
        self.has_prop(&ColumnProp::Ai)
    }

    pub fn is_trie(&self) -> bool {
        self.has_prop(&ColumnProp::Trie)
    }

    pub fn is_indexed(&self) -> bool {
        self.has_prop(&ColumnProp::Idx)
    }

    /// The `ref=>` target of this column, if any
    pub fn reference(&self) -> Option<(&str, Option<&str>)> {
        self.props.iter().find_map(|p| match p {
            ColumnProp::Ref { table, column } => Some((table.as_str(), column.as_deref())),
            _ => None,
        })
    }
}

/// The data model of one table
#[derive(Debug, Clone, PartialEq)]
pub struct TableModel {
    /// Table name
    pub name: String,
    /// Ordered column descriptors
    pub columns: Vec<ColumnDef>,
}

impl TableModel {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDef>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    pub fn column(&self, key: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.key == key)
    }

    /// The primary key column, if the table declares one
    pub fn pk_column(&self) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.is_pk())
    }

    /// Primary key column name
    pub fn pk(&self) -> Option<&str> {
        self.pk_column().map(|c| c.key.as_str())
    }

    pub fn is_auto_increment(&self) -> bool {
        self.pk_column().map(|c| c.is_auto_increment()).unwrap_or(false)
    }

    pub fn trie_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| c.is_trie())
    }

    pub fn indexed_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| c.is_indexed())
    }

    pub fn reference_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| c.reference().is_some())
    }

    /// Whether keys sort naturally, or are kept in insertion order
    pub fn keys_sortable(&self) -> bool {
        !matches!(
            self.pk_column().map(|c| &c.col_type),
            Some(ColumnType::Uuid) | Some(ColumnType::TimeId)
        )
    }

    /// Validates the model's structure (not a row).
    ///
    /// Rules:
    /// - column keys are unique and non-empty
    /// - zero or one `pk` column
    /// - `ai` implies `pk` and an int/float type
    /// - `trie` only on string columns
    /// - a column typed as another table must carry `ref=>`
    pub fn validate_structure(&self) -> SchemaResult<()> {
        if self.name.is_empty() {
            return Err(SchemaError::invalid_model("", "table name is empty"));
        }

        let mut seen = std::collections::HashSet::new();
        let mut pk_count = 0;

        for col in &self.columns {
            if col.key.is_empty() {
                return Err(SchemaError::invalid_model(&self.name, "column key is empty"));
            }
            if !seen.insert(col.key.as_str()) {
                return Err(SchemaError::invalid_column(&self.name, &col.key, "duplicate column key"));
            }
            if col.is_pk() {
                pk_count += 1;
            }
            if col.is_auto_increment() {
                if !col.is_pk() {
                    return Err(SchemaError::invalid_column(&self.name, &col.key, "ai requires pk"));
                }
                if !col.col_type.is_numeric() {
                    return Err(SchemaError::invalid_column(
                        &self.name,
                        &col.key,
                        format!("ai requires an int or float type, found {}", col.col_type),
                    ));
                }
            }
            if col.is_trie() && col.col_type != ColumnType::String {
                return Err(SchemaError::invalid_column(&self.name, &col.key, "trie requires a string column"));
            }
            if col.is_indexed()
                && matches!(
                    col.col_type,
                    ColumnType::Any | ColumnType::Map | ColumnType::Blob | ColumnType::Array(_)
                )
            {
                return Err(SchemaError::invalid_column(
                    &self.name,
                    &col.key,
                    format!("idx is not supported on {} columns", col.col_type),
                ));
            }
            if col.col_type.referenced_table().is_some() && col.reference().is_none() {
                return Err(SchemaError::invalid_column(
                    &self.name,
                    &col.key,
                    format!("unknown column type '{}'", col.col_type),
                ));
            }
        }

        if pk_count > 1 {
            return Err(SchemaError::invalid_model(&self.name, "more than one pk column"));
        }

        Ok(())
    }
}
