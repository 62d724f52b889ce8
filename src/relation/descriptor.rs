//! Relationship descriptors derived from table models
//!
//! A relationship starts at a column carrying `ref=>Target`. Its
//! back-reference is the target column named by `ref=>Target.column`, or
//! else the one target column that refers back to the owner table without
//! naming a column of its own.

use std::collections::BTreeMap;

use crate::schema::{ColumnDef, SchemaError, SchemaResult, TableModel};
use crate::value::Value;

/// How many ids one side of a relationship holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

impl Cardinality {
    pub fn of(column: &ColumnDef) -> Self {
        if column.col_type.is_array() {
            Cardinality::Many
        } else {
            Cardinality::One
        }
    }

    /// Ids held by a stored column value, deduplicated in order
    pub fn decode(value: &Value) -> Vec<Value> {
        let mut ids: Vec<Value> = Vec::new();
        for id in value.to_list() {
            if !id.is_null() && !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    /// Column value holding `ids`. A to-one column keeps the first id.
    pub fn encode(&self, ids: &[Value]) -> Value {
        match self {
            Cardinality::One => ids.first().cloned().unwrap_or(Value::Null),
            Cardinality::Many => {
                let mut out: Vec<Value> = Vec::with_capacity(ids.len());
                for id in ids {
                    if !out.contains(id) {
                        out.push(id.clone());
                    }
                }
                Value::Array(out)
            }
        }
    }
}

/// Target-side column listing the owners that point at a target row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackRef {
    pub column: String,
    pub cardinality: Cardinality,
}

/// One declared relationship column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub owner: String,
    pub owner_pk: String,
    pub column: String,
    pub cardinality: Cardinality,
    pub target: String,
    pub target_pk: String,
    pub back_ref: Option<BackRef>,
}

impl Relationship {
    fn derive(owner: &TableModel, column: &ColumnDef, models: &BTreeMap<String, TableModel>) -> SchemaResult<Self> {
        let (target_name, explicit) = match column.reference() {
            Some(r) => r,
            None => return Err(SchemaError::invalid_column(&owner.name, &column.key, "not a relationship column")),
        };
        let target = models.get(target_name).ok_or_else(|| {
            SchemaError::invalid_column(
                &owner.name,
                &column.key,
                format!("references unknown table '{}'", target_name),
            )
        })?;
        let owner_pk = owner
            .pk()
            .ok_or_else(|| SchemaError::invalid_model(&owner.name, "relationship owner has no primary key"))?;
        let target_pk = target.pk().ok_or_else(|| {
            SchemaError::invalid_column(
                &owner.name,
                &column.key,
                format!("target table '{}' has no primary key", target_name),
            )
        })?;

        let back_column = match explicit {
            Some(name) => Some(target.column(name).ok_or_else(|| {
                SchemaError::invalid_column(
                    &owner.name,
                    &column.key,
                    format!("back-reference column '{}.{}' does not exist", target_name, name),
                )
            })?),
            None => discover_back_ref(owner, column, target),
        };

        Ok(Self {
            owner: owner.name.clone(),
            owner_pk: owner_pk.to_string(),
            column: column.key.clone(),
            cardinality: Cardinality::of(column),
            target: target.name.clone(),
            target_pk: target_pk.to_string(),
            back_ref: back_column.map(|c| BackRef {
                column: c.key.clone(),
                cardinality: Cardinality::of(c),
            }),
        })
    }
}

fn discover_back_ref<'m>(owner: &TableModel, column: &ColumnDef, target: &'m TableModel) -> Option<&'m ColumnDef> {
    let pointing_back = |c: &&ColumnDef| {
        c.reference().map(|(t, _)| t == owner.name).unwrap_or(false)
            && !(target.name == owner.name && c.key == column.key)
    };

    // a target column naming this column wins over an anonymous one
    if let Some(named) = target
        .columns
        .iter()
        .filter(pointing_back)
        .find(|c| c.reference().and_then(|(_, col)| col) == Some(column.key.as_str()))
    {
        return Some(named);
    }

    let anonymous: Vec<&ColumnDef> = target
        .columns
        .iter()
        .filter(pointing_back)
        .filter(|c| c.reference().and_then(|(_, col)| col).is_none())
        .collect();
    match anonymous.as_slice() {
        [only] => Some(*only),
        _ => None,
    }
}

/// Derives every relationship of every model, keyed by owner table.
///
/// Fails when a `ref=>` names an unknown table or column.
pub fn derive_relationships(models: &BTreeMap<String, TableModel>) -> SchemaResult<BTreeMap<String, Vec<Relationship>>> {
    let mut out: BTreeMap<String, Vec<Relationship>> = BTreeMap::new();
    for model in models.values() {
        let relationships = model
            .reference_columns()
            .map(|c| Relationship::derive(model, c, models))
            .collect::<SchemaResult<Vec<_>>>()?;
        if !relationships.is_empty() {
            out.insert(model.name.clone(), relationships);
        }
    }
    Ok(out)
}
