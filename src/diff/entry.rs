//! Diff entry types

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// One step of a path from the comparison root
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => write!(f, "{}", k),
            PathSegment::Index(i) => write!(f, "[{}]", i),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(k: &str) -> Self {
        PathSegment::Key(k.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(i: usize) -> Self {
        PathSegment::Index(i)
    }
}

/// Change to a single array element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ItemChange {
    New { rhs: Value },
    Deleted { lhs: Value },
    Edited { lhs: Value, rhs: Value },
}

/// Kind tag of an entry, ignoring payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    New,
    Deleted,
    Edited,
    ArrayChange,
}

/// A single difference between two values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiffEntry {
    New {
        path: Vec<PathSegment>,
        rhs: Value,
    },
    Deleted {
        path: Vec<PathSegment>,
        lhs: Value,
    },
    Edited {
        path: Vec<PathSegment>,
        lhs: Value,
        rhs: Value,
    },
    ArrayChange {
        path: Vec<PathSegment>,
        index: usize,
        item: ItemChange,
    },
}

impl DiffEntry {
    pub fn path(&self) -> &[PathSegment] {
        match self {
            DiffEntry::New { path, .. }
            | DiffEntry::Deleted { path, .. }
            | DiffEntry::Edited { path, .. }
            | DiffEntry::ArrayChange { path, .. } => path,
        }
    }

    pub fn kind(&self) -> DiffKind {
        match self {
            DiffEntry::New { .. } => DiffKind::New,
            DiffEntry::Deleted { .. } => DiffKind::Deleted,
            DiffEntry::Edited { .. } => DiffKind::Edited,
            DiffEntry::ArrayChange { .. } => DiffKind::ArrayChange,
        }
    }

    /// Converts an entry sitting exactly on an array element into an
    /// `ArrayChange` on the parent array. Other entries pass through.
    pub(crate) fn into_array_change(self, parent: &[PathSegment], index: usize) -> DiffEntry {
        let on_element = self.path().len() == parent.len() + 1;
        if !on_element {
            return self;
        }

        let item = match self {
            DiffEntry::New { rhs, .. } => ItemChange::New { rhs },
            DiffEntry::Deleted { lhs, .. } => ItemChange::Deleted { lhs },
            DiffEntry::Edited { lhs, rhs, .. } => ItemChange::Edited { lhs, rhs },
            other => return other,
        };
        DiffEntry::ArrayChange {
            path: parent.to_vec(),
            index,
            item,
        }
    }
}
