//! Result types for query execution

use crate::planner::CostClass;
use crate::value::Row;

/// Rows a fetch delivered, after predicate filtering
#[derive(Debug, Clone, Default)]
pub struct Fetched {
    pub rows: Vec<Row>,
    /// Rows the adapter handed over, before filtering
    pub scanned_count: usize,
}

/// Result of query execution
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Rows in result order
    pub rows: Vec<Row>,
    /// Number of rows the adapter delivered
    pub scanned_count: usize,
    /// Cost class the predicate was assigned
    pub class: CostClass,
}

impl ExecutionResult {
    pub fn empty(class: CostClass) -> Self {
        Self {
            rows: Vec::new(),
            scanned_count: 0,
            class,
        }
    }

    /// Returns true if no rows matched
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the number of results
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_result_empty() {
        let result = ExecutionResult::empty(CostClass::None);
        assert!(result.is_empty());
        assert_eq!(result.len(), 0);
        assert_eq!(result.class, CostClass::None);
    }
}
