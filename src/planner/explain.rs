//! Explain output
//!
//! Produces deterministic, human-readable explain output for a query
//! without executing it.

use std::fmt;

use super::ast::Query;
use super::errors::PlannerError;
use super::planner::QueryPlan;

/// Explain plan output
#[derive(Debug, Clone, PartialEq)]
pub struct ExplainPlan {
    /// Whether planning succeeded
    pub accepted: bool,
    pub table: String,
    pub action: String,
    /// Cost class (if accepted)
    pub class: Option<String>,
    /// Adapter fetch strategy (if accepted)
    pub fetch: Option<String>,
    pub predicate: Option<String>,
    pub joins: Vec<String>,
    pub group_by: Vec<String>,
    pub order_by: Vec<String>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
    /// Rejection reason (if rejected)
    pub rejection_reason: Option<String>,
    /// Rejection error code (if rejected)
    pub rejection_code: Option<String>,
}

impl ExplainPlan {
    /// Creates an explain plan from a successful plan
    pub fn from_plan(query: &Query, plan: &QueryPlan) -> Self {
        let m = &query.modifiers;
        Self {
            accepted: true,
            table: query.table.clone(),
            action: query.action.name().to_string(),
            class: Some(plan.class.as_str().to_string()),
            fetch: Some(plan.fetch.describe()),
            predicate: query.predicate.as_ref().map(|p| p.to_string()),
            joins: m
                .joins
                .iter()
                .map(|j| match &j.on {
                    Some(on) => format!("{} {} ON {} {} {}", j.kind.as_str(), j.table, on.left, on.op, on.right),
                    None => format!("{} {}", j.kind.as_str(), j.table),
                })
                .collect(),
            group_by: m.group_by.clone(),
            order_by: m
                .order_by
                .iter()
                .map(|s| format!("{} {}", s.column, s.direction.as_str()))
                .collect(),
            offset: m.offset,
            limit: m.limit,
            rejection_reason: None,
            rejection_code: None,
        }
    }

    /// Creates an explain plan from a planning error
    pub fn from_error(query: &Query, err: &PlannerError) -> Self {
        Self {
            accepted: false,
            table: query.table.clone(),
            action: query.action.name().to_string(),
            class: None,
            fetch: None,
            predicate: None,
            joins: Vec::new(),
            group_by: Vec::new(),
            order_by: Vec::new(),
            offset: None,
            limit: None,
            rejection_reason: Some(err.message().to_string()),
            rejection_code: Some(err.code().code().to_string()),
        }
    }
}

impl fmt::Display for ExplainPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== EXPLAIN PLAN ===")?;
        writeln!(f, "Table: {}", self.table)?;
        writeln!(f, "Action: {}", self.action)?;

        if self.accepted {
            writeln!(f, "Status: ACCEPTED")?;
            if let Some(class) = &self.class {
                writeln!(f, "Cost Class: {}", class)?;
            }
            if let Some(fetch) = &self.fetch {
                writeln!(f, "Fetch: {}", fetch)?;
            }
            if let Some(pred) = &self.predicate {
                writeln!(f, "Where: {}", pred)?;
            }
            for join in &self.joins {
                writeln!(f, "Join: {}", join)?;
            }
            if !self.group_by.is_empty() {
                writeln!(f, "Group By: {}", self.group_by.join(", "))?;
            }
            if !self.order_by.is_empty() {
                writeln!(f, "Order By: {}", self.order_by.join(", "))?;
            }
            if let Some(offset) = self.offset {
                writeln!(f, "Offset: {}", offset)?;
            }
            if let Some(limit) = self.limit {
                writeln!(f, "Limit: {}", limit)?;
            }
        } else {
            writeln!(f, "Status: REJECTED")?;
            if let Some(code) = &self.rejection_code {
                writeln!(f, "Error Code: {}", code)?;
            }
            if let Some(reason) = &self.rejection_reason {
                writeln!(f, "Reason: {}", reason)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::ast::{SortSpec, Where};
    use crate::planner::planner::QueryPlanner;
    use crate::schema::{ColumnDef, TableModel};

    fn model() -> TableModel {
        TableModel::new(
            "users",
            vec![
                ColumnDef::new("id", "int").with_prop("pk"),
                ColumnDef::new("email", "string").with_prop("idx"),
            ],
        )
    }

    #[test]
    fn test_explain_accepted_plan() {
        let m = model();
        let query = Query::select("users")
            .filter(Where::eq("email", "test@example.com"))
            .order_by(SortSpec::desc("id"))
            .limit(10);

        let plan = QueryPlanner::new(&m).classify(query.predicate.as_ref());
        let explain = ExplainPlan::from_plan(&query, &plan);

        assert!(explain.accepted);
        assert_eq!(explain.class, Some("fast".into()));
        assert_eq!(explain.fetch, Some("INDEX_EQ email (1 values)".into()));
        assert_eq!(explain.limit, Some(10));

        let output = format!("{}", explain);
        assert!(output.contains("ACCEPTED"));
        assert!(output.contains("Order By: id desc"));
    }

    #[test]
    fn test_explain_rejected_plan() {
        let query = Query::select("users");
        let err = PlannerError::unknown_function("MEDIAN");
        let explain = ExplainPlan::from_error(&query, &err);

        assert!(!explain.accepted);
        assert_eq!(explain.rejection_code, Some("TABULA_UNKNOWN_FUNCTION".into()));
        assert!(format!("{}", explain).contains("REJECTED"));
    }

    #[test]
    fn test_explain_deterministic() {
        let m = model();
        let query = Query::select("users").filter(Where::eq("id", 1));
        let plan = QueryPlanner::new(&m).classify(query.predicate.as_ref());

        let a = format!("{}", ExplainPlan::from_plan(&query, &plan));
        let b = format!("{}", ExplainPlan::from_plan(&query, &plan));
        assert_eq!(a, b);
    }
}
