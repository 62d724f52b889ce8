//! Query descriptor and predicate AST
//!
//! A [`Query`] is built by the caller, dispatched once, and becomes
//! immutable when it reaches [`QueryState::Complete`].

use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::functions::{split_alias, Arg, FunctionCall};
use crate::value::{Row, Value};

use super::errors::{PlannerError, PlannerResult};

/// Comparison operators of the predicate grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Op {
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    NotIn,
    Between,
    NotBetween,
    Like,
    NotLike,
    Regexp,
    /// Array column contains the value
    Have,
    NotHave,
    /// Arrays share at least one value
    Intersect,
    /// Column contains every value
    IntersectAll,
    NotIntersect,
    /// Case-insensitive starts-with, served by the trie on `trie` columns
    Prefix,
}

impl Op {
    pub fn parse(raw: &str) -> Option<Op> {
        let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ").to_ascii_uppercase();
        Some(match normalized.as_str() {
            "=" | "==" => Op::Eq,
            "!=" | "<>" => Op::NotEq,
            "<" => Op::Lt,
            "<=" => Op::Lte,
            ">" => Op::Gt,
            ">=" => Op::Gte,
            "IN" => Op::In,
            "NOT IN" => Op::NotIn,
            "BETWEEN" => Op::Between,
            "NOT BETWEEN" => Op::NotBetween,
            "LIKE" => Op::Like,
            "NOT LIKE" => Op::NotLike,
            "REGEXP" | "REGEX" => Op::Regexp,
            "HAVE" => Op::Have,
            "NOT HAVE" => Op::NotHave,
            "INTERSECT" => Op::Intersect,
            "INTERSECT ALL" => Op::IntersectAll,
            "NOT INTERSECT" => Op::NotIntersect,
            "PREFIX" => Op::Prefix,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::NotEq => "!=",
            Op::Lt => "<",
            Op::Lte => "<=",
            Op::Gt => ">",
            Op::Gte => ">=",
            Op::In => "IN",
            Op::NotIn => "NOT IN",
            Op::Between => "BETWEEN",
            Op::NotBetween => "NOT BETWEEN",
            Op::Like => "LIKE",
            Op::NotLike => "NOT LIKE",
            Op::Regexp => "REGEXP",
            Op::Have => "HAVE",
            Op::NotHave => "NOT HAVE",
            Op::Intersect => "INTERSECT",
            Op::IntersectAll => "INTERSECT ALL",
            Op::NotIntersect => "NOT INTERSECT",
            Op::Prefix => "PREFIX",
        }
    }

    /// `=` or `IN`
    pub fn is_equality(&self) -> bool {
        matches!(self, Op::Eq | Op::In)
    }

    /// Inclusive or exclusive bound, or `BETWEEN`
    pub fn is_range(&self) -> bool {
        matches!(self, Op::Lt | Op::Lte | Op::Gt | Op::Gte | Op::Between)
    }

    /// Operators an index can narrow
    pub fn is_indexable(&self) -> bool {
        self.is_equality() || self.is_range()
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Boolean row-selection expression
#[derive(Debug, Clone, PartialEq)]
pub enum Where {
    Cond {
        column: String,
        op: Op,
        value: Value,
    },
    And(Vec<Where>),
    Or(Vec<Where>),
    Not(Box<Where>),
    /// Predicate helper call compared against a value
    Fn {
        name: String,
        args: Vec<Value>,
        op: Op,
        value: Value,
    },
}

impl Where {
    pub fn cond(column: impl Into<String>, op: Op, value: impl Into<Value>) -> Self {
        Where::Cond {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::cond(column, Op::Eq, value)
    }

    pub fn and(terms: Vec<Where>) -> Self {
        Where::And(terms)
    }

    pub fn or(terms: Vec<Where>) -> Self {
        Where::Or(terms)
    }

    pub fn negate(term: Where) -> Self {
        Where::Not(Box::new(term))
    }

    pub fn func(name: &str, args: Vec<Value>, op: Op, value: impl Into<Value>) -> Self {
        Where::Fn {
            name: name.to_ascii_uppercase(),
            args,
            op,
            value: value.into(),
        }
    }

    /// True if a helper call appears anywhere in the tree
    pub fn has_function(&self) -> bool {
        match self {
            Where::Fn { .. } => true,
            Where::Cond { .. } => false,
            Where::And(terms) | Where::Or(terms) => terms.iter().any(Where::has_function),
            Where::Not(inner) => inner.has_function(),
        }
    }

    /// Parses the JSON array form:
    ///
    /// - `["column", "op", value]`
    /// - `["CROW(lat, lon, 51.5, 0)", "<", 10]`
    /// - `[term, "AND", term, "AND", term]` (or `"OR"`, not mixed)
    /// - `["NOT", term]`
    pub fn from_json(json: &serde_json::Value) -> PlannerResult<Where> {
        let items = json
            .as_array()
            .ok_or_else(|| PlannerError::predicate_invalid(format!("expected array, got {}", json)))?;

        if items.len() == 2 && items[0].as_str().map(|s| s.eq_ignore_ascii_case("NOT")) == Some(true) {
            return Ok(Where::negate(Where::from_json(&items[1])?));
        }

        if items.len() == 3 {
            if let (Some(lhs), Some(op)) = (items[0].as_str(), items[1].as_str()) {
                let op = Op::parse(op)
                    .ok_or_else(|| PlannerError::predicate_invalid(format!("unknown operator '{}'", op)))?;
                let value = Value::from(items[2].clone());
                return Self::leaf(lhs, op, value);
            }
        }

        Self::compound(items)
    }

    fn leaf(lhs: &str, op: Op, value: Value) -> PlannerResult<Where> {
        let call = FunctionCall::parse(lhs).map_err(|e| PlannerError::predicate_invalid(e.to_string()))?;
        Ok(match call {
            Some(call) => Where::Fn {
                name: call.name,
                args: call
                    .args
                    .into_iter()
                    .map(|a| match a {
                        Arg::Star => Value::from("*"),
                        Arg::Column(c) => Value::String(c),
                        Arg::Literal(v) => v,
                    })
                    .collect(),
                op,
                value,
            },
            None => Where::Cond {
                column: lhs.to_string(),
                op,
                value,
            },
        })
    }

    fn compound(items: &[serde_json::Value]) -> PlannerResult<Where> {
        if items.len() < 3 || items.len() % 2 == 0 {
            return Err(PlannerError::predicate_invalid(
                "compound predicate must alternate terms and AND/OR",
            ));
        }

        let mut conjunction: Option<bool> = None;
        let mut terms = Vec::new();
        for (i, item) in items.iter().enumerate() {
            if i % 2 == 1 {
                let is_and = match item.as_str().map(|s| s.to_ascii_uppercase()) {
                    Some(s) if s == "AND" => true,
                    Some(s) if s == "OR" => false,
                    _ => {
                        return Err(PlannerError::predicate_invalid(format!(
                            "expected AND/OR, got {}",
                            item
                        )))
                    }
                };
                match conjunction {
                    Some(c) if c != is_and => {
                        return Err(PlannerError::predicate_invalid(
                            "AND and OR cannot be mixed in one list; nest them",
                        ))
                    }
                    _ => conjunction = Some(is_and),
                }
            } else {
                terms.push(Where::from_json(item)?);
            }
        }

        Ok(if conjunction == Some(true) {
            Where::And(terms)
        } else {
            Where::Or(terms)
        })
    }
}

impl fmt::Display for Where {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |f: &mut fmt::Formatter<'_>, terms: &[Where], sep: &str| -> fmt::Result {
            write!(f, "(")?;
            for (i, t) in terms.iter().enumerate() {
                if i > 0 {
                    write!(f, " {} ", sep)?;
                }
                write!(f, "{}", t)?;
            }
            write!(f, ")")
        };
        match self {
            Where::Cond { column, op, value } => write!(f, "{} {} {}", column, op, value),
            Where::And(terms) => join(f, terms, "AND"),
            Where::Or(terms) => join(f, terms, "OR"),
            Where::Not(inner) => write!(f, "NOT {}", inner),
            Where::Fn { name, args, op, value } => {
                let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "{}({}) {} {}", name, args.join(", "), op, value)
            }
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// One `order_by` key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub column: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Join kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Left,
    Inner,
    Right,
    Cross,
    /// Full outer
    Outer,
}

impl JoinKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinKind::Left => "left",
            JoinKind::Inner => "inner",
            JoinKind::Right => "right",
            JoinKind::Cross => "cross",
            JoinKind::Outer => "outer",
        }
    }
}

/// `left_column op right_column`, both written `table.column`
#[derive(Debug, Clone, PartialEq)]
pub struct JoinOn {
    pub left: String,
    pub op: Op,
    pub right: String,
}

/// A join against another table
#[derive(Debug, Clone, PartialEq)]
pub struct JoinSpec {
    pub kind: JoinKind,
    pub table: String,
    /// Required for every kind except `Cross`
    pub on: Option<JoinOn>,
}

impl JoinSpec {
    pub fn new(kind: JoinKind, table: impl Into<String>, left: &str, op: Op, right: &str) -> Self {
        Self {
            kind,
            table: table.into(),
            on: Some(JoinOn {
                left: left.to_string(),
                op,
                right: right.to_string(),
            }),
        }
    }

    pub fn cross(table: impl Into<String>) -> Self {
        Self {
            kind: JoinKind::Cross,
            table: table.into(),
            on: None,
        }
    }
}

/// What a select column computes
#[derive(Debug, Clone, PartialEq)]
pub enum SelectExpr {
    Column(String),
    Call(FunctionCall),
}

/// A select-list entry such as `"COUNT(*) AS total"`
#[derive(Debug, Clone, PartialEq)]
pub struct SelectColumn {
    pub expr: SelectExpr,
    pub alias: Option<String>,
    text: String,
}

impl SelectColumn {
    pub fn parse(text: &str) -> PlannerResult<Self> {
        let (expr_text, alias) = split_alias(text);
        if expr_text.is_empty() {
            return Err(PlannerError::query_invalid("empty select column"));
        }
        let expr = match FunctionCall::parse(expr_text).map_err(|e| PlannerError::query_invalid(e.to_string()))? {
            Some(call) => SelectExpr::Call(call),
            None => SelectExpr::Column(expr_text.to_string()),
        };
        Ok(Self {
            expr,
            alias: alias.map(str::to_string),
            text: expr_text.to_string(),
        })
    }

    /// Key of this column in result rows
    pub fn output_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.text)
    }
}

/// Relationship operation applied to the rows a query selects
#[derive(Debug, Clone, PartialEq)]
pub enum RelateOp {
    Set { column: String, ids: Vec<Value> },
    Add { column: String, ids: Vec<Value> },
    Delete { column: String, ids: Vec<Value> },
    Drop { column: String },
    /// Re-derive every reference column of the table
    Rebuild,
}

impl RelateOp {
    pub fn name(&self) -> &'static str {
        match self {
            RelateOp::Set { .. } => "set",
            RelateOp::Add { .. } => "add",
            RelateOp::Delete { .. } => "delete",
            RelateOp::Drop { .. } => "drop",
            RelateOp::Rebuild => "rebuild",
        }
    }
}

/// Query actions
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Select,
    /// Insert or replace by pk; with a predicate, partial update of every
    /// matching row
    Upsert(Vec<Row>),
    Delete,
    /// Delete every row
    Drop,
    ShowTables,
    Describe,
    Relate(RelateOp),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Select => "select",
            Action::Upsert(_) => "upsert",
            Action::Delete => "delete",
            Action::Drop => "drop",
            Action::ShowTables => "show tables",
            Action::Describe => "describe",
            Action::Relate(_) => "relate",
        }
    }

    /// Actions that mutate rows
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Action::Upsert(_) | Action::Delete | Action::Drop | Action::Relate(_)
        )
    }
}

/// Query modifiers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Modifiers {
    pub select: Vec<SelectColumn>,
    pub joins: Vec<JoinSpec>,
    pub group_by: Vec<String>,
    pub having: Option<Where>,
    pub order_by: Vec<SortSpec>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

/// Query lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    Pending,
    Processing,
    Complete,
}

impl QueryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryState::Pending => "pending",
            QueryState::Processing => "processing",
            QueryState::Complete => "complete",
        }
    }
}

/// Query descriptor
#[derive(Debug, Clone)]
pub struct Query {
    pub table: String,
    pub action: Action,
    pub predicate: Option<Where>,
    pub modifiers: Modifiers,
    state: QueryState,
    result: Vec<Row>,
    query_id: Uuid,
    time: DateTime<Utc>,
}

impl Query {
    pub fn new(table: impl Into<String>, action: Action) -> Self {
        Self {
            table: table.into(),
            action,
            predicate: None,
            modifiers: Modifiers::default(),
            state: QueryState::Pending,
            result: Vec::new(),
            query_id: Uuid::new_v4(),
            time: Utc::now(),
        }
    }

    pub fn select(table: impl Into<String>) -> Self {
        Self::new(table, Action::Select)
    }

    pub fn upsert(table: impl Into<String>, rows: Vec<Row>) -> Self {
        Self::new(table, Action::Upsert(rows))
    }

    pub fn delete(table: impl Into<String>) -> Self {
        Self::new(table, Action::Delete)
    }

    pub fn drop_rows(table: impl Into<String>) -> Self {
        Self::new(table, Action::Drop)
    }

    pub fn show_tables() -> Self {
        Self::new("", Action::ShowTables)
    }

    pub fn describe(table: impl Into<String>) -> Self {
        Self::new(table, Action::Describe)
    }

    pub fn relate(table: impl Into<String>, op: RelateOp) -> Self {
        Self::new(table, Action::Relate(op))
    }

    pub fn filter(mut self, predicate: Where) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Sets the select list, e.g. `&["name", "COUNT(*) AS total"]`
    pub fn columns(mut self, columns: &[&str]) -> PlannerResult<Self> {
        self.modifiers.select = columns
            .iter()
            .map(|c| SelectColumn::parse(c))
            .collect::<PlannerResult<_>>()?;
        Ok(self)
    }

    pub fn join(mut self, join: JoinSpec) -> Self {
        self.modifiers.joins.push(join);
        self
    }

    pub fn group_by(mut self, columns: &[&str]) -> Self {
        self.modifiers.group_by = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn having(mut self, predicate: Where) -> Self {
        self.modifiers.having = Some(predicate);
        self
    }

    pub fn order_by(mut self, sort: SortSpec) -> Self {
        self.modifiers.order_by.push(sort);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.modifiers.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.modifiers.limit = Some(limit);
        self
    }

    pub fn state(&self) -> QueryState {
        self.state
    }

    pub fn query_id(&self) -> Uuid {
        self.query_id
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    /// Result rows. Empty until the query is complete.
    pub fn result(&self) -> &[Row] {
        &self.result
    }

    pub fn into_result(self) -> Vec<Row> {
        self.result
    }

    /// `pending -> processing`
    pub fn begin(&mut self) -> PlannerResult<()> {
        self.transition(QueryState::Pending, QueryState::Processing)
    }

    /// `processing -> complete`, storing the result rows
    pub fn complete(&mut self, rows: Vec<Row>) -> PlannerResult<()> {
        self.transition(QueryState::Processing, QueryState::Complete)?;
        self.result = rows;
        Ok(())
    }

    fn transition(&mut self, from: QueryState, to: QueryState) -> PlannerResult<()> {
        if self.state != from {
            return Err(PlannerError::invalid_transition(self.state.as_str(), to.as_str()));
        }
        self.state = to;
        Ok(())
    }
}
