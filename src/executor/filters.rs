//! Predicate evaluation
//!
//! A [`Where`] tree is compiled once per query into a [`CompiledWhere`]:
//! regexes are built, `LIKE` patterns are translated, `PREFIX` terms on
//! trie columns are resolved to the trie's word set, and helpers are
//! looked up. Evaluation then runs per row without further lookups.
//!
//! A column absent from the row evaluates as `Null`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use regex::{Regex, RegexBuilder};

use crate::functions::{PredicateHelper, PredicateHelpers};
use crate::index::TrieIndex;
use crate::planner::{Op, Where};
use crate::value::{get_path, Row, Value};

use super::errors::{ExecutorError, ExecutorResult};

/// Per-value test of one condition
enum Test {
    Compare(Op, Value),
    Pattern { regex: Regex, negate: bool },
    /// PREFIX on a trie column, resolved to the matching words
    Words(BTreeSet<String>),
    /// PREFIX on a column without a trie
    StartsWith(String),
}

impl Test {
    fn compile(column: &str, op: Op, value: &Value, tries: &BTreeMap<String, TrieIndex>) -> ExecutorResult<Test> {
        let text = || {
            value
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| ExecutorError::execution_failed(format!("{} on '{}' needs a string", op, column)))
        };

        Ok(match op {
            Op::Like | Op::NotLike => Test::Pattern {
                regex: like_regex(&text()?)?,
                negate: op == Op::NotLike,
            },
            Op::Regexp => Test::Pattern {
                regex: Regex::new(&text()?).map_err(|e| ExecutorError::execution_failed(e.to_string()))?,
                negate: false,
            },
            Op::Prefix => {
                let prefix = text()?.to_lowercase();
                match tries.get(column) {
                    Some(trie) => Test::Words(trie.trie().get_prefix(&prefix).into_iter().collect()),
                    None => Test::StartsWith(prefix),
                }
            }
            _ => Test::Compare(op, value.clone()),
        })
    }

    fn eval(&self, actual: &Value) -> bool {
        match self {
            Test::Compare(op, expected) => compare(*op, actual, expected),
            Test::Pattern { regex, negate } => {
                let matched = match actual {
                    Value::Null => false,
                    Value::String(s) => regex.is_match(s),
                    other => regex.is_match(&other.to_string()),
                };
                matched != *negate
            }
            Test::Words(words) => actual
                .as_str()
                .map(|s| words.contains(&s.to_lowercase()))
                .unwrap_or(false),
            Test::StartsWith(prefix) => actual
                .as_str()
                .map(|s| s.to_lowercase().starts_with(prefix.as_str()))
                .unwrap_or(false),
        }
    }
}

/// Translates a `%`-wildcard pattern into an anchored, case-insensitive regex
fn like_regex(pattern: &str) -> ExecutorResult<Regex> {
    let body = pattern
        .split('%')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    RegexBuilder::new(&format!("^{}$", body))
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
        .map_err(|e| ExecutorError::execution_failed(e.to_string()))
}

/// Evaluates a comparison or set operator.
///
/// Ordering operators never match `Null`. Pattern operators are compiled
/// separately and do not match here.
pub fn compare(op: Op, actual: &Value, expected: &Value) -> bool {
    let list = |v: &Value| v.to_list();
    match op {
        Op::Eq => actual == expected,
        Op::NotEq => actual != expected,
        Op::Lt => !actual.is_null() && actual < expected,
        Op::Lte => !actual.is_null() && actual <= expected,
        Op::Gt => !actual.is_null() && actual > expected,
        Op::Gte => !actual.is_null() && actual >= expected,
        Op::In => list(expected).contains(actual),
        Op::NotIn => !list(expected).contains(actual),
        Op::Between | Op::NotBetween => {
            let inside = match expected.as_array().map(Vec::as_slice) {
                Some([low, high]) => !actual.is_null() && actual >= low && actual <= high,
                _ => false,
            };
            inside == (op == Op::Between)
        }
        Op::Have => list(actual).contains(expected),
        Op::NotHave => !list(actual).contains(expected),
        Op::Intersect | Op::NotIntersect => {
            let have = list(actual);
            let shared = list(expected).iter().any(|v| have.contains(v));
            shared == (op == Op::Intersect)
        }
        Op::IntersectAll => {
            let have = list(actual);
            list(expected).iter().all(|v| have.contains(v))
        }
        Op::Like | Op::NotLike | Op::Regexp | Op::Prefix => false,
    }
}

enum Node {
    Cond {
        column: String,
        test: Test,
    },
    And(Vec<Node>),
    Or(Vec<Node>),
    Not(Box<Node>),
    Fn {
        name: String,
        helper: PredicateHelper,
        args: Vec<Value>,
        test: Test,
    },
}

/// A predicate ready for per-row evaluation
pub struct CompiledWhere {
    root: Node,
    is_join: bool,
}

impl fmt::Debug for CompiledWhere {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledWhere").field("is_join", &self.is_join).finish()
    }
}

impl CompiledWhere {
    /// Compiles a predicate.
    ///
    /// `tries` maps column names to their trie. With `strip_table`, column
    /// references written `table.column` for that table are resolved
    /// against unprefixed rows.
    pub fn compile(
        predicate: &Where,
        tries: &BTreeMap<String, TrieIndex>,
        helpers: &PredicateHelpers,
        strip_table: Option<&str>,
    ) -> ExecutorResult<Self> {
        let ctx = Compiler { tries, helpers, strip_table };
        Ok(Self {
            root: ctx.node(predicate)?,
            is_join: false,
        })
    }

    /// Marks the predicate as evaluated over joined rows; helpers receive
    /// the flag.
    pub fn for_join(mut self) -> Self {
        self.is_join = true;
        self
    }

    /// Whether the row satisfies the predicate
    pub fn matches(&self, row: &Row) -> ExecutorResult<bool> {
        self.eval(&self.root, row)
    }

    fn eval(&self, node: &Node, row: &Row) -> ExecutorResult<bool> {
        match node {
            Node::Cond { column, test } => Ok(test.eval(get_path(row, column).unwrap_or(&Value::Null))),
            Node::And(terms) => {
                for term in terms {
                    if !self.eval(term, row)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Node::Or(terms) => {
                for term in terms {
                    if self.eval(term, row)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Node::Not(inner) => Ok(!self.eval(inner, row)?),
            Node::Fn { name, helper, args, test } => {
                let value = helper(row, self.is_join, args).map_err(|e| {
                    ExecutorError::execution_failed(format!("predicate helper {} failed: {}", name, e))
                })?;
                Ok(test.eval(&value))
            }
        }
    }
}

struct Compiler<'a> {
    tries: &'a BTreeMap<String, TrieIndex>,
    helpers: &'a PredicateHelpers,
    strip_table: Option<&'a str>,
}

impl Compiler<'_> {
    fn column(&self, column: &str) -> String {
        self.strip_table
            .and_then(|t| column.strip_prefix(t))
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(column)
            .to_string()
    }

    fn node(&self, predicate: &Where) -> ExecutorResult<Node> {
        Ok(match predicate {
            Where::Cond { column, op, value } => {
                let column = self.column(column);
                let test = Test::compile(&column, *op, value, self.tries)?;
                Node::Cond { column, test }
            }
            Where::And(terms) => Node::And(terms.iter().map(|t| self.node(t)).collect::<ExecutorResult<_>>()?),
            Where::Or(terms) => Node::Or(terms.iter().map(|t| self.node(t)).collect::<ExecutorResult<_>>()?),
            Where::Not(inner) => Node::Not(Box::new(self.node(inner)?)),
            Where::Fn { name, args, op, value } => Node::Fn {
                name: name.clone(),
                helper: self.helpers.get(name)?,
                args: args.clone(),
                test: Test::compile(name, *op, value, &BTreeMap::new())?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: serde_json::Value) -> Row {
        match Value::from(value) {
            Value::Map(m) => m,
            _ => panic!("row fixture must be an object"),
        }
    }

    fn matches(predicate: Where, r: &Row) -> bool {
        CompiledWhere::compile(&predicate, &BTreeMap::new(), &PredicateHelpers::with_builtins(), None)
            .unwrap()
            .matches(r)
            .unwrap()
    }

    #[test]
    fn test_comparisons() {
        let r = row(json!({"age": 25, "name": "Alice"}));
        assert!(matches(Where::eq("age", 25), &r));
        assert!(matches(Where::cond("age", Op::Gte, 18), &r));
        assert!(!matches(Where::cond("age", Op::Lt, 25), &r));
        assert!(matches(Where::cond("age", Op::NotEq, 30), &r));
        assert!(matches(Where::cond("age", Op::Eq, 25.0), &r));
    }

    #[test]
    fn test_absent_column_is_null() {
        let r = row(json!({"name": "Alice"}));
        assert!(matches(Where::cond("age", Op::Eq, Value::Null), &r));
        assert!(!matches(Where::cond("age", Op::Lt, 100), &r));
        assert!(matches(Where::cond("age", Op::NotIn, json!([1, 2])), &r));
    }

    #[test]
    fn test_set_operators() {
        let r = row(json!({"id": 2, "tags": ["a", "b"]}));
        assert!(matches(Where::cond("id", Op::In, json!([1, 2])), &r));
        assert!(matches(Where::cond("id", Op::Between, json!([2, 3])), &r));
        assert!(matches(Where::cond("id", Op::NotBetween, json!([3, 4])), &r));
        assert!(matches(Where::cond("tags", Op::Have, "a"), &r));
        assert!(matches(Where::cond("tags", Op::NotHave, "z"), &r));
        assert!(matches(Where::cond("tags", Op::Intersect, json!(["z", "b"])), &r));
        assert!(!matches(Where::cond("tags", Op::IntersectAll, json!(["a", "z"])), &r));
        assert!(matches(Where::cond("tags", Op::NotIntersect, json!(["x", "y"])), &r));
    }

    #[test]
    fn test_like_is_case_insensitive() {
        let r = row(json!({"email": "Alice@Example.com"}));
        assert!(matches(Where::cond("email", Op::Like, "%@example.com"), &r));
        assert!(matches(Where::cond("email", Op::Like, "alice%"), &r));
        assert!(!matches(Where::cond("email", Op::Like, "bob%"), &r));
        assert!(matches(Where::cond("email", Op::NotLike, "bob%"), &r));
        // regex metacharacters in the pattern are literal
        assert!(!matches(Where::cond("email", Op::Like, "alice.example%"), &r));
    }

    #[test]
    fn test_regexp() {
        let r = row(json!({"code": "AB-123"}));
        assert!(matches(Where::cond("code", Op::Regexp, r"^[A-Z]{2}-\d+$"), &r));
        assert!(!matches(Where::cond("code", Op::Regexp, r"^\d"), &r));
    }

    #[test]
    fn test_prefix_uses_trie_words() {
        let mut trie = TrieIndex::new();
        trie.insert_value("Alice");
        trie.insert_value("Alina");
        trie.insert_value("Bob");
        let mut tries = BTreeMap::new();
        tries.insert("name".to_string(), trie);

        let compiled = CompiledWhere::compile(
            &Where::cond("name", Op::Prefix, "AL"),
            &tries,
            &PredicateHelpers::new(),
            None,
        )
        .unwrap();

        assert!(compiled.matches(&row(json!({"name": "alice"}))).unwrap());
        assert!(compiled.matches(&row(json!({"name": "Alina"}))).unwrap());
        assert!(!compiled.matches(&row(json!({"name": "Bob"}))).unwrap());
    }

    #[test]
    fn test_prefix_without_trie() {
        let r = row(json!({"city": "Amsterdam"}));
        assert!(matches(Where::cond("city", Op::Prefix, "ams"), &r));
        assert!(!matches(Where::cond("city", Op::Prefix, "rot"), &r));
    }

    #[test]
    fn test_boolean_combinators() {
        let r = row(json!({"a": 1, "b": 2}));
        assert!(matches(Where::and(vec![Where::eq("a", 1), Where::eq("b", 2)]), &r));
        assert!(!matches(Where::and(vec![Where::eq("a", 1), Where::eq("b", 3)]), &r));
        assert!(matches(Where::or(vec![Where::eq("a", 9), Where::eq("b", 2)]), &r));
        assert!(matches(Where::negate(Where::eq("a", 9)), &r));
    }

    #[test]
    fn test_helper_predicate() {
        let london = row(json!({"lat": 51.5074, "lon": -0.1278}));
        let paris = row(json!({"lat": 48.8566, "lon": 2.3522}));
        let near = Where::func(
            "CROW",
            vec!["lat".into(), "lon".into(), 51.5.into(), (-0.12).into()],
            Op::Lt,
            50,
        );
        assert!(matches(near.clone(), &london));
        assert!(!matches(near, &paris));
    }

    #[test]
    fn test_unknown_helper_fails_compile() {
        let w = Where::func("NOPE", vec![], Op::Eq, 1);
        let result = CompiledWhere::compile(&w, &BTreeMap::new(), &PredicateHelpers::new(), None);
        assert!(result.is_err());
    }

    #[test]
    fn test_strip_table_prefix() {
        let compiled = CompiledWhere::compile(
            &Where::eq("users.name", "bob"),
            &BTreeMap::new(),
            &PredicateHelpers::new(),
            Some("users"),
        )
        .unwrap();
        assert!(compiled.matches(&row(json!({"name": "bob"}))).unwrap());
    }
}
