//! Diff algorithm
//!
//! Recursive walk over two nodes. Composite nodes with an identity are
//! pushed onto a stack of `(lhs, rhs)` identity pairs; meeting an lhs
//! that is already on the stack stops the descent. If it is paired with
//! a different rhs than before, the pair is reported as `Edited`.

use crate::value::Value;

use super::entry::{DiffEntry, PathSegment};
use super::hash::structural_hash;
use super::node::{DiffNode, NodeView};

/// Diff options
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffOptions {
    /// Compare arrays as multisets: elements are sorted by structural
    /// hash before the positional comparison.
    pub order_independent: bool,
}

/// Diffs two plain values
pub fn diff(lhs: &Value, rhs: &Value) -> Vec<DiffEntry> {
    diff_nodes(&lhs, &rhs, DiffOptions::default())
}

/// Diffs two plain values with options
pub fn diff_with(lhs: &Value, rhs: &Value, options: DiffOptions) -> Vec<DiffEntry> {
    diff_nodes(&lhs, &rhs, options)
}

/// Diffs any two walkable nodes
pub fn diff_nodes<N: DiffNode>(lhs: &N, rhs: &N, options: DiffOptions) -> Vec<DiffEntry> {
    let mut differ = Differ {
        options,
        changes: Vec::new(),
        stack: Vec::new(),
    };
    let mut path = Vec::new();
    differ.walk(Some(lhs), Some(rhs), &mut path);
    differ.changes
}

struct Differ {
    options: DiffOptions,
    changes: Vec<DiffEntry>,
    stack: Vec<(usize, Option<usize>)>,
}

impl Differ {
    fn walk<N: DiffNode>(&mut self, lhs: Option<&N>, rhs: Option<&N>, path: &mut Vec<PathSegment>) {
        let (lhs, rhs) = match (lhs, rhs) {
            (None, None) => return,
            (None, Some(r)) => {
                self.changes.push(DiffEntry::New {
                    path: path.clone(),
                    rhs: r.to_value(),
                });
                return;
            }
            (Some(l), None) => {
                self.changes.push(DiffEntry::Deleted {
                    path: path.clone(),
                    lhs: l.to_value(),
                });
                return;
            }
            (Some(l), Some(r)) => (l, r),
        };

        let lhs_id = lhs.identity();
        let rhs_id = rhs.identity();
        if lhs_id.is_some() && lhs_id == rhs_id {
            return;
        }

        let seen = lhs_id.and_then(|lid| {
            self.stack
                .iter()
                .find(|(l, _)| *l == lid)
                .map(|&(_, r)| r)
        });
        if let Some(seen_rhs) = seen {
            if seen_rhs != rhs_id {
                self.edited(path, lhs, rhs);
            }
            return;
        }

        match (lhs.view(), rhs.view()) {
            (NodeView::Leaf(a), NodeView::Leaf(b)) => {
                if a != b {
                    self.changes.push(DiffEntry::Edited {
                        path: path.clone(),
                        lhs: a,
                        rhs: b,
                    });
                }
            }
            (NodeView::Array(a), NodeView::Array(b)) => {
                self.enter(lhs_id, rhs_id);
                self.walk_arrays(a, b, path);
                self.leave(lhs_id);
            }
            (NodeView::Object(a), NodeView::Object(b)) => {
                self.enter(lhs_id, rhs_id);
                self.walk_objects(a, b, path);
                self.leave(lhs_id);
            }
            _ => self.edited(path, lhs, rhs),
        }
    }

    fn walk_arrays<N: DiffNode>(&mut self, lhs: Vec<N>, rhs: Vec<N>, path: &mut Vec<PathSegment>) {
        let (lhs, rhs) = if self.options.order_independent {
            (canonical_order(lhs), canonical_order(rhs))
        } else {
            (lhs, rhs)
        };

        let len = lhs.len().max(rhs.len());
        for i in 0..len {
            let start = self.changes.len();
            path.push(PathSegment::Index(i));
            self.walk(lhs.get(i), rhs.get(i), path);
            path.pop();

            // Changes landing exactly on the element become array changes
            let produced: Vec<DiffEntry> = self.changes.drain(start..).collect();
            for entry in produced {
                self.changes.push(entry.into_array_change(path, i));
            }
        }
    }

    fn walk_objects<N: DiffNode>(
        &mut self,
        lhs: Vec<(String, N)>,
        rhs: Vec<(String, N)>,
        path: &mut Vec<PathSegment>,
    ) {
        for (key, l) in &lhs {
            path.push(PathSegment::Key(key.clone()));
            let r = rhs.iter().find(|(k, _)| k == key).map(|(_, n)| n);
            self.walk(Some(l), r, path);
            path.pop();
        }
        for (key, r) in &rhs {
            if lhs.iter().any(|(k, _)| k == key) {
                continue;
            }
            path.push(PathSegment::Key(key.clone()));
            self.walk(None, Some(r), path);
            path.pop();
        }
    }

    fn edited<N: DiffNode>(&mut self, path: &[PathSegment], lhs: &N, rhs: &N) {
        self.changes.push(DiffEntry::Edited {
            path: path.to_vec(),
            lhs: lhs.to_value(),
            rhs: rhs.to_value(),
        });
    }

    fn enter(&mut self, lhs_id: Option<usize>, rhs_id: Option<usize>) {
        if let Some(lid) = lhs_id {
            self.stack.push((lid, rhs_id));
        }
    }

    fn leave(&mut self, lhs_id: Option<usize>) {
        if lhs_id.is_some() {
            self.stack.pop();
        }
    }
}

fn canonical_order<N: DiffNode>(items: Vec<N>) -> Vec<N> {
    let mut keyed: Vec<(u32, N)> = items
        .into_iter()
        .map(|n| (structural_hash(&n), n))
        .collect();
    keyed.sort_by_key(|(h, _)| *h);
    keyed.into_iter().map(|(_, n)| n).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{GraphNode, ItemChange};
    use serde_json::json;

    fn v(j: serde_json::Value) -> Value {
        Value::from(j)
    }

    fn key(k: &str) -> PathSegment {
        PathSegment::Key(k.to_string())
    }

    #[test]
    fn test_array_element_edit() {
        let a = v(json!({"a": 1, "b": [1, 2, 3]}));
        let b = v(json!({"a": 1, "b": [1, 2, 4]}));

        let changes = diff(&a, &b);
        assert_eq!(
            changes,
            vec![DiffEntry::ArrayChange {
                path: vec![key("b")],
                index: 2,
                item: ItemChange::Edited {
                    lhs: Value::Int(3),
                    rhs: Value::Int(4)
                },
            }]
        );
    }

    #[test]
    fn test_identical_values_have_no_diff() {
        let a = v(json!({"x": [1, {"y": null}], "z": "s"}));
        assert!(diff(&a, &a).is_empty());
        assert!(diff(&a, &a.clone()).is_empty());
    }

    #[test]
    fn test_nan_equals_nan() {
        let a = Value::Float(f64::NAN);
        assert!(diff(&a, &Value::Float(f64::NAN)).is_empty());
    }

    #[test]
    fn test_new_deleted_and_edited_keys() {
        let a = v(json!({"keep": 1, "gone": true, "change": "a"}));
        let b = v(json!({"keep": 1, "added": [1], "change": "b"}));

        let changes = diff(&a, &b);
        assert_eq!(changes.len(), 3);
        assert!(changes.contains(&DiffEntry::Deleted {
            path: vec![key("gone")],
            lhs: Value::Bool(true)
        }));
        assert!(changes.contains(&DiffEntry::New {
            path: vec![key("added")],
            rhs: v(json!([1]))
        }));
        assert!(changes.contains(&DiffEntry::Edited {
            path: vec![key("change")],
            lhs: Value::from("a"),
            rhs: Value::from("b")
        }));
    }

    #[test]
    fn test_type_change_is_edit() {
        let a = v(json!({"k": [1]}));
        let b = v(json!({"k": {"0": 1}}));
        let changes = diff(&a, &b);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path(), &[key("k")]);
        assert_eq!(changes[0].kind(), crate::diff::DiffKind::Edited);
    }

    #[test]
    fn test_array_tail_changes() {
        let a = v(json!([1, 2, 3, 4]));
        let b = v(json!([1, 2]));
        let changes = diff(&a, &b);
        assert_eq!(
            changes,
            vec![
                DiffEntry::ArrayChange {
                    path: vec![],
                    index: 2,
                    item: ItemChange::Deleted { lhs: Value::Int(3) }
                },
                DiffEntry::ArrayChange {
                    path: vec![],
                    index: 3,
                    item: ItemChange::Deleted { lhs: Value::Int(4) }
                },
            ]
        );
    }

    #[test]
    fn test_nested_change_inside_array_keeps_full_path() {
        let a = v(json!({"rows": [{"n": 1}]}));
        let b = v(json!({"rows": [{"n": 2}]}));
        let changes = diff(&a, &b);
        assert_eq!(
            changes,
            vec![DiffEntry::Edited {
                path: vec![key("rows"), PathSegment::Index(0), key("n")],
                lhs: Value::Int(1),
                rhs: Value::Int(2)
            }]
        );
    }

    #[test]
    fn test_order_independent_arrays() {
        let a = v(json!({"tags": ["x", "y", "z"]}));
        let b = v(json!({"tags": ["z", "x", "y"]}));
        assert!(!diff(&a, &b).is_empty());

        let opts = DiffOptions {
            order_independent: true,
        };
        assert!(diff_with(&a, &b, opts).is_empty());
    }

    #[test]
    fn test_self_referential_graph_terminates() {
        let a = GraphNode::object();
        a.set("name", GraphNode::leaf("a"));
        a.set("me", a.clone());

        let opts = DiffOptions::default();
        assert!(diff_nodes(&a, &a, opts).is_empty());

        let b = GraphNode::object();
        b.set("name", GraphNode::leaf("a"));
        b.set("me", b.clone());
        assert!(diff_nodes(&a, &b, opts).is_empty());

        let c = GraphNode::object();
        c.set("name", GraphNode::leaf("c"));
        c.set("me", c.clone());
        let changes = diff_nodes(&a, &c, opts);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path(), &[key("name")]);

        a.clear();
        b.clear();
        c.clear();
    }

    #[test]
    fn test_cycle_rebound_to_other_node_is_edit() {
        // a.next points back at a; b.next points at b2. Walking meets lhs
        // `a` again, now paired with b2 instead of b.
        let a = GraphNode::object();
        a.set("next", a.clone());

        let b = GraphNode::object();
        let b2 = GraphNode::object();
        b.set("next", b2.clone());
        b2.set("next", b.clone());

        let changes = diff_nodes(&a, &b, DiffOptions::default());
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path(), &[key("next")]);
        assert_eq!(changes[0].kind(), crate::diff::DiffKind::Edited);

        a.clear();
        b.clear();
        b2.clear();
    }
}
