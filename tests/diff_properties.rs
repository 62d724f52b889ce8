//! Structural Diff Property Tests
//!
//! Tests for diff invariants:
//! - diff(x, x) is empty, including for self-referential graphs
//! - New entries of diff(a, b) mirror the Deleted entries of diff(b, a)
//! - Array element changes are reported against the parent array
//! - Structural hashes ignore array order

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use tabula::diff::{
    diff, diff_nodes, diff_with, structural_hash, DiffEntry, DiffKind, DiffOptions, GraphNode,
    ItemChange, PathSegment,
};
use tabula::{Row, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn v(json: serde_json::Value) -> Value {
    Value::from(json)
}

fn random_leaf(rng: &mut StdRng) -> Value {
    match rng.gen_range(0..5) {
        0 => Value::Null,
        1 => Value::Bool(rng.gen_bool(0.5)),
        2 => Value::Int(rng.gen_range(-100..100)),
        3 => Value::Float(rng.gen_range(-1.0..1.0)),
        _ => Value::String(format!("s{}", rng.gen_range(0..20))),
    }
}

fn random_value(rng: &mut StdRng, depth: usize) -> Value {
    if depth == 0 {
        return random_leaf(rng);
    }
    match rng.gen_range(0..3) {
        0 => random_leaf(rng),
        1 => Value::Array((0..rng.gen_range(0..4)).map(|_| random_value(rng, depth - 1)).collect()),
        _ => {
            let mut map = Row::new();
            for _ in 0..rng.gen_range(0..4) {
                map.insert(format!("k{}", rng.gen_range(0..6)), random_value(rng, depth - 1));
            }
            Value::Map(map)
        }
    }
}

fn random_flat_row(rng: &mut StdRng) -> Value {
    let mut map = Row::new();
    for _ in 0..rng.gen_range(0..8) {
        map.insert(format!("c{}", rng.gen_range(0..10)), Value::Int(rng.gen_range(0..3)));
    }
    Value::Map(map)
}

fn added(entries: &[DiffEntry]) -> Vec<(Vec<PathSegment>, Value)> {
    let mut out: Vec<_> = entries
        .iter()
        .filter_map(|e| match e {
            DiffEntry::New { path, rhs } => Some((path.clone(), rhs.clone())),
            _ => None,
        })
        .collect();
    out.sort_by(|a, b| a.0.cmp(&b.0));
    out
}

fn removed(entries: &[DiffEntry]) -> Vec<(Vec<PathSegment>, Value)> {
    let mut out: Vec<_> = entries
        .iter()
        .filter_map(|e| match e {
            DiffEntry::Deleted { path, lhs } => Some((path.clone(), lhs.clone())),
            _ => None,
        })
        .collect();
    out.sort_by(|a, b| a.0.cmp(&b.0));
    out
}

// =============================================================================
// Identity
// =============================================================================

/// A value compared with itself or a clone yields nothing.
#[test]
fn test_identity_on_random_values() {
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..200 {
        let value = random_value(&mut rng, 3);
        assert!(diff(&value, &value).is_empty());
        assert!(diff(&value, &value.clone()).is_empty());
    }
}

/// A graph that refers to itself diffs empty against itself.
#[test]
fn test_identity_on_self_referential_graph() {
    let root = GraphNode::object();
    let items = GraphNode::array(vec![GraphNode::leaf(1), GraphNode::leaf("two")]);
    root.set("items", items.clone());
    root.set("self", root.clone());
    items.push(root.clone());

    assert!(diff_nodes(&root, &root, DiffOptions::default()).is_empty());
    assert!(diff_nodes(
        &root,
        &root,
        DiffOptions {
            order_independent: true
        }
    )
    .is_empty());

    root.clear();
    items.clear();
}

// =============================================================================
// Symmetry
// =============================================================================

/// Keys only on the right are New one way and Deleted the other way.
#[test]
fn test_new_and_deleted_are_symmetric() {
    let mut rng = StdRng::seed_from_u64(19);
    for _ in 0..200 {
        let a = random_flat_row(&mut rng);
        let b = random_flat_row(&mut rng);

        let forward = diff(&a, &b);
        let backward = diff(&b, &a);
        assert_eq!(added(&forward), removed(&backward));
        assert_eq!(removed(&forward), added(&backward));

        let edits = |entries: &[DiffEntry]| entries.iter().filter(|e| e.kind() == DiffKind::Edited).count();
        assert_eq!(edits(&forward), edits(&backward));
    }
}

// =============================================================================
// Arrays
// =============================================================================

/// Replacing the last element of a nested array is one ArrayChange edit.
#[test]
fn test_array_element_replacement() {
    let a = v(json!({"a": 1, "b": [1, 2, 3]}));
    let b = v(json!({"a": 1, "b": [1, 2, 4]}));

    assert_eq!(
        diff(&a, &b),
        vec![DiffEntry::ArrayChange {
            path: vec![PathSegment::Key("b".into())],
            index: 2,
            item: ItemChange::Edited {
                lhs: Value::Int(3),
                rhs: Value::Int(4),
            },
        }]
    );
}

/// Growing an array reports each appended element as new.
#[test]
fn test_array_growth() {
    let a = v(json!({"tags": ["x"]}));
    let b = v(json!({"tags": ["x", "y", "z"]}));

    let changes = diff(&a, &b);
    assert_eq!(changes.len(), 2);
    for (entry, (index, word)) in changes.iter().zip([(1, "y"), (2, "z")]) {
        assert_eq!(
            entry,
            &DiffEntry::ArrayChange {
                path: vec![PathSegment::Key("tags".into())],
                index,
                item: ItemChange::New { rhs: Value::from(word) },
            }
        );
    }
}

/// Permutations are invisible to order-independent diffs and hashes.
#[test]
fn test_order_independence() {
    let mut rng = StdRng::seed_from_u64(41);
    for _ in 0..50 {
        let mut items: Vec<Value> = (0..6).map(|_| random_value(&mut rng, 1)).collect();
        let original = Value::Array(items.clone());
        items.reverse();
        let reversed = Value::Array(items);

        let (lhs, rhs) = (&original, &reversed);
        assert_eq!(structural_hash(&lhs), structural_hash(&rhs));
        assert!(diff_with(
            &original,
            &reversed,
            DiffOptions {
                order_independent: true
            }
        )
        .is_empty());
    }
}
