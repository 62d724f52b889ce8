//! Abstraction over the values the diff engine walks
//!
//! The engine works on any tree or graph exposing a [`NodeView`]. Nodes
//! that can be shared (and therefore form cycles) report an identity;
//! the engine tracks visited identity pairs on its recursion stack.

use std::collections::BTreeMap;

use crate::value::Value;

/// One level of a node
pub enum NodeView<N> {
    /// Scalar value (never Array or Map)
    Leaf(Value),
    Array(Vec<N>),
    /// Entries in key order
    Object(Vec<(String, N)>),
}

/// A walkable node
pub trait DiffNode: Sized {
    /// Stable identity of a composite node, used for cycle detection.
    /// Leaves return `None`.
    fn identity(&self) -> Option<usize>;

    /// The node's shape one level deep
    fn view(&self) -> NodeView<Self>;

    /// Materializes the node as a plain value. A back-edge to an
    /// ancestor is rendered as `Null`.
    fn to_value(&self) -> Value {
        materialize(self, &mut Vec::new())
    }
}

fn materialize<N: DiffNode>(node: &N, ancestors: &mut Vec<usize>) -> Value {
    let id = node.identity();
    if let Some(id) = id {
        if ancestors.contains(&id) {
            return Value::Null;
        }
        ancestors.push(id);
    }

    let value = match node.view() {
        NodeView::Leaf(v) => v,
        NodeView::Array(items) => Value::Array(items.iter().map(|n| materialize(n, ancestors)).collect()),
        NodeView::Object(entries) => Value::Map(
            entries
                .iter()
                .map(|(k, n)| (k.clone(), materialize(n, ancestors)))
                .collect::<BTreeMap<_, _>>(),
        ),
    };

    if id.is_some() {
        ancestors.pop();
    }
    value
}

impl<'a> DiffNode for &'a Value {
    fn identity(&self) -> Option<usize> {
        let value: &'a Value = *self;
        match value {
            Value::Array(_) | Value::Map(_) => Some(value as *const Value as usize),
            _ => None,
        }
    }

    fn view(&self) -> NodeView<Self> {
        let value: &'a Value = *self;
        match value {
            Value::Array(items) => NodeView::Array(items.iter().collect()),
            Value::Map(map) => NodeView::Object(map.iter().map(|(k, v)| (k.clone(), v)).collect()),
            leaf => NodeView::Leaf(leaf.clone()),
        }
    }

    fn to_value(&self) -> Value {
        (*self).clone()
    }
}
