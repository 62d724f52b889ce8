//! Shared, possibly cyclic value graphs
//!
//! `Value` is a tree and can never contain a cycle. Callers diffing
//! object graphs with shared or self-referential nodes build them from
//! [`GraphNode`]s instead.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::value::Value;

use super::node::{DiffNode, NodeView};

/// Contents of a graph node
#[derive(Debug)]
pub enum GraphValue {
    Leaf(Value),
    Array(Vec<GraphNode>),
    Object(BTreeMap<String, GraphNode>),
}

/// A reference-counted graph node. Clones share the node.
#[derive(Debug, Clone)]
pub struct GraphNode(Rc<RefCell<GraphValue>>);

impl GraphNode {
    pub fn leaf(value: impl Into<Value>) -> Self {
        Self(Rc::new(RefCell::new(GraphValue::Leaf(value.into()))))
    }

    pub fn array(items: Vec<GraphNode>) -> Self {
        Self(Rc::new(RefCell::new(GraphValue::Array(items))))
    }

    pub fn object() -> Self {
        Self(Rc::new(RefCell::new(GraphValue::Object(BTreeMap::new()))))
    }

    /// Sets `key` on an object node. Ignored on other node kinds.
    pub fn set(&self, key: &str, child: GraphNode) {
        if let GraphValue::Object(map) = &mut *self.0.borrow_mut() {
            map.insert(key.to_string(), child);
        }
    }

    /// Appends to an array node. Ignored on other node kinds.
    pub fn push(&self, child: GraphNode) {
        if let GraphValue::Array(items) = &mut *self.0.borrow_mut() {
            items.push(child);
        }
    }

    /// Builds a graph mirroring a plain value
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Array(items) => Self::array(items.iter().map(Self::from_value).collect()),
            Value::Map(map) => {
                let node = Self::object();
                for (k, v) in map {
                    node.set(k, Self::from_value(v));
                }
                node
            }
            leaf => Self::leaf(leaf.clone()),
        }
    }

    /// Detaches every child so reference cycles can be freed
    pub fn clear(&self) {
        match &mut *self.0.borrow_mut() {
            GraphValue::Array(items) => items.clear(),
            GraphValue::Object(map) => map.clear(),
            GraphValue::Leaf(_) => {}
        }
    }
}

impl DiffNode for GraphNode {
    fn identity(&self) -> Option<usize> {
        match &*self.0.borrow() {
            GraphValue::Leaf(_) => None,
            _ => Some(Rc::as_ptr(&self.0) as *const () as usize),
        }
    }

    fn view(&self) -> NodeView<Self> {
        match &*self.0.borrow() {
            GraphValue::Leaf(v) => NodeView::Leaf(v.clone()),
            GraphValue::Array(items) => NodeView::Array(items.clone()),
            GraphValue::Object(map) => {
                NodeView::Object(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            }
        }
    }
}
