//! Commutative structural hash
//!
//! Used by order-independent diffing to put array elements into a
//! canonical order before comparison. Hashes of array elements and of
//! object entries are combined with wrapping addition, so permutations
//! hash identically. Numbers hash by their `f64` value so `1` and `1.0`
//! collide, matching `Value` equality.

use crate::value::Value;

use super::node::{DiffNode, NodeView};

const TAG_NULL: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_NUMBER: u8 = 2;
const TAG_STRING: u8 = 3;
const TAG_BLOB: u8 = 4;
const TAG_ARRAY: u8 = 5;
const TAG_OBJECT: u8 = 6;
const TAG_CYCLE: u8 = 7;

/// Computes the structural hash of a node
pub fn structural_hash<N: DiffNode>(node: &N) -> u32 {
    hash_node(node, &mut Vec::new())
}

fn hash_node<N: DiffNode>(node: &N, ancestors: &mut Vec<usize>) -> u32 {
    let id = node.identity();
    if let Some(id) = id {
        if ancestors.contains(&id) {
            return crc(TAG_CYCLE, &[]);
        }
        ancestors.push(id);
    }

    let h = match node.view() {
        NodeView::Leaf(v) => hash_leaf(&v),
        NodeView::Array(items) => {
            let sum = items
                .iter()
                .fold(0u32, |acc, item| acc.wrapping_add(hash_node(item, ancestors)));
            crc(TAG_ARRAY, &sum.to_le_bytes())
        }
        NodeView::Object(entries) => {
            let sum = entries.iter().fold(0u32, |acc, (k, child)| {
                let key = crc(TAG_STRING, k.as_bytes());
                acc.wrapping_add(key ^ hash_node(child, ancestors).rotate_left(7))
            });
            crc(TAG_OBJECT, &sum.to_le_bytes())
        }
    };

    if id.is_some() {
        ancestors.pop();
    }
    h
}

fn hash_leaf(value: &Value) -> u32 {
    match value {
        Value::Null => crc(TAG_NULL, &[]),
        Value::Bool(b) => crc(TAG_BOOL, &[*b as u8]),
        Value::Int(_) | Value::Float(_) => {
            let f = value.as_f64().unwrap_or(0.0);
            let bits = if f.is_nan() {
                f64::NAN.to_bits()
            } else if f == 0.0 {
                0u64
            } else {
                f.to_bits()
            };
            crc(TAG_NUMBER, &bits.to_le_bytes())
        }
        Value::String(s) => crc(TAG_STRING, s.as_bytes()),
        Value::Blob(b) => crc(TAG_BLOB, b),
        // Composite values reach here only through a materialized leaf
        other => crc(TAG_STRING, other.to_string().as_bytes()),
    }
}

fn crc(tag: u8, bytes: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&[tag]);
    hasher.update(bytes);
    hasher.finalize()
}
