//! Owned snapshots of a tree's shape and plain-text renderings of them.

use std::fmt::{Display, Write};

use itertools::Itertools;

use crate::avl_tree::NodeRef;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape<K> {
    Empty,
    Node {
        key: K,
        height: usize,
        left: Box<Shape<K>>,
        right: Box<Shape<K>>,
    },
}

impl<K: Ord + Clone> Shape<K> {
    pub fn from_node(node: Option<NodeRef<'_, K>>) -> Self {
        match node {
            None => Shape::Empty,
            Some(n) => Shape::Node {
                key: n.key().clone(),
                height: n.height(),
                left: Box::new(Shape::from_node(n.left())),
                right: Box::new(Shape::from_node(n.right())),
            },
        }
    }
}

impl<K> Shape<K> {
    pub fn height(&self) -> usize {
        match self {
            Shape::Empty => 0,
            Shape::Node { height, .. } => *height,
        }
    }

    pub fn key(&self) -> Option<&K> {
        match self {
            Shape::Empty => None,
            Shape::Node { key, .. } => Some(key),
        }
    }

    pub fn keys_in_order(&self) -> Vec<&K> {
        fn walk<'a, K>(shape: &'a Shape<K>, out: &mut Vec<&'a K>) {
            if let Shape::Node {
                key, left, right, ..
            } = shape
            {
                walk(left, out);
                out.push(key);
                walk(right, out);
            }
        }
        let mut keys = Vec::new();
        walk(self, &mut keys);
        keys
    }
}

/// One node per line in key order, indented two spaces per level, so the
/// tree reads as if rotated a quarter turn.
pub fn render_sideways<K: Display>(shape: &Shape<K>) -> String {
    fn traverse<K: Display>(shape: &Shape<K>, level: usize, out: &mut String) {
        if let Shape::Node {
            key,
            height,
            left,
            right,
        } = shape
        {
            traverse(left, level + 1, out);
            writeln!(out, "{}{} (h={})", "  ".repeat(level), key, height)
                .expect("writing to String cannot fail");
            traverse(right, level + 1, out);
        }
    }
    let mut out = String::new();
    traverse(shape, 0, &mut out);
    out
}

/// Breadth-first, one line per depth. Below the root line, every present
/// node of the previous line contributes its two children, `.` marking an
/// absent one.
pub fn render_levels<K: Display>(shape: &Shape<K>) -> String {
    let mut out = String::new();
    let Some(root) = shape.key() else {
        return out;
    };
    writeln!(out, "{}", root).expect("writing to String cannot fail");

    let mut level = vec![shape];
    loop {
        let children = level
            .iter()
            .flat_map(|s| match s {
                Shape::Node { left, right, .. } => [&**left, &**right],
                Shape::Empty => unreachable!("levels only hold present nodes"),
            })
            .collect_vec();
        if children.iter().all(|c| c.key().is_none()) {
            break;
        }
        let line = children
            .iter()
            .map(|c| c.key().map_or_else(|| ".".to_string(), |k| k.to_string()))
            .join(" ");
        writeln!(out, "{}", line).expect("writing to String cannot fail");
        level = children.into_iter().filter(|c| c.key().is_some()).collect();
    }
    out
}
