use std::cmp::{max, Ordering};
use std::fmt;

use thiserror::Error;
use tracing::{debug, trace};

use crate::pool::NodePool;
use crate::shape::Shape;

/// What a delete descends towards: a caller-supplied key, or the slot that
/// holds a key displaced by the two-child successor swap.
enum Target<'a, K> {
    Key(&'a K),
    Slot(usize),
}

impl<K> Clone for Target<'_, K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Target<'_, K> {}

/// A broken structural invariant, found by [`BalancedTree::check_invariants`].
/// Nodes are identified by their arena slot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("node {slot} is out of search order")]
    Order { slot: usize },
    #[error("node {slot} stores height {stored}, expected {expected}")]
    Height {
        slot: usize,
        stored: usize,
        expected: usize,
    },
    #[error("node {slot} has balance factor {balance}")]
    Balance { slot: usize, balance: isize },
    #[error("{reachable} nodes reachable from root but {live} allocated")]
    Count { live: usize, reachable: usize },
}

/// Self-balancing (AVL) search tree over a set of unique keys.
///
/// Nodes live in an arena and refer to their children by slot index, so
/// rotations are index swaps. Every mutation recurses to its target and
/// re-links the subtree root returned by each level on the way back up.
pub struct BalancedTree<K: Ord> {
    pool: NodePool<K>,
    root: Option<usize>,
}

impl<K: Ord> BalancedTree<K> {
    pub fn new() -> Self {
        BalancedTree {
            pool: NodePool::new(),
            root: None,
        }
    }

    pub fn len(&self) -> usize {
        self.pool.live()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Height of the whole tree; 0 when empty.
    pub fn height(&self) -> usize {
        self.height_of(self.root)
    }

    pub fn clear(&mut self) {
        self.pool.clear();
        self.root = None;
    }

    fn height_of(&self, idx: Option<usize>) -> usize {
        idx.map_or(0, |i| self.pool[i].height)
    }

    fn balance_of(&self, idx: Option<usize>) -> isize {
        idx.map_or(0, |i| {
            self.height_of(self.pool[i].left) as isize - self.height_of(self.pool[i].right) as isize
        })
    }

    fn update_height(&mut self, idx: usize) {
        let lh = self.height_of(self.pool[idx].left);
        let rh = self.height_of(self.pool[idx].right);
        self.pool[idx].height = max(lh, rh) + 1;
    }

    fn rotate_right(&mut self, y: usize) -> usize {
        let x = self.pool[y].left.expect("rotate_right without left child");
        let t2 = self.pool[x].right;
        self.pool[x].right = Some(y);
        self.pool[y].left = t2;
        // y now hangs below x, so its height has to settle first
        self.update_height(y);
        self.update_height(x);
        trace!(pivot = y, new_root = x, "rotate right");
        x
    }

    fn rotate_left(&mut self, x: usize) -> usize {
        let y = self.pool[x].right.expect("rotate_left without right child");
        let t2 = self.pool[y].left;
        self.pool[y].left = Some(x);
        self.pool[x].right = t2;
        self.update_height(x);
        self.update_height(y);
        trace!(pivot = x, new_root = y, "rotate left");
        y
    }

    /// Inserts `key` unless it is already present.
    pub fn insert(&mut self, key: K) {
        let (root, fresh) = self.insert_node(self.root, key);
        self.root = Some(root);
        match fresh {
            Some(slot) => debug!(slot, len = self.len(), "inserted"),
            None => debug!("insert of present key ignored"),
        }
        debug_assert_eq!(self.check_invariants(), Ok(()));
    }

    /// Returns the new subtree root and, when a node was created, its slot.
    fn insert_node(&mut self, idx: Option<usize>, key: K) -> (usize, Option<usize>) {
        let Some(i) = idx else {
            let slot = self.pool.alloc(key);
            return (slot, Some(slot));
        };

        let fresh = match key.cmp(&self.pool[i].key) {
            Ordering::Less => {
                let (l, fresh) = self.insert_node(self.pool[i].left, key);
                self.pool[i].left = Some(l);
                fresh
            }
            Ordering::Greater => {
                let (r, fresh) = self.insert_node(self.pool[i].right, key);
                self.pool[i].right = Some(r);
                fresh
            }
            Ordering::Equal => return (i, None),
        };

        self.update_height(i);
        let balance = self.balance_of(Some(i));
        match fresh {
            Some(slot) => (self.rebalance_after_insert(i, balance, slot), fresh),
            None => {
                debug_assert!(balance.abs() <= 1, "duplicate insert unbalanced node {i}");
                (i, None)
            }
        }
    }

    /// Picks the rotation case from where the new key sits relative to the
    /// heavy child.
    fn rebalance_after_insert(&mut self, i: usize, balance: isize, fresh: usize) -> usize {
        if balance > 1 {
            let l = self.pool[i].left.expect("left-heavy node without left child");
            match self.pool[fresh].key.cmp(&self.pool[l].key) {
                Ordering::Less => return self.rotate_right(i),
                Ordering::Greater => {
                    self.pool[i].left = Some(self.rotate_left(l));
                    return self.rotate_right(i);
                }
                Ordering::Equal => {}
            }
        }
        if balance < -1 {
            let r = self.pool[i].right.expect("right-heavy node without right child");
            match self.pool[fresh].key.cmp(&self.pool[r].key) {
                Ordering::Greater => return self.rotate_left(i),
                Ordering::Less => {
                    self.pool[i].right = Some(self.rotate_right(r));
                    return self.rotate_left(i);
                }
                Ordering::Equal => {}
            }
        }
        i
    }

    /// Removes `key` if present.
    pub fn delete(&mut self, key: &K) {
        let before = self.len();
        self.root = self.delete_node(self.root, Target::Key(key));
        if self.len() < before {
            debug!(len = self.len(), "deleted");
        } else {
            debug!("delete of absent key ignored");
        }
        debug_assert_eq!(self.check_invariants(), Ok(()));
    }

    fn min_slot(&self, mut idx: usize) -> usize {
        while let Some(l) = self.pool[idx].left {
            idx = l;
        }
        idx
    }

    fn delete_node(&mut self, idx: Option<usize>, target: Target<'_, K>) -> Option<usize> {
        let i = idx?;
        let cmp = match target {
            Target::Key(k) => k.cmp(&self.pool[i].key),
            Target::Slot(s) => self.pool[s].key.cmp(&self.pool[i].key),
        };
        match cmp {
            Ordering::Less => self.pool[i].left = self.delete_node(self.pool[i].left, target),
            Ordering::Greater => self.pool[i].right = self.delete_node(self.pool[i].right, target),
            Ordering::Equal => match (self.pool[i].left, self.pool[i].right) {
                (Some(_), Some(r)) => {
                    // The successor's key moves up here; the removed key moves
                    // down into the successor's slot, which is the leftmost of
                    // the right subtree and is unlinked by the recursive call.
                    let succ = self.min_slot(r);
                    self.pool.swap_keys(i, succ);
                    self.pool[i].right = self.delete_node(Some(r), Target::Slot(succ));
                }
                (only, None) | (None, only) => {
                    self.pool.free(i);
                    return only;
                }
            },
        }
        Some(self.rebalance_after_delete(i))
    }

    /// Picks the rotation case from the balance sign of the heavy child.
    fn rebalance_after_delete(&mut self, i: usize) -> usize {
        self.update_height(i);
        let balance = self.balance_of(Some(i));
        if balance > 1 {
            let l = self.pool[i].left.expect("left-heavy node without left child");
            if self.balance_of(Some(l)) < 0 {
                self.pool[i].left = Some(self.rotate_left(l));
            }
            return self.rotate_right(i);
        }
        if balance < -1 {
            let r = self.pool[i].right.expect("right-heavy node without right child");
            if self.balance_of(Some(r)) > 0 {
                self.pool[i].right = Some(self.rotate_right(r));
            }
            return self.rotate_left(i);
        }
        i
    }

    pub fn contains(&self, key: &K) -> bool {
        let mut cur = self.root;
        while let Some(i) = cur {
            cur = match key.cmp(&self.pool[i].key) {
                Ordering::Less => self.pool[i].left,
                Ordering::Greater => self.pool[i].right,
                Ordering::Equal => return true,
            };
        }
        false
    }

    pub fn min(&self) -> Option<&K> {
        self.root.map(|r| &self.pool[self.min_slot(r)].key)
    }

    pub fn max(&self) -> Option<&K> {
        let mut idx = self.root?;
        while let Some(r) = self.pool[idx].right {
            idx = r;
        }
        Some(&self.pool[idx].key)
    }

    /// Read-only cursor at the root, for consumers that walk the shape.
    pub fn root(&self) -> Option<NodeRef<'_, K>> {
        self.root.map(|idx| NodeRef { tree: self, idx })
    }

    /// Keys in ascending order.
    pub fn iter(&self) -> Iter<'_, K> {
        let mut iter = Iter {
            tree: self,
            stack: Vec::with_capacity(self.height()),
        };
        iter.push_left_spine(self.root);
        iter
    }

    /// Owned copy of the current shape.
    pub fn snapshot(&self) -> Shape<K>
    where
        K: Clone,
    {
        Shape::from_node(self.root())
    }

    /// Walks the whole tree checking search order, stored heights, balance
    /// factors and that every allocated node is reachable from the root.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let (_, reachable) = self.check_subtree(self.root, None, None)?;
        let live = self.pool.live();
        if reachable != live {
            return Err(InvariantViolation::Count { live, reachable });
        }
        Ok(())
    }

    /// Returns (height, node count) of a valid subtree.
    fn check_subtree(
        &self,
        idx: Option<usize>,
        lo: Option<&K>,
        hi: Option<&K>,
    ) -> Result<(usize, usize), InvariantViolation> {
        let Some(i) = idx else {
            return Ok((0, 0));
        };
        let node = &self.pool[i];
        if lo.is_some_and(|lo| node.key <= *lo) || hi.is_some_and(|hi| node.key >= *hi) {
            return Err(InvariantViolation::Order { slot: i });
        }
        let (lh, lc) = self.check_subtree(node.left, lo, Some(&node.key))?;
        let (rh, rc) = self.check_subtree(node.right, Some(&node.key), hi)?;
        let expected = max(lh, rh) + 1;
        if node.height != expected {
            return Err(InvariantViolation::Height {
                slot: i,
                stored: node.height,
                expected,
            });
        }
        let balance = lh as isize - rh as isize;
        if balance.abs() > 1 {
            return Err(InvariantViolation::Balance { slot: i, balance });
        }
        Ok((expected, lc + rc + 1))
    }
}

impl<K: Ord> Default for BalancedTree<K> {
    fn default() -> Self {
        BalancedTree::new()
    }
}

impl<K: Ord> Extend<K> for BalancedTree<K> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, keys: I) {
        for key in keys {
            self.insert(key);
        }
    }
}

impl<K: Ord> FromIterator<K> for BalancedTree<K> {
    fn from_iter<I: IntoIterator<Item = K>>(keys: I) -> Self {
        let mut tree = BalancedTree::new();
        tree.extend(keys);
        tree
    }
}

impl<K: Ord + fmt::Debug> fmt::Debug for BalancedTree<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Borrowed view of one node: its key, height and children.
pub struct NodeRef<'a, K: Ord> {
    tree: &'a BalancedTree<K>,
    idx: usize,
}

impl<K: Ord> Clone for NodeRef<'_, K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: Ord> Copy for NodeRef<'_, K> {}

impl<'a, K: Ord> NodeRef<'a, K> {
    pub fn key(&self) -> &'a K {
        &self.tree.pool[self.idx].key
    }

    pub fn height(&self) -> usize {
        self.tree.pool[self.idx].height
    }

    /// Left height minus right height.
    pub fn balance(&self) -> isize {
        self.tree.balance_of(Some(self.idx))
    }

    pub fn left(&self) -> Option<NodeRef<'a, K>> {
        self.child(self.tree.pool[self.idx].left)
    }

    pub fn right(&self) -> Option<NodeRef<'a, K>> {
        self.child(self.tree.pool[self.idx].right)
    }

    fn child(&self, idx: Option<usize>) -> Option<NodeRef<'a, K>> {
        idx.map(|idx| NodeRef {
            tree: self.tree,
            idx,
        })
    }
}

impl<K: Ord + fmt::Debug> fmt::Debug for NodeRef<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("key", self.key())
            .field("height", &self.height())
            .finish()
    }
}

/// In-order key iterator.
pub struct Iter<'a, K: Ord> {
    tree: &'a BalancedTree<K>,
    stack: Vec<usize>,
}

impl<K: Ord> Iter<'_, K> {
    fn push_left_spine(&mut self, mut idx: Option<usize>) {
        while let Some(i) = idx {
            self.stack.push(i);
            idx = self.tree.pool[i].left;
        }
    }
}

impl<'a, K: Ord> Iterator for Iter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        let tree = self.tree;
        let i = self.stack.pop()?;
        self.push_left_spine(tree.pool[i].right);
        Some(&tree.pool[i].key)
    }
}

impl<'a, K: Ord> IntoIterator for &'a BalancedTree<K> {
    type Item = &'a K;
    type IntoIter = Iter<'a, K>;

    fn into_iter(self) -> Iter<'a, K> {
        self.iter()
    }
}
