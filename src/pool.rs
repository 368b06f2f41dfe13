use std::ops::{Index, IndexMut};

/// A single tree entry. Children are slot indices into the owning pool.
#[derive(Debug)]
pub(crate) struct Node<K> {
    pub(crate) key: K,
    pub(crate) height: usize,
    pub(crate) left: Option<usize>,
    pub(crate) right: Option<usize>,
}

impl<K> Node<K> {
    fn leaf(key: K) -> Self {
        Node {
            key,
            height: 1,
            left: None,
            right: None,
        }
    }
}

/// Slot arena for tree nodes. Freed slots are vacated immediately (the node
/// and its key are handed back to the caller) and recycled by later allocs.
#[derive(Debug)]
pub(crate) struct NodePool<K> {
    slots: Vec<Option<Node<K>>>,
    free_list: Vec<usize>,
}

impl<K> NodePool<K> {
    pub(crate) fn new() -> Self {
        NodePool {
            slots: Vec::new(),
            free_list: Vec::new(),
        }
    }

    pub(crate) fn alloc(&mut self, key: K) -> usize {
        if let Some(idx) = self.free_list.pop() {
            debug_assert!(self.slots[idx].is_none(), "free list holds live slot {idx}");
            self.slots[idx] = Some(Node::leaf(key));
            idx
        } else {
            let idx = self.slots.len();
            self.slots.push(Some(Node::leaf(key)));
            idx
        }
    }

    pub(crate) fn free(&mut self, idx: usize) -> Node<K> {
        let node = self.slots[idx]
            .take()
            .unwrap_or_else(|| panic!("double free of node slot {idx}"));
        self.free_list.push(idx);
        node
    }

    /// Number of live nodes.
    pub(crate) fn live(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free_list.clear();
    }

    /// Swap the keys held by two distinct live slots.
    pub(crate) fn swap_keys(&mut self, a: usize, b: usize) {
        assert_ne!(a, b, "swap_keys on a single slot");
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let (l, r) = self.slots.split_at_mut(hi);
        match (l[lo].as_mut(), r[0].as_mut()) {
            (Some(x), Some(y)) => std::mem::swap(&mut x.key, &mut y.key),
            _ => panic!("swap_keys on vacant slot ({a}, {b})"),
        }
    }
}

impl<K> Default for NodePool<K> {
    fn default() -> Self {
        NodePool::new()
    }
}

impl<K> Index<usize> for NodePool<K> {
    type Output = Node<K>;

    fn index(&self, idx: usize) -> &Node<K> {
        self.slots[idx]
            .as_ref()
            .unwrap_or_else(|| panic!("dangling node index {idx}"))
    }
}

impl<K> IndexMut<usize> for NodePool<K> {
    fn index_mut(&mut self, idx: usize) -> &mut Node<K> {
        self.slots[idx]
            .as_mut()
            .unwrap_or_else(|| panic!("dangling node index {idx}"))
    }
}
