//! A document-ordered, duplicate-free node collection.
//!
//! Nodes live in an arena of slots linked in both directions, which gives
//! constant-time append, prepend and removal through a cursor. Removed slots
//! are unlinked and left in place as tombstones.
use std::fmt;

#[derive(Debug, Clone)]
struct Slot<N> {
    node: N,
    prev: Option<usize>,
    next: Option<usize>,
    live: bool,
}

#[derive(Clone)]
pub struct NodeSet<N> {
    slots: Vec<Slot<N>>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<N> Default for NodeSet<N> {
    fn default() -> Self {
        NodeSet {
            slots: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }
}

impl<N: Copy + Ord> NodeSet<N> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_node(node: N) -> Self {
        let mut set = Self::new();
        set.push_back(node);
        set
    }

    /// Builds a set from nodes in arbitrary order, sorting and removing duplicates.
    pub fn from_unsorted(mut nodes: Vec<N>) -> Self {
        nodes.sort();
        nodes.dedup();
        nodes.into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends a node. Callers keep document order.
    pub fn push_back(&mut self, node: N) {
        let index = self.slots.len();
        self.slots.push(Slot {
            node,
            prev: self.tail,
            next: None,
            live: true,
        });
        match self.tail {
            Some(tail) => self.slots[tail].next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.len += 1;
    }

    /// Prepends a node. Callers keep document order.
    pub fn push_front(&mut self, node: N) {
        let index = self.slots.len();
        self.slots.push(Slot {
            node,
            prev: None,
            next: self.head,
            live: true,
        });
        match self.head {
            Some(head) => self.slots[head].prev = Some(index),
            None => self.tail = Some(index),
        }
        self.head = Some(index);
        self.len += 1;
    }

    pub fn first(&self) -> Option<N> {
        self.head.map(|index| self.slots[index].node)
    }

    pub fn last(&self) -> Option<N> {
        self.tail.map(|index| self.slots[index].node)
    }

    pub fn iter(&self) -> Iter<'_, N> {
        Iter {
            set: self,
            front: self.head,
            back: self.tail,
            remaining: self.len,
        }
    }

    /// A cursor that can drop the node it last returned.
    pub fn cursor(&mut self, reverse: bool) -> Cursor<'_, N> {
        let next = if reverse { self.tail } else { self.head };
        Cursor {
            set: self,
            next,
            current: None,
            reverse,
        }
    }

    pub fn to_vec(&self) -> Vec<N> {
        self.iter().collect()
    }

    /// Linear merge of two document-ordered sets, keeping one copy of shared nodes.
    pub fn merge(a: NodeSet<N>, b: NodeSet<N>) -> NodeSet<N> {
        if a.is_empty() {
            return b;
        }
        if b.is_empty() {
            return a;
        }
        let mut merged = NodeSet::new();
        let mut left = a.iter().peekable();
        let mut right = b.iter().peekable();
        loop {
            let next = match (left.peek(), right.peek()) {
                (Some(&l), Some(&r)) => {
                    if l == r {
                        right.next();
                        left.next()
                    } else if l < r {
                        left.next()
                    } else {
                        right.next()
                    }
                }
                (Some(_), None) => left.next(),
                (None, Some(_)) => right.next(),
                (None, None) => break,
            };
            if let Some(node) = next {
                merged.push_back(node);
            }
        }
        merged
    }

    fn unlink(&mut self, index: usize) {
        if !self.slots[index].live {
            return;
        }
        let Slot { prev, next, .. } = self.slots[index];
        match prev {
            Some(prev) => self.slots[prev].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.slots[next].prev = prev,
            None => self.tail = prev,
        }
        let slot = &mut self.slots[index];
        slot.live = false;
        slot.prev = None;
        slot.next = None;
        self.len -= 1;
    }
}

impl<N: Copy + Ord> FromIterator<N> for NodeSet<N> {
    /// Collects nodes that are already in document order.
    fn from_iter<I: IntoIterator<Item = N>>(iter: I) -> Self {
        let mut set = NodeSet::new();
        for node in iter {
            set.push_back(node);
        }
        set
    }
}

impl<N: Copy + Ord> PartialEq for NodeSet<N> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<N: Copy + Ord + fmt::Debug> fmt::Debug for NodeSet<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'s, N: Copy + Ord> IntoIterator for &'s NodeSet<N> {
    type Item = N;
    type IntoIter = Iter<'s, N>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct Iter<'s, N> {
    set: &'s NodeSet<N>,
    front: Option<usize>,
    back: Option<usize>,
    remaining: usize,
}

impl<N: Copy> Iterator for Iter<'_, N> {
    type Item = N;

    fn next(&mut self) -> Option<N> {
        if self.remaining == 0 {
            return None;
        }
        let slot = &self.set.slots[self.front?];
        self.front = slot.next;
        self.remaining -= 1;
        Some(slot.node)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<N: Copy> DoubleEndedIterator for Iter<'_, N> {
    fn next_back(&mut self) -> Option<N> {
        if self.remaining == 0 {
            return None;
        }
        let slot = &self.set.slots[self.back?];
        self.back = slot.prev;
        self.remaining -= 1;
        Some(slot.node)
    }
}

impl<N: Copy> ExactSizeIterator for Iter<'_, N> {}

/// Walks a [`NodeSet`] in either direction and removes visited nodes in place.
pub struct Cursor<'s, N> {
    set: &'s mut NodeSet<N>,
    next: Option<usize>,
    current: Option<usize>,
    reverse: bool,
}

impl<N: Copy + Ord> Cursor<'_, N> {
    /// Removes the node returned by the last call to `next`.
    pub fn remove_current(&mut self) {
        if let Some(index) = self.current.take() {
            self.set.unlink(index);
        }
    }
}

impl<N: Copy + Ord> Iterator for Cursor<'_, N> {
    type Item = N;

    fn next(&mut self) -> Option<N> {
        let index = self.next?;
        let slot = &self.set.slots[index];
        self.next = if self.reverse { slot.prev } else { slot.next };
        self.current = Some(index);
        Some(slot.node)
    }
}
