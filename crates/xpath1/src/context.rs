/// The dynamic context an expression is evaluated against: the context node
/// plus its 1-based proximity position within a set of `size` nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context<N> {
    node: N,
    position: usize,
    size: usize,
}

impl<N: Copy> Context<N> {
    pub fn new(node: N) -> Self {
        Context {
            node,
            position: 1,
            size: 1,
        }
    }

    pub fn with_position(node: N, position: usize, size: usize) -> Self {
        Context {
            node,
            position,
            size,
        }
    }

    pub fn node(&self) -> N {
        self.node
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn size(&self) -> usize {
        self.size
    }
}
