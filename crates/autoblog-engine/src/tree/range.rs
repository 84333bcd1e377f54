/// A `(node, offset)` position inside a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Boundary<N> {
    pub node: N,
    /// Characters into a text leaf, or a child index into an element.
    pub offset: usize,
}

impl<N> Boundary<N> {
    pub fn new(node: N, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// A live range over concrete nodes of one particular tree instance.
///
/// Live ranges are only meaningful for the tree they were taken from; to
/// survive a reload they go through the range codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LiveRange<N> {
    pub start: Boundary<N>,
    pub end: Boundary<N>,
}

impl<N: Copy + Eq> LiveRange<N> {
    pub fn new(start_node: N, start_offset: usize, end_node: N, end_offset: usize) -> Self {
        Self {
            start: Boundary::new(start_node, start_offset),
            end: Boundary::new(end_node, end_offset),
        }
    }

    /// Range covering `start..end` characters of a single text leaf.
    pub fn within(node: N, start: usize, end: usize) -> Self {
        Self::new(node, start, node, end)
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}
