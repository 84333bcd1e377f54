/*!
 * # Document Tree
 *
 * Every page load rebuilds the article from its markdown, so node identity never
 * survives a reload; only the *shape* of the tree does. The highlight engine is
 * therefore written against two small traits instead of a concrete tree:
 *
 * - **`ContentTree`**: ordered, indexable children plus a text-leaf / container
 *   distinction. This is all the range codec needs.
 * - **`TreeMut`**: the handful of mutations the applicator performs (split a
 *   text leaf, create an element, move children).
 *
 * `DocTree` is the arena-backed implementation used by the renderer, the
 * controller and the tests.
 *
 * ## Offsets
 *
 * Boundary offsets follow the DOM convention: inside a text node they count
 * characters (Unicode scalar values), inside an element they count children.
 */

pub mod html;
pub mod position;
pub mod range;
pub mod render;

pub use position::{compare_points, path_from, range_text};
pub use range::{Boundary, LiveRange};
pub use render::{Article, render_markdown};

use std::fmt::Debug;

/// Tags treated as block-level structure. Highlights never straddle these.
pub const BLOCK_TAGS: &[&str] = &[
    "p",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "blockquote",
    "pre",
    "ul",
    "ol",
    "li",
    "table",
    "thead",
    "tbody",
    "tr",
    "th",
    "td",
    "hr",
    "div",
    "article",
    "section",
];

/// Read access to an ordered tree of element and text nodes.
pub trait ContentTree {
    /// Cheap node handle.
    type Node: Copy + Eq + Debug;

    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    fn child_count(&self, node: Self::Node) -> usize;

    fn child_at(&self, node: Self::Node, index: usize) -> Option<Self::Node>;

    /// Text of a text leaf, `None` for elements.
    fn text(&self, node: Self::Node) -> Option<&str>;

    /// Tag name of an element, `None` for text leaves.
    fn tag(&self, node: Self::Node) -> Option<&str>;

    fn attribute(&self, node: Self::Node, name: &str) -> Option<&str>;

    fn is_text(&self, node: Self::Node) -> bool {
        self.text(node).is_some()
    }

    /// Length of a text leaf in characters (0 for elements).
    fn text_len(&self, node: Self::Node) -> usize {
        self.text(node).map_or(0, |text| text.chars().count())
    }

    /// Largest valid boundary offset for `node`.
    fn node_len(&self, node: Self::Node) -> usize {
        if self.is_text(node) {
            self.text_len(node)
        } else {
            self.child_count(node)
        }
    }

    fn is_block(&self, node: Self::Node) -> bool {
        self.tag(node).is_some_and(|tag| BLOCK_TAGS.contains(&tag))
    }

    fn index_in_parent(&self, node: Self::Node) -> Option<usize> {
        let parent = self.parent(node)?;
        (0..self.child_count(parent)).find(|&index| self.child_at(parent, index) == Some(node))
    }

    /// True when `node` is `ancestor` or lies somewhere beneath it.
    fn contains(&self, ancestor: Self::Node, node: Self::Node) -> bool {
        let mut current = Some(node);
        while let Some(candidate) = current {
            if candidate == ancestor {
                return true;
            }
            current = self.parent(candidate);
        }
        false
    }

    /// Deepest node containing both `a` and `b` (inclusive).
    fn common_ancestor(&self, a: Self::Node, b: Self::Node) -> Option<Self::Node> {
        let mut current = Some(a);
        while let Some(candidate) = current {
            if self.contains(candidate, b) {
                return Some(candidate);
            }
            current = self.parent(candidate);
        }
        None
    }
}

/// Structural mutations needed to wrap a range.
pub trait TreeMut: ContentTree {
    /// Split a text leaf at a character offset. The left part keeps `node`'s
    /// identity; the right part becomes a new sibling directly after it, which
    /// is returned.
    fn split_text(&mut self, node: Self::Node, offset: usize) -> Self::Node;

    /// Create a detached element.
    fn create_element(&mut self, tag: &str, attrs: Vec<(String, String)>) -> Self::Node;

    /// Remove `node` from its parent; a no-op for detached nodes.
    fn detach(&mut self, node: Self::Node);

    /// Insert a detached `child` at `index` among `parent`'s children.
    fn insert_child(&mut self, parent: Self::Node, index: usize, child: Self::Node);
}

/// Handle into a [`DocTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed document tree.
///
/// Detached nodes stay in the arena; a tree is rebuilt from markdown on every
/// load, so nothing is ever reclaimed.
#[derive(Debug, Clone, Default)]
pub struct DocTree {
    nodes: Vec<NodeData>,
}

impl DocTree {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn data(&self, node: NodeId) -> &NodeData {
        &self.nodes[node.0]
    }

    fn data_mut(&mut self, node: NodeId) -> &mut NodeData {
        &mut self.nodes[node.0]
    }

    pub fn new_element(&mut self, tag: &str, attrs: Vec<(String, String)>) -> NodeId {
        self.push(NodeKind::Element {
            tag: tag.to_string(),
            attrs,
        })
    }

    pub fn new_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()))
    }

    /// Append a detached `child` as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let index = self.data(parent).children.len();
        self.insert_child(parent, index, child);
    }

    /// Append text under `parent`, extending a trailing text child instead of
    /// creating a sibling so adjacent text always forms one leaf.
    pub fn append_text(&mut self, parent: NodeId, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(&last) = self.data(parent).children.last()
            && let NodeKind::Text(existing) = &mut self.data_mut(last).kind
        {
            existing.push_str(text);
            return;
        }
        let leaf = self.new_text(text);
        self.append_child(parent, leaf);
    }

    pub fn kind(&self, node: NodeId) -> &NodeKind {
        &self.data(node).kind
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.data(node).children
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let NodeKind::Element { attrs, .. } = &mut self.data_mut(node).kind {
            match attrs.iter_mut().find(|(key, _)| key == name) {
                Some((_, existing)) => *existing = value.to_string(),
                None => attrs.push((name.to_string(), value.to_string())),
            }
        }
    }

    /// Detach every child of `node`.
    pub fn clear_children(&mut self, node: NodeId) {
        let children = std::mem::take(&mut self.data_mut(node).children);
        for child in children {
            self.data_mut(child).parent = None;
        }
    }

    /// `node` and everything beneath it, in document (pre-)order.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.data(current).children.iter().rev());
        }
        out
    }

    /// Concatenated text of every leaf beneath `node`.
    pub fn text_content(&self, node: NodeId) -> String {
        self.descendants(node)
            .into_iter()
            .filter_map(|id| match &self.data(id).kind {
                NodeKind::Text(text) => Some(text.as_str()),
                NodeKind::Element { .. } => None,
            })
            .collect()
    }
}

impl ContentTree for DocTree {
    type Node = NodeId;

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.data(node).parent
    }

    fn child_count(&self, node: NodeId) -> usize {
        self.data(node).children.len()
    }

    fn child_at(&self, node: NodeId, index: usize) -> Option<NodeId> {
        self.data(node).children.get(index).copied()
    }

    fn text(&self, node: NodeId) -> Option<&str> {
        match &self.data(node).kind {
            NodeKind::Text(text) => Some(text),
            NodeKind::Element { .. } => None,
        }
    }

    fn tag(&self, node: NodeId) -> Option<&str> {
        match &self.data(node).kind {
            NodeKind::Element { tag, .. } => Some(tag),
            NodeKind::Text(_) => None,
        }
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.data(node).kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    fn index_in_parent(&self, node: NodeId) -> Option<usize> {
        let parent = self.data(node).parent?;
        self.data(parent).children.iter().position(|&c| c == node)
    }
}

impl TreeMut for DocTree {
    fn split_text(&mut self, node: NodeId, offset: usize) -> NodeId {
        let tail = match &mut self.data_mut(node).kind {
            NodeKind::Text(text) => {
                let byte = text
                    .char_indices()
                    .nth(offset)
                    .map_or(text.len(), |(byte, _)| byte);
                text.split_off(byte)
            }
            NodeKind::Element { .. } => String::new(),
        };

        let right = self.new_text(&tail);
        if let Some(parent) = self.data(node).parent
            && let Some(index) = self.index_in_parent(node)
        {
            self.insert_child(parent, index + 1, right);
        }
        right
    }

    fn create_element(&mut self, tag: &str, attrs: Vec<(String, String)>) -> NodeId {
        self.new_element(tag, attrs)
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.data_mut(node).parent.take() {
            self.data_mut(parent).children.retain(|&c| c != node);
        }
    }

    fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        let children = &mut self.data_mut(parent).children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.data_mut(child).parent = Some(parent);
    }
}
