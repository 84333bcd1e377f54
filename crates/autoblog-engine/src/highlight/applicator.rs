//! Wrapping a live range in a highlight element.
//!
//! The wrap follows the rules of DOM `surroundContents`: both endpoints must
//! sit directly in one container, either as boundaries of the container
//! itself or inside text children of it. A range that would cut an element
//! in half (typically a selection running from one paragraph into the next)
//! is rejected with [`ApplyError::CrossesBoundary`] before anything in the
//! tree changes. So is a range that would enclose whole block elements, such
//! as two paragraphs picked up from the article root's child gaps.

use thiserror::Error;

use super::{HighlightColor, HighlightId};
use crate::tree::{Boundary, ContentTree, LiveRange, TreeMut, compare_points, path_from};

pub const HIGHLIGHT_TAG: &str = "span";
pub const ID_ATTR: &str = "data-highlight-id";
pub const COLOR_ATTR: &str = "data-highlight-color";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    #[error(
        "Cannot highlight across multiple paragraphs (block-level elements). Please select text within a paragraph."
    )]
    CrossesBoundary,
    #[error("range selects nothing")]
    EmptyRange,
    #[error("offset {offset} is past the end of its node (length {len})")]
    InvalidOffset { offset: usize, len: usize },
}

/// Whatever holds the reader's current selection.
///
/// A successful apply clears it so the fresh highlight is not left selected.
pub trait SelectionSurface {
    fn clear_selection(&mut self);
}

/// Headless surface with no selection to clear.
impl SelectionSurface for () {
    fn clear_selection(&mut self) {}
}

/// Where one endpoint sits relative to the wrapping container.
#[derive(Debug, Clone, Copy)]
enum Edge {
    /// A child-index boundary of the container itself.
    Gap(usize),
    /// A character offset into the container's child at `index`.
    Text { index: usize, offset: usize, len: usize },
}

impl Edge {
    fn splits(&self) -> bool {
        matches!(*self, Edge::Text { offset, len, .. } if offset > 0 && offset < len)
    }
}

/// Wrap `range` in a highlight element carrying `id` and `color`.
///
/// Returns the new element. On error the tree is untouched.
pub fn apply<T, S>(
    tree: &mut T,
    range: &LiveRange<T::Node>,
    id: &HighlightId,
    color: HighlightColor,
    surface: &mut S,
) -> Result<T::Node, ApplyError>
where
    T: TreeMut,
    S: SelectionSurface + ?Sized,
{
    check_offset(tree, range.start)?;
    check_offset(tree, range.end)?;

    let wrapper = if range.start.node == range.end.node && tree.is_text(range.start.node) {
        wrap_within_text(tree, range, id, color)?
    } else {
        wrap_across_children(tree, range, id, color)?
    };

    surface.clear_selection();
    log::debug!("applied highlight {id} ({color})");
    Ok(wrapper)
}

fn check_offset<T: ContentTree>(tree: &T, boundary: Boundary<T::Node>) -> Result<(), ApplyError> {
    let len = tree.node_len(boundary.node);
    if boundary.offset > len {
        return Err(ApplyError::InvalidOffset {
            offset: boundary.offset,
            len,
        });
    }
    Ok(())
}

fn wrap_within_text<T: TreeMut>(
    tree: &mut T,
    range: &LiveRange<T::Node>,
    id: &HighlightId,
    color: HighlightColor,
) -> Result<T::Node, ApplyError> {
    let node = range.start.node;
    let (start, end) = (range.start.offset, range.end.offset);
    if start >= end {
        return Err(ApplyError::EmptyRange);
    }
    let container = tree.parent(node).ok_or(ApplyError::CrossesBoundary)?;

    if end < tree.text_len(node) {
        tree.split_text(node, end);
    }
    let middle = if start > 0 {
        tree.split_text(node, start)
    } else {
        node
    };
    let index = tree
        .index_in_parent(middle)
        .ok_or(ApplyError::CrossesBoundary)?;

    Ok(wrap(tree, container, index, index + 1, id, color))
}

fn wrap_across_children<T: TreeMut>(
    tree: &mut T,
    range: &LiveRange<T::Node>,
    id: &HighlightId,
    color: HighlightColor,
) -> Result<T::Node, ApplyError> {
    let container = tree
        .common_ancestor(range.start.node, range.end.node)
        .ok_or(ApplyError::CrossesBoundary)?;
    let start = edge(tree, container, range.start)?;
    let end = edge(tree, container, range.end)?;

    let (Some(start_path), Some(end_path)) = (
        path_from(tree, container, range.start.node),
        path_from(tree, container, range.end.node),
    ) else {
        return Err(ApplyError::CrossesBoundary);
    };
    if compare_points(&start_path, range.start.offset, &end_path, range.end.offset).is_ge() {
        return Err(ApplyError::EmptyRange);
    }

    // Whole children covered by the range, in pre-split indices. An inline
    // highlight may never enclose a block.
    let covered_from = match start {
        Edge::Gap(index) | Edge::Text { index, .. } => index,
    };
    let covered_to = match end {
        Edge::Gap(index) => index,
        Edge::Text { index, .. } => index + 1,
    };
    let encloses_block = (covered_from..covered_to)
        .filter_map(|index| tree.child_at(container, index))
        .any(|child| tree.is_block(child));
    if encloses_block {
        return Err(ApplyError::CrossesBoundary);
    }

    // Child indices after any splits: splitting the start leaf pushes every
    // later sibling one place to the right.
    let shift = usize::from(start.splits());
    let first = match start {
        Edge::Gap(index) => index,
        Edge::Text { index, offset, .. } if offset == 0 => index,
        Edge::Text { index, .. } => index + 1,
    };
    let last = match end {
        Edge::Gap(index) => index + shift,
        Edge::Text { index, offset, .. } if offset == 0 => index + shift,
        Edge::Text { index, .. } => index + 1 + shift,
    };
    if first >= last {
        return Err(ApplyError::EmptyRange);
    }

    if end.splits() {
        tree.split_text(range.end.node, range.end.offset);
    }
    if start.splits() {
        tree.split_text(range.start.node, range.start.offset);
    }

    Ok(wrap(tree, container, first, last, id, color))
}

fn edge<T: ContentTree>(
    tree: &T,
    container: T::Node,
    boundary: Boundary<T::Node>,
) -> Result<Edge, ApplyError> {
    if boundary.node == container {
        return Ok(Edge::Gap(boundary.offset));
    }
    if tree.is_text(boundary.node) && tree.parent(boundary.node) == Some(container) {
        let index = tree
            .index_in_parent(boundary.node)
            .ok_or(ApplyError::CrossesBoundary)?;
        return Ok(Edge::Text {
            index,
            offset: boundary.offset,
            len: tree.text_len(boundary.node),
        });
    }
    Err(ApplyError::CrossesBoundary)
}

/// Move `container`'s children `first..last` into a new highlight element
/// inserted where they were.
fn wrap<T: TreeMut>(
    tree: &mut T,
    container: T::Node,
    first: usize,
    last: usize,
    id: &HighlightId,
    color: HighlightColor,
) -> T::Node {
    let moved: Vec<T::Node> = (first..last)
        .filter_map(|index| tree.child_at(container, index))
        .collect();

    let wrapper = tree.create_element(
        HIGHLIGHT_TAG,
        vec![
            (ID_ATTR.to_string(), id.to_string()),
            (COLOR_ATTR.to_string(), color.to_string()),
            ("class".to_string(), color.css_class().to_string()),
        ],
    );
    tree.insert_child(container, first, wrapper);
    for (index, child) in moved.into_iter().enumerate() {
        tree.insert_child(wrapper, index, child);
    }
    wrapper
}

fn is_highlight<T: ContentTree>(tree: &T, node: T::Node, id: &HighlightId) -> bool {
    tree.attribute(node, ID_ATTR) == Some(id.as_str())
}

/// True when `node`, one of its ancestors or one of its descendants is the
/// highlight element for `id`.
pub fn is_already_applied<T: ContentTree>(tree: &T, node: T::Node, id: &HighlightId) -> bool {
    let mut current = Some(node);
    while let Some(candidate) = current {
        if is_highlight(tree, candidate, id) {
            return true;
        }
        current = tree.parent(candidate);
    }
    find_highlight(tree, node, id).is_some()
}

/// The highlight element for `id` at or beneath `scope`.
pub fn find_highlight<T: ContentTree>(
    tree: &T,
    scope: T::Node,
    id: &HighlightId,
) -> Option<T::Node> {
    if is_highlight(tree, scope, id) {
        return Some(scope);
    }
    (0..tree.child_count(scope))
        .filter_map(|index| tree.child_at(scope, index))
        .find_map(|child| find_highlight(tree, child, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Article, DocTree, NodeId, render_markdown};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[derive(Default)]
    struct RecordingSurface {
        cleared: usize,
    }

    impl SelectionSurface for RecordingSurface {
        fn clear_selection(&mut self) {
            self.cleared += 1;
        }
    }

    fn node_at(article: &Article, path: &[usize]) -> NodeId {
        path.iter().fold(article.root(), |node, &index| {
            article.tree().child_at(node, index).unwrap()
        })
    }

    fn id(value: &str) -> HighlightId {
        HighlightId::new(value)
    }

    #[test]
    fn test_wraps_middle_of_single_leaf() {
        // Given a paragraph with one text leaf
        let mut article = render_markdown("say hello world now");
        let leaf = node_at(&article, &[0, 0]);
        let mut surface = RecordingSurface::default();

        // When the middle words are highlighted
        let span = apply(
            article.tree_mut(),
            &LiveRange::within(leaf, 4, 15),
            &id("h1"),
            HighlightColor::Yellow,
            &mut surface,
        )
        .unwrap();

        // Then they are wrapped in place and the selection is cleared
        insta::assert_snapshot!(
            article.to_html(),
            @r#"<div class="article"><p>say <span data-highlight-id="h1" data-highlight-color="yellow" class="highlight highlight-yellow">hello world</span> now</p></div>"#
        );
        assert_eq!(article.tree().text_content(span), "hello world");
        assert_eq!(surface.cleared, 1);
    }

    #[test]
    fn test_whole_leaf_creates_no_empty_text_nodes() {
        let mut article = render_markdown("hello world");
        let leaf = node_at(&article, &[0, 0]);
        let p = node_at(&article, &[0]);

        apply(
            article.tree_mut(),
            &LiveRange::within(leaf, 0, 11),
            &id("h1"),
            HighlightColor::Green,
            &mut (),
        )
        .unwrap();

        let tree = article.tree();
        assert_eq!(tree.child_count(p), 1);
        let span = tree.child_at(p, 0).unwrap();
        assert_eq!(tree.attribute(span, COLOR_ATTR), Some("green"));
        assert_eq!(tree.children(span), &[leaf]);
    }

    #[test]
    fn test_wraps_across_inline_elements() {
        // Given text around an emphasised word
        let mut article = render_markdown("one *two* three");
        let first = node_at(&article, &[0, 0]);
        let last = node_at(&article, &[0, 2]);

        // When the selection runs from the first leaf to the last
        apply(
            article.tree_mut(),
            &LiveRange::new(first, 2, last, 3),
            &id("h1"),
            HighlightColor::Yellow,
            &mut (),
        )
        .unwrap();

        // Then the emphasis moves whole into the highlight
        insta::assert_snapshot!(
            article.to_html(),
            @r#"<div class="article"><p>on<span data-highlight-id="h1" data-highlight-color="yellow" class="highlight highlight-yellow">e <em>two</em> th</span>ree</p></div>"#
        );
    }

    #[test]
    fn test_element_boundaries_select_children() {
        let mut article = render_markdown("one *two* three");
        let p = node_at(&article, &[0]);

        apply(
            article.tree_mut(),
            &LiveRange::new(p, 1, p, 2),
            &id("h1"),
            HighlightColor::Yellow,
            &mut (),
        )
        .unwrap();

        let tree = article.tree();
        let span = tree.child_at(p, 1).unwrap();
        assert_eq!(tree.attribute(span, ID_ATTR), Some("h1"));
        assert_eq!(tree.text_content(span), "two");
        assert_eq!(tree.child_count(p), 3);
    }

    #[test]
    fn test_cross_paragraph_range_is_rejected_without_mutation() {
        // Given two paragraphs
        let mut article = render_markdown("first paragraph\n\nsecond paragraph");
        let before = article.to_html();
        let start = node_at(&article, &[0, 0]);
        let end = node_at(&article, &[1, 0]);
        let mut surface = RecordingSurface::default();

        // When a selection spanning both is applied
        let result = apply(
            article.tree_mut(),
            &LiveRange::new(start, 6, end, 6),
            &id("h1"),
            HighlightColor::Yellow,
            &mut surface,
        );

        // Then it fails and nothing changed
        assert_eq!(result, Err(ApplyError::CrossesBoundary));
        assert_eq!(article.to_html(), before);
        assert_eq!(surface.cleared, 0);
    }

    #[rstest]
    #[case::paragraphs_from_root_gaps("first paragraph\n\nsecond paragraph", &[], 0, 2)]
    #[case::list_items_from_list_gaps("- one\n- two", &[0], 0, 2)]
    #[case::single_block_from_root_gaps("only paragraph", &[], 0, 1)]
    fn test_range_enclosing_blocks_is_rejected_without_mutation(
        #[case] markdown: &str,
        #[case] container_path: &[usize],
        #[case] start: usize,
        #[case] end: usize,
    ) {
        // Given a selection made of child gaps around whole blocks
        let mut article = render_markdown(markdown);
        let before = article.to_html();
        let container = node_at(&article, container_path);
        let mut surface = RecordingSurface::default();

        // When it is applied
        let result = apply(
            article.tree_mut(),
            &LiveRange::new(container, start, container, end),
            &id("h1"),
            HighlightColor::Yellow,
            &mut surface,
        );

        // Then no span is wrapped around the blocks
        assert_eq!(result, Err(ApplyError::CrossesBoundary));
        assert_eq!(article.to_html(), before);
        assert_eq!(surface.cleared, 0);
    }

    #[test]
    fn test_partially_selected_inline_element_is_rejected() {
        let mut article = render_markdown("one **bold text** end");
        let before = article.to_html();
        let start = node_at(&article, &[0, 0]);
        let inside = node_at(&article, &[0, 1, 0]);

        let result = apply(
            article.tree_mut(),
            &LiveRange::new(start, 1, inside, 4),
            &id("h1"),
            HighlightColor::Yellow,
            &mut (),
        );

        assert_eq!(result, Err(ApplyError::CrossesBoundary));
        assert_eq!(article.to_html(), before);
    }

    #[test]
    fn test_collapsed_range_is_rejected() {
        let mut article = render_markdown("hello");
        let leaf = node_at(&article, &[0, 0]);

        let result = apply(
            article.tree_mut(),
            &LiveRange::within(leaf, 2, 2),
            &id("h1"),
            HighlightColor::Yellow,
            &mut (),
        );

        assert_eq!(result, Err(ApplyError::EmptyRange));
    }

    #[test]
    fn test_range_between_adjacent_gaps_is_empty() {
        // End of the first leaf up to the gap right after it
        let mut article = render_markdown("one *two*");
        let p = node_at(&article, &[0]);
        let leaf = node_at(&article, &[0, 0]);

        let result = apply(
            article.tree_mut(),
            &LiveRange::new(leaf, 4, p, 1),
            &id("h1"),
            HighlightColor::Yellow,
            &mut (),
        );

        assert_eq!(result, Err(ApplyError::EmptyRange));
        assert_eq!(article.tree().child_count(p), 2);
    }

    #[test]
    fn test_offset_past_end_is_rejected() {
        let mut article = render_markdown("short");
        let leaf = node_at(&article, &[0, 0]);

        let result = apply(
            article.tree_mut(),
            &LiveRange::within(leaf, 0, 40),
            &id("h1"),
            HighlightColor::Yellow,
            &mut (),
        );

        assert_eq!(result, Err(ApplyError::InvalidOffset { offset: 40, len: 5 }));
    }

    #[test]
    fn test_rejection_message_matches_reader_notice() {
        assert_eq!(
            ApplyError::CrossesBoundary.to_string(),
            "Cannot highlight across multiple paragraphs (block-level elements). Please select text within a paragraph."
        );
    }

    #[test]
    fn test_is_already_applied_looks_up_and_down() {
        // Given a highlight wrapping part of a leaf
        let mut article = render_markdown("one two three");
        let leaf = node_at(&article, &[0, 0]);
        let span = apply(
            article.tree_mut(),
            &LiveRange::within(leaf, 4, 7),
            &id("h1"),
            HighlightColor::Yellow,
            &mut (),
        )
        .unwrap();
        let tree = article.tree();
        let inner = tree.child_at(span, 0).unwrap();

        // Then it is found from the root, from itself and from its text
        assert!(is_already_applied(tree, article.root(), &id("h1")));
        assert!(is_already_applied(tree, span, &id("h1")));
        assert!(is_already_applied(tree, inner, &id("h1")));
        assert!(!is_already_applied(tree, leaf, &id("h1")));
        assert!(!is_already_applied(tree, article.root(), &id("h2")));
        assert_eq!(find_highlight(tree, article.root(), &id("h1")), Some(span));
    }

    #[test]
    fn test_nested_highlights() {
        let mut tree = DocTree::new();
        let p = tree.new_element("p", vec![]);
        tree.append_text(p, "hello world!");
        let leaf = tree.child_at(p, 0).unwrap();

        let outer = apply(
            &mut tree,
            &LiveRange::within(leaf, 0, 11),
            &id("outer"),
            HighlightColor::Yellow,
            &mut (),
        )
        .unwrap();
        apply(
            &mut tree,
            &LiveRange::within(leaf, 6, 11),
            &id("inner"),
            HighlightColor::Green,
            &mut (),
        )
        .unwrap();

        let inner = find_highlight(&tree, p, &id("inner")).unwrap();
        assert!(tree.contains(outer, inner));
        assert_eq!(tree.text_content(inner), "world");
        assert_eq!(tree.text_content(p), "hello world!");
    }
}
