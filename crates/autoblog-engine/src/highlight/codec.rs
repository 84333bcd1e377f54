//! Range codec: live ranges ⇄ anchor-path records.
//!
//! A live range points at concrete nodes of one tree instance. Before it can
//! be stored it is turned into two [`AnchorPath`]s (child indices from the
//! article root) plus offsets; after a reload the paths are walked again
//! against the freshly rendered tree.
//!
//! Resolution is only as stable as the tree's shape. When the post's content
//! changes, old records stop resolving; [`CodecError::is_unresolvable`] marks
//! those outcomes, which callers treat as routine rather than as bugs.

use std::cmp::Ordering;

use thiserror::Error;

use super::{AnchorPath, HighlightRange};
use crate::tree::{Boundary, ContentTree, LiveRange, compare_points, path_from};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("selection extends outside the article")]
    SelectionOutOfBounds,
    #[error("anchor path {path} leaves the tree at step {step}")]
    PathOutOfBounds { path: AnchorPath, step: usize },
    #[error("offset {offset} exceeds length {len} of the node at {path}")]
    OffsetOutOfBounds {
        path: AnchorPath,
        offset: usize,
        len: usize,
    },
    #[error("range end precedes its start")]
    Inverted,
}

impl CodecError {
    /// True for failures caused by the stored record no longer matching the
    /// tree, as opposed to a bad live selection.
    pub fn is_unresolvable(&self) -> bool {
        !matches!(self, CodecError::SelectionOutOfBounds)
    }
}

/// Encode `range` relative to `root`.
///
/// Fails with [`CodecError::SelectionOutOfBounds`] when either endpoint is
/// not `root` or one of its descendants, e.g. a selection that leaked into
/// navigation chrome around the article.
pub fn serialize<T: ContentTree>(
    tree: &T,
    root: T::Node,
    range: &LiveRange<T::Node>,
) -> Result<HighlightRange, CodecError> {
    let start_path =
        path_from(tree, root, range.start.node).ok_or(CodecError::SelectionOutOfBounds)?;
    let end_path = path_from(tree, root, range.end.node).ok_or(CodecError::SelectionOutOfBounds)?;

    Ok(HighlightRange {
        start_path: start_path.into(),
        start_offset: range.start.offset,
        end_path: end_path.into(),
        end_offset: range.end.offset,
    })
}

/// Decode a stored record against the current tree.
pub fn resolve<T: ContentTree>(
    tree: &T,
    root: T::Node,
    record: &HighlightRange,
) -> Result<LiveRange<T::Node>, CodecError> {
    let ordering = compare_points(
        record.start_path.steps(),
        record.start_offset,
        record.end_path.steps(),
        record.end_offset,
    );
    if ordering == Ordering::Greater {
        return Err(CodecError::Inverted);
    }

    let start = resolve_boundary(tree, root, &record.start_path, record.start_offset)?;
    let end = resolve_boundary(tree, root, &record.end_path, record.end_offset)?;
    Ok(LiveRange { start, end })
}

fn resolve_boundary<T: ContentTree>(
    tree: &T,
    root: T::Node,
    path: &AnchorPath,
    offset: usize,
) -> Result<Boundary<T::Node>, CodecError> {
    let node = walk(tree, root, path)?;
    let len = tree.node_len(node);
    if offset > len {
        return Err(CodecError::OffsetOutOfBounds {
            path: path.clone(),
            offset,
            len,
        });
    }
    Ok(Boundary::new(node, offset))
}

fn walk<T: ContentTree>(tree: &T, root: T::Node, path: &AnchorPath) -> Result<T::Node, CodecError> {
    path.steps()
        .iter()
        .enumerate()
        .try_fold(root, |node, (step, &index)| {
            tree.child_at(node, index)
                .ok_or_else(|| CodecError::PathOutOfBounds {
                    path: path.clone(),
                    step,
                })
        })
}
