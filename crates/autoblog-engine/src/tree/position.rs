use std::cmp::Ordering;

use super::{ContentTree, LiveRange};

/// Child-index path from `root` down to `node`, or `None` when `node` is not
/// `root` or one of its descendants.
pub fn path_from<T: ContentTree>(tree: &T, root: T::Node, node: T::Node) -> Option<Vec<usize>> {
    let mut path = Vec::new();
    let mut current = node;
    while current != root {
        let index = tree.index_in_parent(current)?;
        path.push(index);
        current = tree.parent(current)?;
    }
    path.reverse();
    Some(path)
}

/// Compare two boundary points, each given as a path from a shared root plus
/// an offset, in document order.
///
/// Uses the DOM rules: when one node contains the other, the container's
/// offset is compared against the index of the child leading to the other
/// node; otherwise the first differing child index decides.
pub fn compare_points(
    a_path: &[usize],
    a_offset: usize,
    b_path: &[usize],
    b_offset: usize,
) -> Ordering {
    let shared = a_path
        .iter()
        .zip(b_path)
        .take_while(|(a, b)| a == b)
        .count();

    match (shared == a_path.len(), shared == b_path.len()) {
        (true, true) => a_offset.cmp(&b_offset),
        // `a` contains `b`
        (true, false) => {
            if a_offset <= b_path[shared] {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
        // `b` contains `a`
        (false, true) => {
            if b_offset <= a_path[shared] {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
        (false, false) => a_path[shared].cmp(&b_path[shared]),
    }
}

/// Plain text covered by `range`, in document order.
pub fn range_text<T: ContentTree>(tree: &T, range: &LiveRange<T::Node>) -> String {
    let Some(scope) = tree.common_ancestor(range.start.node, range.end.node) else {
        return String::new();
    };
    let (Some(start_path), Some(end_path)) = (
        path_from(tree, scope, range.start.node),
        path_from(tree, scope, range.end.node),
    ) else {
        return String::new();
    };

    let bounds = TextBounds {
        start_path: &start_path,
        start_offset: range.start.offset,
        end_path: &end_path,
        end_offset: range.end.offset,
    };
    let mut out = String::new();
    collect_text(tree, scope, &mut Vec::new(), &bounds, &mut out);
    out
}

struct TextBounds<'a> {
    start_path: &'a [usize],
    start_offset: usize,
    end_path: &'a [usize],
    end_offset: usize,
}

fn collect_text<T: ContentTree>(
    tree: &T,
    node: T::Node,
    path: &mut Vec<usize>,
    bounds: &TextBounds<'_>,
    out: &mut String,
) {
    if let Some(text) = tree.text(node) {
        let len = text.chars().count();
        let from = if path.as_slice() == bounds.start_path {
            bounds.start_offset
        } else if compare_points(path.as_slice(), 0, bounds.start_path, bounds.start_offset)
            .is_ge()
        {
            0
        } else {
            len
        };
        let to = if path.as_slice() == bounds.end_path {
            bounds.end_offset.min(len)
        } else if compare_points(path.as_slice(), len, bounds.end_path, bounds.end_offset)
            .is_le()
        {
            len
        } else {
            0
        };
        if from < to {
            out.extend(text.chars().skip(from).take(to - from));
        }
        return;
    }

    for index in 0..tree.child_count(node) {
        if let Some(child) = tree.child_at(node, index) {
            path.push(index);
            collect_text(tree, child, path, bounds, out);
            path.pop();
        }
    }
}
