use thiserror::Error;

use super::{ApplyError, CodecError, Highlight, HighlightId, apply, codec, find_highlight};
use crate::tree::TreeMut;

/// Why a stored highlight was left out of the rendered tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("already applied")]
    AlreadyApplied,
    #[error("range no longer resolves: {0}")]
    Unresolvable(CodecError),
    #[error("range cannot be wrapped: {0}")]
    Conflict(ApplyError),
}

/// Outcome of a restoration pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub applied: Vec<HighlightId>,
    pub skipped: Vec<(HighlightId, SkipReason)>,
}

impl RestoreReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Replay stored highlights onto a freshly rendered tree.
///
/// Highlights are applied oldest first (stable on equal timestamps), because
/// every record was captured against the tree as it looked with all earlier
/// highlights in place. A highlight that fails is skipped and logged; the
/// rest of the batch still runs. Running the pass twice changes nothing the
/// second time.
pub fn restore_highlights<T: TreeMut>(
    tree: &mut T,
    root: T::Node,
    highlights: &[Highlight],
) -> RestoreReport {
    let mut ordered: Vec<&Highlight> = highlights.iter().collect();
    ordered.sort_by_key(|highlight| highlight.created_at);

    let mut report = RestoreReport::default();
    for highlight in ordered {
        match restore_one(tree, root, highlight) {
            Ok(()) => report.applied.push(highlight.id.clone()),
            Err(SkipReason::AlreadyApplied) => {
                log::debug!("highlight {} already present", highlight.id);
                report
                    .skipped
                    .push((highlight.id.clone(), SkipReason::AlreadyApplied));
            }
            Err(reason) => {
                log::warn!(
                    "skipping highlight {} on '{}': {reason}",
                    highlight.id,
                    highlight.article_slug
                );
                report.skipped.push((highlight.id.clone(), reason));
            }
        }
    }
    report
}

fn restore_one<T: TreeMut>(
    tree: &mut T,
    root: T::Node,
    highlight: &Highlight,
) -> Result<(), SkipReason> {
    if find_highlight(tree, root, &highlight.id).is_some() {
        return Err(SkipReason::AlreadyApplied);
    }
    let range = codec::resolve(tree, root, &highlight.range).map_err(SkipReason::Unresolvable)?;
    apply(tree, &range, &highlight.id, highlight.color, &mut ()).map_err(SkipReason::Conflict)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::{HighlightColor, HighlightRange};
    use crate::tree::{ContentTree, render_markdown};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn stored(id: &str, millis: i64, range: HighlightRange) -> Highlight {
        Highlight {
            id: HighlightId::new(id),
            article_slug: "post".to_string(),
            text: String::new(),
            color: HighlightColor::Yellow,
            range,
            created_at: Utc.timestamp_millis_opt(millis).unwrap(),
        }
    }

    fn ids(values: &[&str]) -> Vec<HighlightId> {
        values.iter().copied().map(HighlightId::new).collect()
    }

    const THREE_PARAGRAPHS: &str = "alpha one\n\nbeta two\n\ngamma three";

    #[test]
    fn test_restore_applies_each_highlight() {
        let mut article = render_markdown(THREE_PARAGRAPHS);
        let root = article.root();
        let highlights = vec![
            stored("a", 1, HighlightRange::new(vec![0, 0], 0, vec![0, 0], 5)),
            stored("b", 2, HighlightRange::new(vec![2, 0], 6, vec![2, 0], 11)),
        ];

        let report = restore_highlights(article.tree_mut(), root, &highlights);

        assert_eq!(report.applied, ids(&["a", "b"]));
        assert!(report.is_clean());
        insta::assert_snapshot!(
            article.to_html(),
            @r#"<div class="article"><p><span data-highlight-id="a" data-highlight-color="yellow" class="highlight highlight-yellow">alpha</span> one</p><p>beta two</p><p>gamma <span data-highlight-id="b" data-highlight-color="yellow" class="highlight highlight-yellow">three</span></p></div>"#
        );
    }

    #[test]
    fn test_restore_is_idempotent() {
        // Given a tree with highlights already replayed once
        let mut article = render_markdown(THREE_PARAGRAPHS);
        let root = article.root();
        let highlights = vec![stored(
            "a",
            1,
            HighlightRange::new(vec![1, 0], 0, vec![1, 0], 4),
        )];
        restore_highlights(article.tree_mut(), root, &highlights);
        let once = article.to_html();

        // When the same pass runs again
        let report = restore_highlights(article.tree_mut(), root, &highlights);

        // Then the tree is unchanged and the highlight is reported as present
        assert_eq!(article.to_html(), once);
        assert!(report.applied.is_empty());
        assert_eq!(
            report.skipped,
            vec![(HighlightId::new("a"), SkipReason::AlreadyApplied)]
        );
    }

    #[test]
    fn test_one_corrupt_record_does_not_stop_the_rest() {
        // Given three highlights where the second no longer resolves
        let mut article = render_markdown(THREE_PARAGRAPHS);
        let root = article.root();
        let highlights = vec![
            stored("first", 1, HighlightRange::new(vec![0, 0], 0, vec![0, 0], 5)),
            stored("second", 2, HighlightRange::new(vec![9, 0], 0, vec![9, 0], 3)),
            stored("third", 3, HighlightRange::new(vec![2, 0], 0, vec![2, 0], 5)),
        ];

        // When they are restored
        let report = restore_highlights(article.tree_mut(), root, &highlights);

        // Then the first and third are applied and the second is skipped
        assert_eq!(report.applied, ids(&["first", "third"]));
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].0, HighlightId::new("second"));
        assert!(matches!(
            &report.skipped[0].1,
            SkipReason::Unresolvable(err) if err.is_unresolvable()
        ));
        assert!(find_highlight(article.tree(), root, &HighlightId::new("first")).is_some());
        assert!(find_highlight(article.tree(), root, &HighlightId::new("third")).is_some());
    }

    #[test]
    fn test_conflicting_record_is_skipped() {
        let mut article = render_markdown(THREE_PARAGRAPHS);
        let root = article.root();
        let before = article.to_html();
        let highlights = vec![stored(
            "wide",
            1,
            HighlightRange::new(vec![0, 0], 2, vec![1, 0], 2),
        )];

        let report = restore_highlights(article.tree_mut(), root, &highlights);

        assert_eq!(
            report.skipped,
            vec![(
                HighlightId::new("wide"),
                SkipReason::Conflict(ApplyError::CrossesBoundary)
            )]
        );
        assert_eq!(article.to_html(), before);
    }

    #[test]
    fn test_replay_order_follows_creation_time() {
        // T1 wraps "hello world"; T2 was recorded later, inside T1's wrapper,
        // so it only resolves once T1 is in place.
        let t1 = stored("t1", 1_000, HighlightRange::new(vec![0, 0], 0, vec![0, 0], 11));
        let t2 = stored(
            "t2",
            2_000,
            HighlightRange::new(vec![0, 0, 0], 6, vec![0, 0, 0], 11),
        );

        for store_order in [vec![t1.clone(), t2.clone()], vec![t2.clone(), t1.clone()]] {
            let mut article = render_markdown("hello world!");
            let root = article.root();

            let report = restore_highlights(article.tree_mut(), root, &store_order);

            assert_eq!(report.applied, ids(&["t1", "t2"]));
            let tree = article.tree();
            let outer = find_highlight(tree, root, &t1.id).unwrap();
            let inner = find_highlight(tree, root, &t2.id).unwrap();
            assert!(tree.contains(outer, inner));
            assert_eq!(tree.text_content(inner), "world");
        }
    }

    #[test]
    fn test_equal_timestamps_keep_store_order() {
        let mut article = render_markdown("one two");
        let root = article.root();
        let highlights = vec![
            stored("first-listed", 5, HighlightRange::new(vec![0, 0], 0, vec![0, 0], 3)),
            stored("second-listed", 5, HighlightRange::new(vec![0, 0], 0, vec![0, 0], 7)),
        ];

        let report = restore_highlights(article.tree_mut(), root, &highlights);

        // The first listed wins; the second was recorded against the bare leaf
        assert_eq!(report.applied, ids(&["first-listed"]));
        assert_eq!(report.skipped[0].0, HighlightId::new("second-listed"));
    }
}
