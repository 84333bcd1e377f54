//! Reader-side highlight workflow for one article.
//!
//! ```text
//! Idle ──selection inside article──▶ SelectionActive ──commit(color)──▶ Committing ──▶ Idle
//!   ▲                                  │
//!   └──── collapsed / outside ─────────┘
//! ```
//!
//! Every transition takes `&mut self`, so only one apply can ever be in
//! flight against the tree.

use thiserror::Error;

use crate::highlight::{
    ApplyError, CodecError, Highlight, HighlightColor, RestoreReport, SelectionSurface, apply,
    codec, restore_highlights,
};
use crate::store::HighlightStore;
use crate::tree::{Article, ContentTree, LiveRange, NodeId, range_text};

/// Distance between the top of a selection and the color picker.
pub const AFFORDANCE_OFFSET: f64 = 60.0;

/// Screen rectangle of a selection.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Where the color picker goes: centred horizontally, above the box.
    pub fn affordance_anchor(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y - AFFORDANCE_OFFSET)
    }
}

/// A selection change reported by the host surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionEvent {
    /// `None` when nothing is selected.
    pub range: Option<LiveRange<NodeId>>,
    pub bounding_box: BoundingBox,
}

impl SelectionEvent {
    pub fn selected(range: LiveRange<NodeId>, bounding_box: BoundingBox) -> Self {
        Self {
            range: Some(range),
            bounding_box,
        }
    }

    pub fn cleared() -> Self {
        Self {
            range: None,
            bounding_box: BoundingBox::default(),
        }
    }
}

/// Selection captured while the color picker is showing. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingSelection {
    pub range: LiveRange<NodeId>,
    pub bounding_box: BoundingBox,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ControllerState {
    #[default]
    Idle,
    SelectionActive(PendingSelection),
    Committing,
}

#[derive(Debug, Error)]
pub enum CommitError {
    #[error("no selection to highlight")]
    NothingPending,
    #[error("selection is outside the article: {0}")]
    OutOfBounds(CodecError),
    #[error(transparent)]
    StructuralConflict(ApplyError),
    #[error("highlight {} was applied but could not be saved: {source}", .highlight.id)]
    Persistence {
        highlight: Box<Highlight>,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl CommitError {
    /// Message to show the reader, if any. Selections that strayed outside
    /// the article are dropped quietly.
    pub fn notice(&self) -> Option<String> {
        match self {
            CommitError::NothingPending | CommitError::OutOfBounds(_) => None,
            CommitError::StructuralConflict(err) => Some(err.to_string()),
            CommitError::Persistence { .. } => {
                Some("Your highlight could not be saved. It will disappear on reload.".to_string())
            }
        }
    }
}

/// Drives highlight capture and replay for one rendered article.
pub struct HighlightController<S, F = ()> {
    slug: String,
    article: Article,
    store: S,
    surface: F,
    state: ControllerState,
    highlights: Vec<Highlight>,
}

impl<S: HighlightStore> HighlightController<S, ()> {
    pub fn new(slug: impl Into<String>, article: Article, store: S) -> Self {
        Self::with_surface(slug, article, store, ())
    }
}

impl<S: HighlightStore, F: SelectionSurface> HighlightController<S, F> {
    pub fn with_surface(slug: impl Into<String>, article: Article, store: S, surface: F) -> Self {
        Self {
            slug: slug.into(),
            article,
            store,
            surface,
            state: ControllerState::Idle,
            highlights: Vec::new(),
        }
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn pending(&self) -> Option<&PendingSelection> {
        match &self.state {
            ControllerState::SelectionActive(pending) => Some(pending),
            _ => None,
        }
    }

    /// Highlights known to be stored for this article.
    pub fn highlights(&self) -> &[Highlight] {
        &self.highlights
    }

    pub fn article(&self) -> &Article {
        &self.article
    }

    pub fn surface(&self) -> &F {
        &self.surface
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fetch stored highlights and replay them onto the article.
    ///
    /// A failed fetch leaves the article unhighlighted; it is logged and
    /// reported as an empty pass.
    pub async fn load(&mut self) -> RestoreReport {
        let highlights = match self.store.list(&self.slug).await {
            Ok(highlights) => highlights,
            Err(err) => {
                log::error!("failed to load highlights for '{}': {err}", self.slug);
                return RestoreReport::default();
            }
        };

        let root = self.article.root();
        let report = restore_highlights(self.article.tree_mut(), root, &highlights);
        log::info!(
            "restored {} of {} highlights on '{}'",
            report.applied.len(),
            highlights.len(),
            self.slug
        );
        self.highlights = highlights;
        report
    }

    /// Track the reader's selection.
    pub fn on_selection_change(&mut self, event: SelectionEvent) -> &ControllerState {
        if matches!(self.state, ControllerState::Committing) {
            return &self.state;
        }

        self.state = match event.range {
            Some(range) if !range.is_collapsed() && self.inside_article(&range) => {
                ControllerState::SelectionActive(PendingSelection {
                    range,
                    bounding_box: event.bounding_box,
                })
            }
            _ => ControllerState::Idle,
        };
        &self.state
    }

    fn inside_article(&self, range: &LiveRange<NodeId>) -> bool {
        let tree = self.article.tree();
        tree.common_ancestor(range.start.node, range.end.node)
            .is_some_and(|common| tree.contains(self.article.root(), common))
    }

    /// Turn the pending selection into a highlight of `color`.
    ///
    /// The visual highlight stays in place even when saving fails.
    pub async fn commit(&mut self, color: HighlightColor) -> Result<Highlight, CommitError> {
        let ControllerState::SelectionActive(pending) = self.state else {
            return Err(CommitError::NothingPending);
        };
        self.state = ControllerState::Committing;
        let result = self.commit_pending(pending.range, color).await;
        self.state = ControllerState::Idle;
        result
    }

    async fn commit_pending(
        &mut self,
        range: LiveRange<NodeId>,
        color: HighlightColor,
    ) -> Result<Highlight, CommitError> {
        let root = self.article.root();
        let record = codec::serialize(self.article.tree(), root, &range).map_err(|err| {
            log::debug!("dropping selection: {err}");
            CommitError::OutOfBounds(err)
        })?;
        let text = range_text(self.article.tree(), &range);
        let highlight = Highlight::create(self.slug.clone(), text, color, record);

        apply(
            self.article.tree_mut(),
            &range,
            &highlight.id,
            color,
            &mut self.surface,
        )
        .map_err(|err| {
            log::warn!("cannot highlight selection on '{}': {err}", self.slug);
            CommitError::StructuralConflict(err)
        })?;

        match self.store.create(&self.slug, &highlight).await {
            Ok(stored_id) => {
                if stored_id != highlight.id {
                    log::warn!(
                        "store recorded highlight {} as {stored_id}; keeping the local id",
                        highlight.id
                    );
                }
                self.highlights.push(highlight.clone());
                Ok(highlight)
            }
            Err(err) => {
                log::error!("failed to save highlight {}: {err}", highlight.id);
                Err(CommitError::Persistence {
                    highlight: Box::new(highlight),
                    source: Box::new(err),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::{HighlightId, find_highlight};
    use crate::tree::render_markdown;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    #[derive(Debug, thiserror::Error)]
    #[error("store unavailable")]
    struct Unavailable;

    /// In-memory store with switches for failing reads or writes.
    #[derive(Default)]
    struct FakeStore {
        records: Mutex<Vec<(String, Highlight)>>,
        fail_writes: bool,
        fail_reads: bool,
    }

    impl FakeStore {
        fn saved(&self) -> Vec<Highlight> {
            let records = self.records.lock().unwrap();
            records.iter().map(|(_, h)| h.clone()).collect()
        }
    }

    impl HighlightStore for FakeStore {
        type Error = Unavailable;

        async fn list(&self, slug: &str) -> Result<Vec<Highlight>, Unavailable> {
            if self.fail_reads {
                return Err(Unavailable);
            }
            let records = self.records.lock().unwrap();
            Ok(records
                .iter()
                .filter(|(s, _)| s == slug)
                .map(|(_, h)| h.clone())
                .collect())
        }

        async fn create(&self, slug: &str, highlight: &Highlight) -> Result<HighlightId, Unavailable> {
            if self.fail_writes {
                return Err(Unavailable);
            }
            self.records
                .lock()
                .unwrap()
                .push((slug.to_string(), highlight.clone()));
            Ok(highlight.id.clone())
        }
    }

    #[derive(Default)]
    struct CountingSurface(usize);

    impl SelectionSurface for CountingSurface {
        fn clear_selection(&mut self) {
            self.0 += 1;
        }
    }

    fn first_leaf(article: &Article, block: usize) -> NodeId {
        let tree = article.tree();
        let p = tree.child_at(article.root(), block).unwrap();
        tree.child_at(p, 0).unwrap()
    }

    fn rect() -> BoundingBox {
        BoundingBox::new(100.0, 200.0, 80.0, 20.0)
    }

    #[test]
    fn test_affordance_sits_above_selection_centre() {
        assert_eq!(rect().affordance_anchor(), (140.0, 140.0));
    }

    #[tokio::test]
    async fn test_commit_applies_and_persists() {
        // Given an article with "hello world" selected
        let article = render_markdown("hello world");
        let leaf = first_leaf(&article, 0);
        let store = FakeStore::default();
        let mut controller =
            HighlightController::with_surface("post", article, &store, CountingSurface::default());
        controller.on_selection_change(SelectionEvent::selected(LiveRange::within(leaf, 0, 11), rect()));
        assert!(controller.pending().is_some());

        // When the reader picks yellow
        let highlight = controller.commit(HighlightColor::Yellow).await.unwrap();

        // Then the highlight is in the tree, in the store and in memory
        assert_eq!(highlight.text, "hello world");
        assert_eq!(highlight.range.start_offset, 0);
        assert_eq!(highlight.range.end_offset, 11);
        assert_eq!(store.saved(), vec![highlight.clone()]);
        assert_eq!(controller.highlights(), &[highlight.clone()]);
        assert_eq!(controller.state(), &ControllerState::Idle);
        assert_eq!(controller.surface().0, 1);
        let article = controller.article();
        assert!(find_highlight(article.tree(), article.root(), &highlight.id).is_some());
    }

    #[tokio::test]
    async fn test_collapsed_selection_returns_to_idle() {
        let article = render_markdown("hello world");
        let leaf = first_leaf(&article, 0);
        let mut controller = HighlightController::new("post", article, FakeStore::default());

        controller.on_selection_change(SelectionEvent::selected(LiveRange::within(leaf, 0, 5), rect()));
        let state = controller.on_selection_change(SelectionEvent::selected(LiveRange::within(leaf, 3, 3), rect()));

        assert_eq!(state, &ControllerState::Idle);
        assert!(matches!(
            controller.commit(HighlightColor::Green).await,
            Err(CommitError::NothingPending)
        ));
    }

    #[test]
    fn test_selection_outside_article_is_ignored() {
        // A detached leaf stands in for page chrome around the article
        let mut article = render_markdown("hello world");
        let chrome = article.tree_mut().new_text("navigation");
        let leaf = first_leaf(&article, 0);
        let mut controller = HighlightController::new("post", article, FakeStore::default());
        controller.on_selection_change(SelectionEvent::selected(LiveRange::within(leaf, 0, 5), rect()));

        let state = controller.on_selection_change(SelectionEvent::selected(
            LiveRange::within(chrome, 0, 3),
            rect(),
        ));

        assert_eq!(state, &ControllerState::Idle);
    }

    #[test]
    fn test_cleared_selection_returns_to_idle() {
        let article = render_markdown("hello world");
        let leaf = first_leaf(&article, 0);
        let mut controller = HighlightController::new("post", article, FakeStore::default());
        controller.on_selection_change(SelectionEvent::selected(LiveRange::within(leaf, 0, 5), rect()));

        controller.on_selection_change(SelectionEvent::cleared());

        assert_eq!(controller.pending(), None);
    }

    #[tokio::test]
    async fn test_cross_paragraph_commit_is_rejected_with_notice() {
        // Given a selection spanning two paragraphs
        let article = render_markdown("first one\n\nsecond one");
        let start = first_leaf(&article, 0);
        let end = first_leaf(&article, 1);
        let before = article.to_html();
        let store = FakeStore::default();
        let mut controller = HighlightController::new("post", article, &store);
        controller.on_selection_change(SelectionEvent::selected(LiveRange::new(start, 2, end, 3), rect()));

        // When it is committed
        let err = controller.commit(HighlightColor::Yellow).await.unwrap_err();

        // Then the reader is told why, and nothing changed or was saved
        assert!(matches!(err, CommitError::StructuralConflict(ApplyError::CrossesBoundary)));
        assert_eq!(
            err.notice().as_deref(),
            Some("Cannot highlight across multiple paragraphs (block-level elements). Please select text within a paragraph.")
        );
        assert_eq!(controller.article().to_html(), before);
        assert!(store.saved().is_empty());
        assert_eq!(controller.state(), &ControllerState::Idle);
    }

    #[tokio::test]
    async fn test_persistence_failure_keeps_local_highlight() {
        let article = render_markdown("keep me highlighted");
        let leaf = first_leaf(&article, 0);
        let store = FakeStore {
            fail_writes: true,
            ..FakeStore::default()
        };
        let mut controller = HighlightController::new("post", article, &store);
        controller.on_selection_change(SelectionEvent::selected(LiveRange::within(leaf, 0, 4), rect()));

        let err = controller.commit(HighlightColor::Green).await.unwrap_err();

        let CommitError::Persistence { highlight, .. } = &err else {
            panic!("expected a persistence failure, got {err:?}");
        };
        assert!(err.notice().is_some());
        let article = controller.article();
        assert!(find_highlight(article.tree(), article.root(), &highlight.id).is_some());
        assert!(controller.highlights().is_empty());
    }

    #[tokio::test]
    async fn test_load_replays_stored_highlights() {
        // Given a highlight committed in an earlier session
        let first_session = render_markdown("hello world");
        let leaf = first_leaf(&first_session, 0);
        let store = FakeStore::default();
        let mut writer = HighlightController::new("post", first_session, &store);
        writer.on_selection_change(SelectionEvent::selected(LiveRange::within(leaf, 6, 11), rect()));
        let saved = writer.commit(HighlightColor::Green).await.unwrap();

        // When the article is rendered afresh and loaded
        let mut reader = HighlightController::new("post", render_markdown("hello world"), &store);
        let report = reader.load().await;

        // Then the same markup comes back
        assert_eq!(report.applied, vec![saved.id.clone()]);
        assert_eq!(reader.article().to_html(), writer.article().to_html());
        assert_eq!(reader.highlights(), &[saved]);
    }

    #[tokio::test]
    async fn test_load_failure_leaves_article_plain() {
        let store = FakeStore {
            fail_reads: true,
            ..FakeStore::default()
        };
        let mut controller = HighlightController::new("post", render_markdown("plain"), &store);

        let report = controller.load().await;

        assert!(report.applied.is_empty());
        assert!(report.is_clean());
        assert_eq!(controller.state(), &ControllerState::Idle);
    }
}
