use std::future::Future;

use crate::highlight::{Highlight, HighlightId};

/// Remote home of a post's highlights.
///
/// Implementations never retry and never reorder writes; a failed call is
/// reported to the caller and that is the end of it.
pub trait HighlightStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Every highlight stored for `slug`, oldest first. A post nobody has
    /// highlighted yields an empty list rather than an error.
    fn list(&self, slug: &str) -> impl Future<Output = Result<Vec<Highlight>, Self::Error>>;

    /// Persist a newly created highlight and return the id the store
    /// recorded it under.
    fn create(
        &self,
        slug: &str,
        highlight: &Highlight,
    ) -> impl Future<Output = Result<HighlightId, Self::Error>>;
}

impl<S: HighlightStore + ?Sized> HighlightStore for &S {
    type Error = S::Error;

    fn list(&self, slug: &str) -> impl Future<Output = Result<Vec<Highlight>, Self::Error>> {
        (**self).list(slug)
    }

    fn create(
        &self,
        slug: &str,
        highlight: &Highlight,
    ) -> impl Future<Output = Result<HighlightId, Self::Error>> {
        (**self).create(slug, highlight)
    }
}
