//! Highlight records and the operations that move them between a live tree
//! and storage.

pub mod applicator;
pub mod codec;
mod model;
pub mod restore;
pub mod wire;

pub use applicator::{
    ApplyError, COLOR_ATTR, HIGHLIGHT_TAG, ID_ATTR, SelectionSurface, apply, find_highlight,
    is_already_applied,
};
pub use codec::CodecError;
pub use model::{AnchorPath, Highlight, HighlightColor, HighlightId, HighlightRange};
pub use restore::{RestoreReport, SkipReason, restore_highlights};
