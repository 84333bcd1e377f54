pub mod controller;
pub mod highlight;
pub mod models;
pub mod store;
pub mod tree;

// Re-export key types for easier usage
pub use controller::*;
pub use highlight::*;
pub use models::*;
pub use store::HighlightStore;
pub use tree::{Article, ContentTree, DocTree, LiveRange, NodeId, TreeMut, render_markdown};
