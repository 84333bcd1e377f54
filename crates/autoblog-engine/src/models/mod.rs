pub mod post;

pub use post::{Post, reading_time_minutes, slugify};
