pub mod decode;
pub mod post;
pub mod tag;

pub use post::{FileExt, Post, Rating, STATIC_URL};
pub use tag::{Tag, TagCategory, DEFAULT_CATEGORIES_ORDER};
