pub mod builder;
pub mod writer;

pub use builder::{build_captions, format_tags, CaptionOptions, Naming};
pub use writer::{write_captions, write_captions_and_stats, write_stats};
