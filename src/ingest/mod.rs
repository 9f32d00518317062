pub mod parquet_dump;
pub mod reader;
pub mod scanner;

pub use parquet_dump::TagLists;
pub use reader::{open_fluffyrock_posts, open_posts, open_source, open_tags, DumpFormat, DumpScan};
pub use scanner::{autoinit_from_directory, find_dump_files, DumpGroup};
