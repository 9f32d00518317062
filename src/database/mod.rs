pub mod dataset;
pub mod posts;
pub mod query;
pub mod repo;
pub mod schema;
pub mod selector;
pub mod tags;

pub use dataset::Dataset;
pub use posts::{PostIter, Posts};
pub use query::{Query, QueryPatch, SkipPost};
pub use selector::Selector;
pub use tags::{TagCatalog, TagKey};
