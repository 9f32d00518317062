//! Curation of image-board dumps: select posts with a declarative query,
//! order their tags by category and render them into caption files.

pub mod captions;
pub mod database;
pub mod error;
pub mod fetch;
pub mod ingest;
pub mod model;
pub mod table;
pub mod utils;

pub use error::{Error, Result};
