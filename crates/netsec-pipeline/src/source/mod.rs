//! Where raw records come from.
use serde_json::{Map, Value};

use crate::error::Result;

pub mod json;
#[cfg(feature = "mongodb")]
pub mod mongo;

pub use json::JsonFileSource;
#[cfg(feature = "mongodb")]
pub use mongo::MongoSource;

/// A flat JSON object, one per record.
pub type Document = Map<String, Value>;

/// A document store holding the labelled dataset.
pub trait DocumentSource {
    /// Every document of `collection` in `database`.
    fn fetch(&self, database: &str, collection: &str) -> Result<Vec<Document>>;

    fn describe(&self) -> String {
        "document source".to_string()
    }
}
