use mongodb::bson::{Bson, Document as BsonDocument};
use mongodb::sync::Client;
use serde_json::Value;

use crate::error::{ErrorKind, PipelineError, Result, ResultExt};
use crate::source::{Document, DocumentSource};

/// MongoDB collection reader. A new client is opened on every fetch.
#[derive(Debug, Clone)]
pub struct MongoSource {
    uri: String,
}

impl MongoSource {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }

    /// Read the connection string from `MONGO_DB_URL`.
    pub fn from_env() -> Result<Self> {
        std::env::var("MONGO_DB_URL").map(Self::new).map_err(|_| {
            PipelineError::new(
                ErrorKind::SourceUnavailable,
                "MONGO_DB_URL is not set",
            )
        })
    }
}

impl DocumentSource for MongoSource {
    fn fetch(&self, database: &str, collection: &str) -> Result<Vec<Document>> {
        let client = Client::with_uri_str(&self.uri).or_kind(ErrorKind::SourceUnavailable, || {
            "Failed to connect to MongoDB".to_string()
        })?;
        let cursor = client
            .database(database)
            .collection::<BsonDocument>(collection)
            .find(None, None)
            .or_kind(ErrorKind::SourceUnavailable, || {
                format!("Failed to query {database}.{collection}")
            })?;

        let mut documents = Vec::new();
        for doc in cursor {
            let doc = doc.or_kind(ErrorKind::SourceUnavailable, || {
                format!("Failed to read from {database}.{collection}")
            })?;
            match Bson::Document(doc).into_relaxed_extjson() {
                Value::Object(map) => documents.push(map),
                other => {
                    return Err(PipelineError::data_format(format!(
                        "unexpected document shape: {other}"
                    )))
                }
            }
        }
        log::info!("Fetched {} documents from {}.{}", documents.len(), database, collection);
        Ok(documents)
    }

    fn describe(&self) -> String {
        "MongoDB".to_string()
    }
}
