use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::{self, doc};
use mongodb::{Client, Collection};
use otp_service_core::{BenchmarkEntry, BenchmarkStore, CoreError, Result};
use serde::{Deserialize, Serialize};

/// Document layout; expiry is compared on read rather than through a TTL index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub value: String,
    pub expires_at: bson::DateTime,
}

impl BenchmarkDocument {
    pub fn new(key: &str, value: &str, expires_at: DateTime<Utc>) -> Self {
        Self {
            id: key.to_string(),
            value: value.to_string(),
            expires_at: bson::DateTime::from_millis(expires_at.timestamp_millis()),
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp_millis(self.expires_at.timestamp_millis())
    }

    pub fn into_entry(self) -> BenchmarkEntry {
        let expires_at = self.expires_at();
        let entry = BenchmarkEntry::new(self.id, self.value);
        match expires_at {
            Some(at) => entry.with_expiry(at),
            None => entry,
        }
    }
}

#[derive(Clone)]
pub struct MongoBenchmarkRepository {
    collection: Collection<BenchmarkDocument>,
}

impl MongoBenchmarkRepository {
    pub fn new(client: &Client, database: &str, collection: &str) -> Self {
        Self {
            collection: client.database(database).collection(collection),
        }
    }
}

fn document_error(err: mongodb::error::Error) -> CoreError {
    CoreError::DocumentStore(err.to_string())
}

#[async_trait]
impl BenchmarkStore for MongoBenchmarkRepository {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| CoreError::Validation(format!("invalid ttl: {}", e)))?;
        let document = BenchmarkDocument::new(key, value, Utc::now() + ttl);

        self.collection
            .replace_one(doc! { "_id": key }, &document)
            .upsert(true)
            .await
            .map_err(document_error)?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<BenchmarkEntry>> {
        let document = self
            .collection
            .find_one(doc! { "_id": key })
            .await
            .map_err(document_error)?;

        let Some(document) = document else {
            return Ok(None);
        };

        let entry = document.into_entry();
        if entry.is_expired_at(Utc::now()) {
            if let Err(e) = self.delete(key).await {
                tracing::warn!(key = %key, error = %e, "Failed to delete expired benchmark document");
            }
            return Ok(None);
        }

        Ok(Some(entry))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.collection
            .delete_one(doc! { "_id": key })
            .await
            .map_err(document_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_keeps_millisecond_expiry() {
        let at = DateTime::<Utc>::from_timestamp_millis(1_700_000_000_123).unwrap();
        let document = BenchmarkDocument::new("otp:t:p", "v", at);
        assert_eq!(document.expires_at(), Some(at));

        let entry = document.into_entry();
        assert_eq!(entry.key, "otp:t:p");
        assert_eq!(entry.expires_at, Some(at));
    }

    #[test]
    fn document_serializes_id_as_underscore_id() {
        let document = BenchmarkDocument::new("k", "v", Utc::now());
        let bson = bson::to_document(&document).unwrap();
        assert_eq!(bson.get_str("_id").unwrap(), "k");
        assert!(bson.get_datetime("expires_at").is_ok());
    }
}
