// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper implementing the remote store.
//!
//! Handle segments alternate collection and document IDs, so
//! `Training/{uid}/RoutineModel` is the `RoutineModel` sub-collection of
//! document `{uid}` in collection `Training`, and `User/{uid}` is a single
//! document.

use crate::db::{RemoteHandle, RemoteStore};
use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use firestore::ParentPathBuilder;
use gcloud_sdk::google::firestore::v1::Document;
use serde_json::Value;
use std::collections::BTreeMap;

// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

/// Where a handle points inside Firestore.
struct Location {
    parent: Option<ParentPathBuilder>,
    collection: String,
    document_id: Option<String>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> StoreResult<Self> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| StoreError(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> StoreResult<Self> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| StoreError(format!("Failed to connect to Firestore Emulator: {}", e)))?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> StoreResult<&firestore::FirestoreDb> {
        self.client
            .as_ref()
            .ok_or_else(|| StoreError::new("Database not connected (offline mode)"))
    }

    /// Map handle segments onto parent path, collection and optional document.
    fn locate(&self, segments: &[String]) -> StoreResult<Location> {
        let client = self.get_client()?;

        let (pairs, tail) = if segments.len() % 2 == 1 {
            (&segments[..segments.len() - 1], &segments[segments.len() - 1..])
        } else if segments.len() >= 2 {
            (&segments[..segments.len() - 2], &segments[segments.len() - 2..])
        } else {
            return Err(StoreError::new("Empty Firestore path"));
        };

        let mut parent: Option<ParentPathBuilder> = None;
        for pair in pairs.chunks(2) {
            parent = Some(match parent {
                None => client.parent_path(&pair[0], &pair[1])?,
                Some(p) => p.at(&pair[0], &pair[1])?,
            });
        }

        Ok(Location {
            parent,
            collection: tail[0].clone(),
            document_id: tail.get(1).cloned(),
        })
    }

    /// Fetch every document of a collection, unconverted.
    async fn list_documents(&self, location: &Location) -> StoreResult<Vec<Document>> {
        let query = self
            .get_client()?
            .fluent()
            .select()
            .from(location.collection.as_str());

        let documents = match &location.parent {
            Some(parent) => query.parent(parent).query().await?,
            None => query.query().await?,
        };
        Ok(documents)
    }

    /// Helper to batch delete documents using transactions.
    async fn batch_delete(&self, location: &Location, ids: &[String]) -> StoreResult<()> {
        let client = self.get_client()?;

        for chunk in ids.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| StoreError(format!("Failed to begin transaction: {}", e)))?;

            for doc_id in chunk {
                let delete = client
                    .fluent()
                    .delete()
                    .from(location.collection.as_str())
                    .document_id(doc_id);
                let added = match &location.parent {
                    Some(parent) => delete.parent(parent).add_to_transaction(&mut transaction),
                    None => delete.add_to_transaction(&mut transaction),
                };
                added.map_err(|e| {
                    StoreError(format!(
                        "Failed to add deletion to transaction for {}: {}",
                        location.collection, e
                    ))
                })?;
            }

            transaction
                .commit()
                .await
                .map_err(|e| StoreError(format!("Failed to commit batch deletion: {}", e)))?;
        }

        Ok(())
    }

    async fn upsert(&self, location: &Location, doc_id: &str, value: &Value) -> StoreResult<()> {
        let update = self
            .get_client()?
            .fluent()
            .update()
            .in_col(location.collection.as_str())
            .document_id(doc_id);
        let _: () = match &location.parent {
            Some(parent) => update.parent(parent).object(value).execute().await?,
            None => update.object(value).execute().await?,
        };
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for FirestoreDb {
    async fn read_all(&self, handle: &RemoteHandle) -> StoreResult<BTreeMap<String, Value>> {
        let location = self.locate(&collection_segments(handle)?)?;
        let documents = self.list_documents(&location).await?;

        let mut children = BTreeMap::new();
        for doc in &documents {
            match firestore::FirestoreDb::deserialize_doc_to::<Value>(doc) {
                Ok(value) => {
                    children.insert(document_id(doc).to_string(), strip_metadata(value));
                }
                Err(e) => {
                    tracing::debug!(doc = %doc.name, error = %e, "Skipping unreadable document");
                }
            }
        }

        tracing::debug!(path = %handle, count = children.len(), "Read remote collection");
        Ok(children)
    }

    async fn write_child(
        &self,
        handle: &RemoteHandle,
        key: &str,
        value: &Value,
    ) -> StoreResult<()> {
        let location = self.locate(&collection_segments(handle)?)?;
        self.upsert(&location, key, value).await
    }

    async fn delete_all(&self, handle: &RemoteHandle) -> StoreResult<()> {
        let location = self.locate(&collection_segments(handle)?)?;
        let ids: Vec<String> = self
            .list_documents(&location)
            .await?
            .iter()
            .map(|doc| document_id(doc).to_string())
            .collect();

        self.batch_delete(&location, &ids).await?;
        tracing::debug!(path = %handle, count = ids.len(), "Deleted remote collection");
        Ok(())
    }

    async fn read_value(&self, handle: &RemoteHandle) -> StoreResult<Option<Value>> {
        let location = self.locate(handle.segments())?;
        let doc_id = location
            .document_id
            .clone()
            .ok_or_else(|| StoreError(format!("Not a document path: {}", handle)))?;

        let select = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(location.collection.as_str());
        let value: Option<Value> = match &location.parent {
            Some(parent) => select.parent(parent).obj().one(&doc_id).await?,
            None => select.obj().one(&doc_id).await?,
        };
        Ok(value.map(strip_metadata))
    }

    async fn write_value(&self, handle: &RemoteHandle, value: &Value) -> StoreResult<()> {
        let location = self.locate(handle.segments())?;
        let doc_id = location
            .document_id
            .clone()
            .ok_or_else(|| StoreError(format!("Not a document path: {}", handle)))?;
        self.upsert(&location, &doc_id, value).await
    }
}

/// Collections live at odd segment counts; anything else has no children.
fn collection_segments(handle: &RemoteHandle) -> StoreResult<Vec<String>> {
    if handle.segments().len() % 2 == 1 {
        Ok(handle.segments().to_vec())
    } else {
        Err(StoreError(format!("Not a collection path: {}", handle)))
    }
}

/// Drop the `_firestore_*` fields the crate adds when deserializing documents.
fn strip_metadata(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(key, _)| !key.starts_with("_firestore_"))
                .collect(),
        ),
        other => other,
    }
}

/// Last path component of a document resource name.
fn document_id(doc: &Document) -> &str {
    doc.name.rsplit('/').next().unwrap_or(&doc.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offline_mock_reports_connection_error() {
        let db = FirestoreDb::new_mock();
        let handle = RemoteHandle::root("Training").child("u1").child("RoutineModel");

        let err = db.read_all(&handle).await.unwrap_err();
        assert_eq!(err.to_string(), "Database not connected (offline mode)");
    }

    #[test]
    fn test_collection_segments_rejects_document_paths() {
        let doc = RemoteHandle::root("User").child("u1");
        assert!(collection_segments(&doc).is_err());
        let col = doc.child("Settings");
        assert_eq!(collection_segments(&col).unwrap().len(), 3);
    }

    #[test]
    fn test_strip_metadata() {
        let value = serde_json::json!({
            "routineId": "r1",
            "_firestore_id": "r1",
            "_firestore_updated": "2026-01-01T00:00:00Z"
        });
        assert_eq!(strip_metadata(value), serde_json::json!({"routineId": "r1"}));
    }

    #[test]
    fn test_document_id_from_name() {
        let doc = Document {
            name: "projects/p/databases/(default)/documents/Training/u1/RoutineModel/r9"
                .to_string(),
            ..Default::default()
        };
        assert_eq!(document_id(&doc), "r9");
    }
}
