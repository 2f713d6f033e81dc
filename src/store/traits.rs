//! Storage backend traits.
//!
//! The document database and the object store are external services. These
//! traits are the seams the domain services talk through; the in-memory
//! implementations back tests and local development.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::StoreError;
use crate::store::{Collection, DocRef, Document, DocumentKind, Filter, Versioned, WriteBatch};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Document database operations.
///
/// Implementations must apply `commit` atomically: either every
/// precondition holds and every op is applied, or nothing changes.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document with its current version.
    async fn get(&self, doc: &DocRef) -> StoreResult<Option<Versioned<Document>>>;

    /// All documents of `collection` matching `filter`, ordered by id.
    async fn query(
        &self,
        collection: &Collection,
        filter: &Filter,
    ) -> StoreResult<Vec<(DocRef, Versioned<Document>)>>;

    /// Apply a batch. Fails with `StoreError::Conflict` if a precondition
    /// no longer holds.
    async fn commit(&self, batch: WriteBatch) -> StoreResult<()>;
}

/// Metadata of an uploaded object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredObject {
    pub path: String,
    /// Opaque download URL
    pub url: String,
    pub size: usize,
    pub content_type: String,
}

/// Blob storage operations.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> StoreResult<StoredObject>;

    /// Fails with `StoreError::NotFound` if nothing is stored at `path`.
    async fn delete(&self, path: &str) -> StoreResult<()>;

    /// Paths under `prefix`, sorted.
    async fn list(&self, prefix: &str) -> StoreResult<Vec<String>>;
}

/// Reads one document outside a transaction, typed as `T`.
pub async fn fetch_as<T: DocumentKind>(
    store: &dyn DocumentStore,
    doc: &DocRef,
) -> StoreResult<Option<T>> {
    match store.get(doc).await? {
        Some(stored) => {
            let kind = stored.value.kind();
            T::from_document(stored.value).map(Some).ok_or_else(|| {
                StoreError::InvalidDocument(format!(
                    "expected {} at {}, found {}",
                    T::KIND,
                    doc,
                    kind
                ))
            })
        }
        None => Ok(None),
    }
}

/// Runs a query and keeps the documents of type `T`.
pub async fn query_as<T: DocumentKind>(
    store: &dyn DocumentStore,
    collection: &Collection,
    filter: &Filter,
) -> StoreResult<Vec<T>> {
    Ok(store
        .query(collection, filter)
        .await?
        .into_iter()
        .filter_map(|(_, stored)| T::from_document(stored.value))
        .collect())
}
