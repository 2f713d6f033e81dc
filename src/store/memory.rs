//! In-memory document store and object storage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::{
    Collection, DocRef, Document, DocumentStore, Filter, ObjectStorage, Precondition,
    StoreResult, StoredObject, Versioned, WriteBatch, WriteOp,
};

#[derive(Debug, Default)]
struct Documents {
    docs: HashMap<DocRef, Versioned<Document>>,
    last_version: u64,
}

// == Memory Document Store ==
/// Document store held in a map behind one lock; commits are serialized.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    inner: RwLock<Documents>,
    forced_conflicts: AtomicUsize,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` commits fail with a conflict, as if another
    /// writer got there first.
    pub fn inject_conflicts(&self, count: usize) {
        self.forced_conflicts.store(count, Ordering::SeqCst);
    }

    /// Number of documents in `collection`.
    pub async fn count(&self, collection: &Collection) -> usize {
        self.inner
            .read()
            .await
            .docs
            .keys()
            .filter(|doc| &doc.collection == collection)
            .count()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.docs.len()
    }

    fn take_forced_conflict(&self) -> bool {
        self.forced_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, doc: &DocRef) -> StoreResult<Option<Versioned<Document>>> {
        Ok(self.inner.read().await.docs.get(doc).cloned())
    }

    async fn query(
        &self,
        collection: &Collection,
        filter: &Filter,
    ) -> StoreResult<Vec<(DocRef, Versioned<Document>)>> {
        let inner = self.inner.read().await;
        let mut found: Vec<(DocRef, Versioned<Document>)> = inner
            .docs
            .iter()
            .filter(|(doc, stored)| &doc.collection == collection && stored.value.matches(filter))
            .map(|(doc, stored)| (doc.clone(), stored.clone()))
            .collect();
        found.sort_by(|a, b| a.0.id.cmp(&b.0.id));
        Ok(found)
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut inner = self.inner.write().await;

        if self.take_forced_conflict() {
            let doc = batch
                .ops()
                .first()
                .map(|op| op.doc().to_string())
                .unwrap_or_default();
            return Err(StoreError::Conflict(doc));
        }

        let (ops, preconditions) = batch.into_parts();

        for precondition in &preconditions {
            let current = inner.docs.get(precondition.doc()).map(|d| d.version);
            let holds = match precondition {
                Precondition::Version { version, .. } => current == Some(*version),
                Precondition::Missing { .. } => current.is_none(),
            };
            if !holds {
                return Err(StoreError::Conflict(precondition.doc().to_string()));
            }
        }

        for op in &ops {
            if let WriteOp::Set { doc, value } = op {
                if !value.belongs_to(&doc.collection) {
                    return Err(StoreError::InvalidDocument(format!(
                        "{} document cannot be written to {}",
                        value.kind(),
                        doc
                    )));
                }
            }
        }

        let applied = ops.len();
        for op in ops {
            match op {
                WriteOp::Set { doc, value } => {
                    inner.last_version += 1;
                    let version = inner.last_version;
                    inner.docs.insert(doc, Versioned { version, value });
                }
                WriteOp::Delete { doc } => {
                    inner.docs.remove(&doc);
                }
            }
        }

        debug!(ops = applied, "batch committed");
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Blob {
    bytes: Vec<u8>,
    meta: StoredObject,
}

// == Memory Object Storage ==
/// Object storage held in a map; download URLs are opaque tokens.
#[derive(Debug, Default)]
pub struct MemoryObjectStorage {
    objects: RwLock<HashMap<String, Blob>>,
    failing_prefixes: RwLock<Vec<String>>,
}

impl MemoryObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every delete under `prefix` fail with a backend error.
    pub async fn fail_deletes_under(&self, prefix: impl Into<String>) {
        self.failing_prefixes.write().await.push(prefix.into());
    }

    pub async fn contains(&self, path: &str) -> bool {
        self.objects.read().await.contains_key(path)
    }

    pub async fn bytes(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.read().await.get(path).map(|b| b.bytes.clone())
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> StoreResult<StoredObject> {
        let meta = StoredObject {
            path: path.to_string(),
            url: format!("memory://{}?token={}", path, Uuid::new_v4()),
            size: bytes.len(),
            content_type: content_type.to_string(),
        };
        self.objects.write().await.insert(
            path.to_string(),
            Blob {
                bytes,
                meta: meta.clone(),
            },
        );
        Ok(meta)
    }

    async fn delete(&self, path: &str) -> StoreResult<()> {
        let failing = self
            .failing_prefixes
            .read()
            .await
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()));
        if failing {
            return Err(StoreError::Backend(format!("delete refused for {}", path)));
        }

        match self.objects.write().await.remove(path) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(path.to_string())),
        }
    }

    async fn list(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let mut paths: Vec<String> = self
            .objects
            .read()
            .await
            .values()
            .filter(|blob| blob.meta.path.starts_with(prefix))
            .map(|blob| blob.meta.path.clone())
            .collect();
        paths.sort();
        Ok(paths)
    }
}
