//! Optimistic transactions over a `DocumentStore`.
//!
//! A transaction remembers the version of every document it reads and
//! stages its writes. On commit the reads become preconditions, so the
//! batch only applies if nothing it looked at changed in the meantime.
//! `run_transaction` retries the whole body when that check fails.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{AppError, Result, StoreError};
use crate::store::{DocRef, Document, DocumentKind, DocumentStore, StoreResult, WriteBatch};

/// Attempts before a conflicting transaction gives up.
pub const MAX_TRANSACTION_ATTEMPTS: usize = 5;

// == Transaction ==
pub struct Transaction {
    store: Arc<dyn DocumentStore>,
    /// Version seen per document read, `None` if it was missing
    reads: HashMap<DocRef, Option<u64>>,
    writes: WriteBatch,
}

impl Transaction {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            reads: HashMap::new(),
            writes: WriteBatch::new(),
        }
    }

    /// Reads a document and records its version.
    pub async fn get(&mut self, doc: &DocRef) -> StoreResult<Option<Document>> {
        let found = self.store.get(doc).await?;
        let version = found.as_ref().map(|v| v.version);

        // Keep the first observation; later reads must not mask a change
        self.reads.entry(doc.clone()).or_insert(version);
        Ok(found.map(|v| v.value))
    }

    /// Reads a document expected to be of type `T`.
    pub async fn get_as<T: DocumentKind>(&mut self, doc: &DocRef) -> StoreResult<Option<T>> {
        match self.get(doc).await? {
            Some(value) => {
                let kind = value.kind();
                T::from_document(value).map(Some).ok_or_else(|| {
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

    pub fn set(&mut self, doc: DocRef, value: impl Into<Document>) {
        self.writes.set(doc, value);
    }

    pub fn delete(&mut self, doc: DocRef) {
        self.writes.delete(doc);
    }

    /// Commits staged writes, guarded by every read made so far.
    pub async fn commit(self) -> StoreResult<()> {
        if self.writes.is_empty() {
            return Ok(());
        }

        let mut batch = self.writes;
        for (doc, version) in self.reads {
            match version {
                Some(version) => batch.expect_version(doc, version),
                None => batch.expect_missing(doc),
            };
        }
        self.store.commit(batch).await
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("reads", &self.reads.len())
            .field("writes", &self.writes.len())
            .finish()
    }
}

// == Run Transaction ==
/// Runs `body` in a fresh transaction and commits what it staged.
///
/// `body` receives the transaction by value and hands it back with its
/// result. Any error from `body` aborts without writing anything; a commit
/// conflict reruns `body` from scratch, up to `MAX_TRANSACTION_ATTEMPTS` times.
pub async fn run_transaction<T, F, Fut>(store: &Arc<dyn DocumentStore>, mut body: F) -> Result<T>
where
    F: FnMut(Transaction) -> Fut,
    Fut: Future<Output = Result<(Transaction, T)>>,
{
    let mut last_conflict = String::new();

    for attempt in 1..=MAX_TRANSACTION_ATTEMPTS {
        let tx = Transaction::new(Arc::clone(store));
        let (tx, value) = body(tx).await?;

        match tx.commit().await {
            Ok(()) => {
                debug!(attempt, "transaction committed");
                return Ok(value);
            }
            Err(StoreError::Conflict(doc)) => {
                warn!(attempt, doc = %doc, "transaction conflict, retrying");
                last_conflict = doc;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(AppError::Conflict(format!(
        "gave up after {} attempts, last conflict on {}",
        MAX_TRANSACTION_ATTEMPTS, last_conflict
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UsernameReservation;
    use crate::store::MemoryDocumentStore;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn reservation(uid: &str) -> UsernameReservation {
        UsernameReservation {
            username: "ana".into(),
            uid: uid.into(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_read_then_write_commits() {
        let memory = Arc::new(MemoryDocumentStore::new());
        let store: Arc<dyn DocumentStore> = memory.clone();
        let doc = DocRef::username("ana");
        let doc = &doc;

        let created = run_transaction(&store, move |mut tx| async move {
            let existing = tx.get_as::<UsernameReservation>(doc).await?;
            if existing.is_some() {
                return Err(AppError::Rejected("taken".into()));
            }
            tx.set(doc.clone(), reservation("u1"));
            Ok((tx, true))
        })
        .await
        .unwrap();

        assert!(created);
        assert_eq!(memory.len().await, 1);
    }

    #[tokio::test]
    async fn test_body_error_writes_nothing() {
        let memory = Arc::new(MemoryDocumentStore::new());
        let store: Arc<dyn DocumentStore> = memory.clone();

        let result: Result<()> = run_transaction(&store, |mut tx| async move {
            tx.set(DocRef::username("ana"), reservation("u1"));
            Err(AppError::Rejected("nope".into()))
        })
        .await;

        assert!(matches!(result, Err(AppError::Rejected(_))));
        assert_eq!(memory.len().await, 0);
    }

    #[tokio::test]
    async fn test_conflict_reruns_body() {
        let memory = Arc::new(MemoryDocumentStore::new());
        memory.inject_conflicts(2);
        let store: Arc<dyn DocumentStore> = memory.clone();
        let runs = AtomicUsize::new(0);
        let runs = &runs;

        run_transaction(&store, move |mut tx| async move {
            runs.fetch_add(1, Ordering::SeqCst);
            tx.set(DocRef::username("ana"), reservation("u1"));
            Ok((tx, ()))
        })
        .await
        .unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let memory = Arc::new(MemoryDocumentStore::new());
        memory.inject_conflicts(MAX_TRANSACTION_ATTEMPTS);
        let store: Arc<dyn DocumentStore> = memory.clone();

        let result = run_transaction(&store, |mut tx| async move {
            tx.set(DocRef::username("ana"), reservation("u1"));
            Ok((tx, ()))
        })
        .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(memory.len().await, 0);
    }

    #[tokio::test]
    async fn test_concurrent_write_invalidates_read() {
        let memory = Arc::new(MemoryDocumentStore::new());
        let store: Arc<dyn DocumentStore> = memory.clone();
        let doc = DocRef::username("ana");

        let mut tx = Transaction::new(Arc::clone(&store));
        assert!(tx.get(&doc).await.unwrap().is_none());
        tx.set(doc.clone(), reservation("u1"));

        // Someone else claims the name between our read and our commit
        let mut batch = WriteBatch::new();
        batch.set(doc.clone(), reservation("u2"));
        store.commit(batch).await.unwrap();

        assert!(matches!(tx.commit().await, Err(StoreError::Conflict(_))));
        let stored = store.get(&doc).await.unwrap().unwrap();
        assert!(matches!(stored.value, Document::Username(r) if r.uid == "u2"));
    }

    #[tokio::test]
    async fn test_get_as_wrong_kind() {
        let memory = Arc::new(MemoryDocumentStore::new());
        let store: Arc<dyn DocumentStore> = memory.clone();
        let doc = DocRef::username("ana");
        let mut batch = WriteBatch::new();
        batch.set(doc.clone(), reservation("u1"));
        store.commit(batch).await.unwrap();

        let mut tx = Transaction::new(store);
        let result = tx.get_as::<crate::models::Project>(&doc).await;
        assert!(matches!(result, Err(StoreError::InvalidDocument(_))));
    }
}
