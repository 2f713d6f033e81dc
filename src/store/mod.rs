//! Store Module
//!
//! Seams to the document database and the object store, typed documents,
//! atomic batches and optimistic transactions.

mod batch;
mod document;
mod memory;
mod traits;
mod transaction;

pub mod paths;

pub use batch::{Precondition, WriteBatch, WriteOp};
pub use document::{Collection, DocRef, Document, DocumentKind, Filter, Versioned};
pub use memory::{MemoryDocumentStore, MemoryObjectStorage};
pub use traits::{fetch_as, query_as, DocumentStore, ObjectStorage, StoreResult, StoredObject};
pub use transaction::{run_transaction, Transaction, MAX_TRANSACTION_ATTEMPTS};
