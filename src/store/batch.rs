//! Atomic write batches with version preconditions.

use crate::store::{DocRef, Document};

/// One staged write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Set { doc: DocRef, value: Document },
    Delete { doc: DocRef },
}

impl WriteOp {
    pub fn doc(&self) -> &DocRef {
        match self {
            WriteOp::Set { doc, .. } | WriteOp::Delete { doc } => doc,
        }
    }
}

/// A condition the store must confirm before applying a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// The document exists at exactly this version
    Version { doc: DocRef, version: u64 },
    /// The document does not exist
    Missing { doc: DocRef },
}

impl Precondition {
    pub fn doc(&self) -> &DocRef {
        match self {
            Precondition::Version { doc, .. } | Precondition::Missing { doc } => doc,
        }
    }
}

// == Write Batch ==
/// Writes applied all together or not at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
    preconditions: Vec<Precondition>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, doc: DocRef, value: impl Into<Document>) -> &mut Self {
        self.ops.push(WriteOp::Set {
            doc,
            value: value.into(),
        });
        self
    }

    pub fn delete(&mut self, doc: DocRef) -> &mut Self {
        self.ops.push(WriteOp::Delete { doc });
        self
    }

    /// Fails the commit unless `doc` is still at `version`.
    pub fn expect_version(&mut self, doc: DocRef, version: u64) -> &mut Self {
        self.preconditions.push(Precondition::Version { doc, version });
        self
    }

    /// Fails the commit if `doc` exists.
    pub fn expect_missing(&mut self, doc: DocRef) -> &mut Self {
        self.preconditions.push(Precondition::Missing { doc });
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn preconditions(&self) -> &[Precondition] {
        &self.preconditions
    }

    pub fn into_parts(self) -> (Vec<WriteOp>, Vec<Precondition>) {
        (self.ops, self.preconditions)
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }
}
