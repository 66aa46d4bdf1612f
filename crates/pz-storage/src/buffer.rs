//! Pending store mutations.
//!
//! The registry mutates zones in memory under its write lock and records
//! what must reach disk as a list of [`Mutation`]s. The list is applied after
//! the state lock is released, so slow I/O never blocks readers.

use crate::error::StorageResult;
use crate::record::{Manifest, ZoneRecord};
use crate::store::ZoneStore;

/// A write to be applied to a [`ZoneStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Insert or replace a zone record.
    PutRecord(ZoneRecord),
    /// Remove the record stored under a key.
    DeleteRecord(String),
    /// Replace the manifest.
    PutManifest(Manifest),
}

impl Mutation {
    /// Apply this mutation to `store`.
    pub fn apply<S: ZoneStore + ?Sized>(&self, store: &S) -> StorageResult<()> {
        match self {
            Self::PutRecord(record) => store.save_record(record),
            Self::DeleteRecord(key) => store.delete_record(key).map(|_| ()),
            Self::PutManifest(manifest) => store.save_manifest(manifest),
        }
    }
}

/// Ordered batch of mutations produced by one registry operation.
#[derive(Debug, Default)]
pub struct MutationBuffer {
    pending: Vec<Mutation>,
}

impl MutationBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_record(&mut self, record: ZoneRecord) {
        self.pending.push(Mutation::PutRecord(record));
    }

    pub fn delete_record(&mut self, key: impl Into<String>) {
        self.pending.push(Mutation::DeleteRecord(key.into()));
    }

    pub fn put_manifest(&mut self, manifest: Manifest) {
        self.pending.push(Mutation::PutManifest(manifest));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Apply every mutation in order, stopping at the first failure.
    ///
    /// Mutations after a failure are not attempted; the error names the one
    /// that failed.
    pub fn apply<S: ZoneStore + ?Sized>(self, store: &S) -> StorageResult<()> {
        for mutation in &self.pending {
            if let Err(e) = mutation.apply(store) {
                tracing::error!("Failed to persist {}: {e}", describe(mutation));
                return Err(e);
            }
        }
        Ok(())
    }
}

fn describe(mutation: &Mutation) -> String {
    match mutation {
        Mutation::PutRecord(record) => format!("record {}", record.key()),
        Mutation::DeleteRecord(key) => format!("deletion of record {key}"),
        Mutation::PutManifest(_) => "manifest".to_owned(),
    }
}
