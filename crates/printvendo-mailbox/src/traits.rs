//! Trait definition for mailbox store backends.
//!
//! Implementations may vary (remote object store, in-memory test double) but
//! must satisfy this contract, in particular the at-most-once delete
//! semantics documented on [`Mailbox::delete`].

use async_trait::async_trait;

use printvendo_types::{EntryName, MachineId};

use crate::error::Result;

/// Handle to a machine's mailbox folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderRef {
    /// Store-assigned folder id.
    pub id: String,
}

/// Handle to one entry inside a mailbox folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRef {
    /// Store-assigned entry id; the delete key.
    pub id: String,
    /// The entry's file name.
    pub name: String,
}

/// A remote folder store used as a per-machine mailbox.
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// Resolve the pre-provisioned folder for a machine.
    ///
    /// Fails with `FolderNotFound` when the machine was never provisioned;
    /// sessions never create folders implicitly.
    async fn ensure_folder(&self, machine: &MachineId) -> Result<FolderRef>;

    /// Create the machine folder and its standard subfolders.
    ///
    /// Operator tooling only. Idempotent: an existing folder is returned
    /// as-is.
    async fn provision(&self, machine: &MachineId) -> Result<FolderRef>;

    /// Write an entry. Create-new semantics: an existing same-named entry is
    /// not replaced atomically: delete first or tolerate duplicates.
    async fn write(&self, folder: &FolderRef, name: &EntryName, bytes: &[u8]) -> Result<EntryRef>;

    /// Read an entry's bytes, newest match first. `None` when absent.
    async fn read(&self, folder: &FolderRef, name: &EntryName) -> Result<Option<Vec<u8>>>;

    /// Probe for an entry without fetching its body.
    async fn find(&self, folder: &FolderRef, name: &EntryName) -> Result<Option<EntryRef>>;

    /// Delete an entry: the consumption primitive.
    ///
    /// `Ok(true)`: this caller consumed the entry. `Ok(false)`: the entry
    /// was already gone, someone else consumed it; never an error.
    async fn delete(&self, entry: &EntryRef) -> Result<bool>;

    /// List the folder's entries (files only).
    async fn list(&self, folder: &FolderRef) -> Result<Vec<EntryRef>>;

    /// Delete every file under the folder, keeping the folder structure.
    /// Recurses one level into subfolders. Returns the number deleted.
    async fn purge(&self, folder: &FolderRef) -> Result<u32>;
}
