//! Mock implementation of the `Mailbox` trait for testing.
//!
//! Tracks folders and entries in memory. Uses `Arc<RwLock<...>>` internally,
//! so it is cheap to clone and all clones share the same state, which is
//! what the payment-race tests need: many pollers, one store.
//!
//! `delete` removes the entry under one write lock, so of N concurrent
//! deleters exactly one observes `Ok(true)`, matching the remote store's
//! at-most-once consumption contract.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use printvendo_mailbox::{EntryRef, FolderRef, Mailbox, MailboxError, Result};
use printvendo_types::{EntryName, MachineId};

#[derive(Debug, Clone)]
struct MockEntry {
    id: String,
    name: String,
    bytes: Vec<u8>,
}

#[derive(Debug, Default)]
struct MockMailboxInner {
    /// folder name -> folder id
    folders: HashMap<String, String>,
    /// folder id -> entries, in write order
    entries: HashMap<String, Vec<MockEntry>>,
    /// Auto-incrementing id counter.
    next_id: u64,
    /// When true, every operation fails with a retryable timeout.
    should_fail: bool,
}

impl MockMailboxInner {
    fn mint_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}_{}", self.next_id)
    }
}

/// An in-memory mailbox store for tests.
#[derive(Clone, Default)]
pub struct MockMailbox {
    inner: Arc<RwLock<MockMailboxInner>>,
}

impl MockMailbox {
    /// Empty store: no machine is provisioned.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with the given machine already provisioned.
    pub fn with_machine(machine: &MachineId) -> Self {
        let mock = Self::new();
        mock.provision_machine(machine);
        mock
    }

    /// Provision a machine folder synchronously (test setup).
    pub fn provision_machine(&self, machine: &MachineId) -> FolderRef {
        let mut inner = self.inner.write().unwrap();
        let folder_name = machine.folder_name();
        if let Some(id) = inner.folders.get(&folder_name) {
            return FolderRef { id: id.clone() };
        }
        let id = inner.mint_id("folder");
        inner.folders.insert(folder_name, id.clone());
        inner.entries.insert(id.clone(), Vec::new());
        FolderRef { id }
    }

    /// Drop a pre-made entry into a machine's folder, the way the billing
    /// terminal or the kiosk client would.
    pub fn plant_entry(&self, machine: &MachineId, name: &EntryName, bytes: &[u8]) -> EntryRef {
        let folder = self.provision_machine(machine);
        let mut inner = self.inner.write().unwrap();
        let id = inner.mint_id("entry");
        let entry = MockEntry {
            id: id.clone(),
            name: name.file_name().to_string(),
            bytes: bytes.to_vec(),
        };
        inner.entries.get_mut(&folder.id).unwrap().push(entry);
        EntryRef {
            id,
            name: name.file_name().to_string(),
        }
    }

    /// Latest bytes stored under a name, if any (test assertions).
    pub fn entry_bytes(&self, machine: &MachineId, name: &EntryName) -> Option<Vec<u8>> {
        let inner = self.inner.read().unwrap();
        let folder_id = inner.folders.get(&machine.folder_name())?;
        inner
            .entries
            .get(folder_id)?
            .iter()
            .rev()
            .find(|e| e.name == name.file_name())
            .map(|e| e.bytes.clone())
    }

    /// Whether any entry exists under a name (test assertions).
    pub fn has_entry(&self, machine: &MachineId, name: &EntryName) -> bool {
        self.entry_bytes(machine, name).is_some()
    }

    /// Total entries in a machine's folder (test assertions).
    pub fn entry_count(&self, machine: &MachineId) -> usize {
        let inner = self.inner.read().unwrap();
        inner
            .folders
            .get(&machine.folder_name())
            .and_then(|id| inner.entries.get(id))
            .map(|e| e.len())
            .unwrap_or(0)
    }

    /// Make every subsequent operation fail with a retryable timeout.
    pub fn set_should_fail(&self, should_fail: bool) {
        self.inner.write().unwrap().should_fail = should_fail;
    }

    fn check_failure(inner: &MockMailboxInner, what: &str) -> Result<()> {
        if inner.should_fail {
            Err(MailboxError::Timeout(what.to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Mailbox for MockMailbox {
    async fn ensure_folder(&self, machine: &MachineId) -> Result<FolderRef> {
        let inner = self.inner.read().unwrap();
        Self::check_failure(&inner, "ensure_folder")?;
        match inner.folders.get(&machine.folder_name()) {
            Some(id) => Ok(FolderRef { id: id.clone() }),
            None => Err(MailboxError::FolderNotFound(machine.to_string())),
        }
    }

    async fn provision(&self, machine: &MachineId) -> Result<FolderRef> {
        {
            let inner = self.inner.read().unwrap();
            Self::check_failure(&inner, "provision")?;
        }
        Ok(self.provision_machine(machine))
    }

    async fn write(&self, folder: &FolderRef, name: &EntryName, bytes: &[u8]) -> Result<EntryRef> {
        let mut inner = self.inner.write().unwrap();
        Self::check_failure(&inner, "write")?;
        let id = inner.mint_id("entry");
        let entry = MockEntry {
            id: id.clone(),
            name: name.file_name().to_string(),
            bytes: bytes.to_vec(),
        };
        inner
            .entries
            .get_mut(&folder.id)
            .ok_or_else(|| MailboxError::InvalidResponse("unknown folder".into()))?
            .push(entry);
        Ok(EntryRef {
            id,
            name: name.file_name().to_string(),
        })
    }

    async fn read(&self, folder: &FolderRef, name: &EntryName) -> Result<Option<Vec<u8>>> {
        let inner = self.inner.read().unwrap();
        Self::check_failure(&inner, "read")?;
        Ok(inner
            .entries
            .get(&folder.id)
            .and_then(|entries| {
                entries
                    .iter()
                    .rev()
                    .find(|e| e.name == name.file_name())
            })
            .map(|e| e.bytes.clone()))
    }

    async fn find(&self, folder: &FolderRef, name: &EntryName) -> Result<Option<EntryRef>> {
        let inner = self.inner.read().unwrap();
        Self::check_failure(&inner, "find")?;
        Ok(inner
            .entries
            .get(&folder.id)
            .and_then(|entries| {
                entries
                    .iter()
                    .rev()
                    .find(|e| e.name == name.file_name())
            })
            .map(|e| EntryRef {
                id: e.id.clone(),
                name: e.name.clone(),
            }))
    }

    async fn delete(&self, entry: &EntryRef) -> Result<bool> {
        let mut inner = self.inner.write().unwrap();
        Self::check_failure(&inner, "delete")?;
        for entries in inner.entries.values_mut() {
            if let Some(pos) = entries.iter().position(|e| e.id == entry.id) {
                entries.remove(pos);
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn list(&self, folder: &FolderRef) -> Result<Vec<EntryRef>> {
        let inner = self.inner.read().unwrap();
        Self::check_failure(&inner, "list")?;
        Ok(inner
            .entries
            .get(&folder.id)
            .map(|entries| {
                entries
                    .iter()
                    .map(|e| EntryRef {
                        id: e.id.clone(),
                        name: e.name.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn purge(&self, folder: &FolderRef) -> Result<u32> {
        let mut inner = self.inner.write().unwrap();
        Self::check_failure(&inner, "purge")?;
        Ok(inner
            .entries
            .get_mut(&folder.id)
            .map(|entries| {
                let count = entries.len() as u32;
                entries.clear();
                count
            })
            .unwrap_or(0))
    }
}
