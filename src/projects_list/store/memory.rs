use super::{broadcast, ChangeEvent, Document, DocumentStore};
use crate::error::{ProjectsListError, Result};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::mpsc::Sender;

#[derive(Clone)]
struct Entry {
    text: String,
    mtime: DateTime<Utc>,
}

/// In-memory document store for testing.
///
/// Store order is insertion order. Edits made through [`MemStore::edit_externally`]
/// notify subscribers immediately; the store's own writes do not.
#[derive(Default)]
pub struct MemStore {
    docs: RefCell<IndexMap<String, Entry>>,
    subscribers: RefCell<HashMap<String, Vec<Sender<ChangeEvent>>>>,
    simulate_write_error: RefCell<bool>,
    unreadable: RefCell<HashSet<String>>,
    write_count: RefCell<usize>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a document without notifying anyone.
    pub fn insert(&self, id: &str, text: &str, mtime: DateTime<Utc>) {
        self.docs.borrow_mut().insert(
            id.to_string(),
            Entry {
                text: text.to_string(),
                mtime,
            },
        );
    }

    /// Simulates a modification made outside this process.
    pub fn edit_externally(&self, id: &str, text: &str) {
        self.insert(id, text, Utc::now());
        let event = ChangeEvent { id: id.to_string() };
        if let Some(senders) = self.subscribers.borrow_mut().get_mut(id) {
            broadcast(senders, &event);
        }
    }

    pub fn remove(&self, id: &str) {
        self.docs.borrow_mut().shift_remove(id);
    }

    /// Current text, bypassing the trait.
    pub fn text(&self, id: &str) -> Option<String> {
        self.docs.borrow().get(id).map(|e| e.text.clone())
    }

    /// Enable write error simulation for testing error handling.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        *self.simulate_write_error.borrow_mut() = simulate;
    }

    /// Makes `read_text` fail for `id` while it stays listed.
    pub fn set_unreadable(&self, id: &str) {
        self.unreadable.borrow_mut().insert(id.to_string());
    }

    /// Number of successful `write_text` calls.
    pub fn write_count(&self) -> usize {
        *self.write_count.borrow()
    }
}

impl DocumentStore for MemStore {
    fn list_documents(&self) -> Result<Vec<Document>> {
        Ok(self
            .docs
            .borrow()
            .iter()
            .map(|(id, entry)| Document::from_id(id, entry.mtime))
            .collect())
    }

    fn read_text(&self, id: &str) -> Result<String> {
        if self.unreadable.borrow().contains(id) {
            return Err(ProjectsListError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "Simulated read error",
            )));
        }
        self.text(id)
            .ok_or_else(|| ProjectsListError::DocumentNotFound(id.to_string()))
    }

    fn write_text(&self, id: &str, text: &str) -> Result<()> {
        if *self.simulate_write_error.borrow() {
            return Err(ProjectsListError::Write {
                id: id.to_string(),
                reason: "Simulated write error".to_string(),
            });
        }

        let mut docs = self.docs.borrow_mut();
        let entry = docs.get_mut(id).ok_or_else(|| ProjectsListError::Write {
            id: id.to_string(),
            reason: "document no longer exists".to_string(),
        })?;
        entry.text = text.to_string();
        entry.mtime = Utc::now();
        *self.write_count.borrow_mut() += 1;
        Ok(())
    }

    fn subscribe(&self, id: &str, sender: Sender<ChangeEvent>) {
        self.subscribers
            .borrow_mut()
            .entry(id.to_string())
            .or_default()
            .push(sender);
    }

    fn poll_changes(&self) -> Result<usize> {
        Ok(0)
    }
}
