//! Durable key-value storage for the cart snapshot.
//!
//! The cart is mirrored to a single slot, [`CART_STORAGE_KEY`], after every
//! successful mutation (write-through, no buffering). The slot holds the
//! serialized cart as a JSON array of line items.
//!
//! [`FileStorage`] keeps slots in one JSON file on disk; [`MemoryStorage`]
//! keeps them in memory for ephemeral carts and tests.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;
use tracing::debug;

/// The slot the serialized cart is persisted under.
pub const CART_STORAGE_KEY: &str = "@RocketShoes:cart";

/// Errors that can occur reading or writing durable storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem read or write failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing store is not well-formed JSON.
    #[error("corrupt storage file: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// The storage mutex was poisoned by a panicking writer.
    #[error("storage lock poisoned")]
    Poisoned,
}

/// Durable string-keyed slot storage.
///
/// Access is synchronous: a successful in-memory mutation and its
/// write-through happen with no suspension point between them.
pub trait CartStorage: Send + Sync {
    /// Read the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written. There is
    /// no retry; the caller treats a failed write as a failed operation.
    fn store(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Slot storage backed by a single JSON file.
///
/// The file holds a string-to-string object, one entry per slot, standing
/// in for the browser's local-storage area. A missing file reads as empty.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Create a file storage rooted at `path`.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn read_slots(&self) -> Result<HashMap<String, String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(err) => Err(err.into()),
        }
    }
}

impl CartStorage for FileStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_slots()?.remove(key))
    }

    fn store(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut slots = self.read_slots()?;
        slots.insert(key.to_owned(), value.to_owned());
        fs::write(&self.path, serde_json::to_string_pretty(&slots)?)?;
        debug!(path = %self.path.display(), key, "wrote storage slot");
        Ok(())
    }
}

/// In-memory slot storage for ephemeral carts and tests.
#[derive(Default)]
pub struct MemoryStorage {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a storage pre-seeded with one slot.
    #[must_use]
    pub fn with_slot(key: &str, value: &str) -> Self {
        let storage = Self::new();
        let mut slots = storage.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.insert(key.to_owned(), value.to_owned());
        drop(slots);
        storage
    }
}

impl CartStorage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        let slots = self.slots.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(slots.get(key).cloned())
    }

    fn store(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut slots = self.slots.lock().map_err(|_| StorageError::Poisoned)?;
        slots.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}
