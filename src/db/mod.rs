//! Durable key-value storage for client state.

pub mod memory;
pub mod redb;

pub use self::redb::RedbStore;
pub use memory::MemoryStore;

/// Storage keys as constants.
pub mod keys {
    pub const IS_LOGGED_IN: &str = "isLoggedIn";
    pub const USERNAME: &str = "username";
    pub const CURRENT_SCREEN: &str = "currentScreen";
    /// Serialized `Session` (opaque JSON bytes)
    pub const SESSION: &str = "session";
}

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(String),
}

/// Key-value storage for small pieces of client state.
///
/// Writes are last-writer-wins; every writer runs on the same coordination
/// context, so no locking beyond the implementation's own is needed.
pub trait KeyValueStore: Send + Sync {
    /// Get the value for a key. Returns None if the key does not exist.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Set a key-value pair, replacing any previous value.
    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Delete a key. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Read a UTF-8 string value.
    fn get_string(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .get(key)?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Read a boolean stored as `"true"`/`"false"`; anything else is false.
    fn get_bool(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.get_string(key)?.as_deref() == Some("true"))
    }

    fn set_string(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.set(key, value.as_bytes())
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<(), StoreError> {
        self.set_string(key, if value { "true" } else { "false" })
    }
}
