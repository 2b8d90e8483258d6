//! Local address book access and phone number normalization.

use crate::error::{AppError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

/// One entry of the device address book.
#[derive(Debug, Clone, Deserialize)]
pub struct LocalContact {
    pub name: String,
    #[serde(default)]
    pub phone_numbers: Vec<String>,
}

/// Enumerates device contacts. Opaque platform capability.
#[async_trait]
pub trait ContactSource: Send + Sync {
    async fn enumerate(&self) -> Result<Vec<LocalContact>>;
}

/// Strip every non-digit character: `"(718) 223-4425"` → `"7182234425"`.
pub fn normalize_phone_number(phone_number: &str) -> String {
    phone_number.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Deduplicated normalized numbers plus the local name each one came from.
#[derive(Debug, Default)]
pub struct PhoneIndex {
    /// Sorted, unique, non-empty normalized numbers.
    pub numbers: Vec<String>,
    names: HashMap<String, String>,
}

impl PhoneIndex {
    pub fn build(contacts: &[LocalContact]) -> Self {
        let mut numbers = BTreeSet::new();
        let mut names = HashMap::new();

        for contact in contacts {
            for raw in &contact.phone_numbers {
                let number = normalize_phone_number(raw);
                if number.is_empty() {
                    continue;
                }
                names
                    .entry(number.clone())
                    .or_insert_with(|| contact.name.trim().to_string());
                numbers.insert(number);
            }
        }

        Self {
            numbers: numbers.into_iter().collect(),
            names,
        }
    }

    /// Local name for a number as the server echoed it back.
    pub fn name_for(&self, phone_number: &str) -> Option<&str> {
        self.names
            .get(&normalize_phone_number(phone_number))
            .map(String::as_str)
    }
}

/// Address book exported as a JSON array of `{name, phone_numbers}`.
pub struct FileContactSource {
    path: PathBuf,
}

impl FileContactSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ContactSource for FileContactSource {
    async fn enumerate(&self) -> Result<Vec<LocalContact>> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            AppError::Internal(anyhow::anyhow!(
                "Failed to read contacts file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        serde_json::from_str(&content)
            .map_err(|e| AppError::Decode(format!("Contacts file: {}", e)))
    }
}

/// Source with no contacts, for devices without an address book.
pub struct NoContacts;

#[async_trait]
impl ContactSource for NoContacts {
    async fn enumerate(&self) -> Result<Vec<LocalContact>> {
        Ok(Vec::new())
    }
}
