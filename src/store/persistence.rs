//! Persistence layer for the Return Store

use crate::error::StorageError;
use crate::store::{ReturnRecord, ReturnStore};
use std::path::Path;
use tracing::debug;

const RETURN_PREFIX: &str = "return:";

/// Sled-based implementation of ReturnStore
pub struct SledReturnStore {
    db: sled::Db,
}

fn backend(context: &str, e: sled::Error) -> StorageError {
    StorageError::Backend(format!("{}: {}", context, e))
}

fn key(return_id: &str) -> String {
    format!("{}{}", RETURN_PREFIX, return_id)
}

impl SledReturnStore {
    /// Open (or create) a store at the given directory
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path).map_err(|e| {
            StorageError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to open sled database: {}", e),
            ))
        })?;
        Ok(Self { db })
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db
            .flush()
            .map_err(|e| backend("Failed to flush database", e))?;
        Ok(())
    }
}

impl ReturnStore for SledReturnStore {
    fn get(&self, return_id: &str) -> Result<Option<ReturnRecord>, StorageError> {
        match self
            .db
            .get(key(return_id))
            .map_err(|e| backend("Failed to get return", e))?
        {
            Some(value) => {
                let record: ReturnRecord = bincode::deserialize(&value).map_err(|e| {
                    StorageError::Encoding(format!("Failed to deserialize return record: {}", e))
                })?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn put(&self, record: &ReturnRecord) -> Result<(), StorageError> {
        let value = bincode::serialize(record).map_err(|e| {
            StorageError::Encoding(format!("Failed to serialize return record: {}", e))
        })?;
        self.db
            .insert(key(&record.return_id).as_bytes(), value)
            .map_err(|e| backend("Failed to put return", e))?;
        self.flush()?;
        debug!(return_id = %record.return_id, "Stored return");
        Ok(())
    }

    fn delete(&self, return_id: &str) -> Result<bool, StorageError> {
        let removed = self
            .db
            .remove(key(return_id))
            .map_err(|e| backend("Failed to delete return", e))?;
        self.flush()?;
        Ok(removed.is_some())
    }

    fn list(&self) -> Result<Vec<String>, StorageError> {
        let mut ids = Vec::new();
        for item in self.db.scan_prefix(RETURN_PREFIX) {
            let (key, _) = item.map_err(|e| backend("Failed to iterate store", e))?;
            let id = String::from_utf8_lossy(&key[RETURN_PREFIX.len()..]).into_owned();
            ids.push(id);
        }
        Ok(ids)
    }
}
