//! Object export sources.
//!
//! The engine pulls raw export JSON through [`ObjectStore`]. The HTTP
//! registry backend lives in [`crate::client`]; [`MemoryStore`] backs the
//! tests and any offline use.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::ObjectType;

/// Errors from an export source.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The object does not exist, or had no state at the requested time.
    #[error("{object_type} {id} not found")]
    NotFound {
        /// Object type requested.
        object_type: ObjectType,
        /// Identifier requested.
        id: i64,
    },

    /// The backend failed.
    #[error("store backend error: {message}")]
    Backend {
        /// What went wrong.
        message: String,
    },
}

/// A source of raw object exports.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetches the current export of an object.
    async fn fetch(&self, object_type: ObjectType, id: i64) -> Result<Vec<u8>, StoreError>;

    /// Fetches the export of an object as it stood at a Unix timestamp.
    async fn fetch_at(
        &self,
        object_type: ObjectType,
        id: i64,
        timestamp: i64,
    ) -> Result<Vec<u8>, StoreError>;
}

struct Window {
    valid_from: i64,
    valid_to: Option<i64>,
    data: Vec<u8>,
}

/// In-memory export store with validity windows per object.
///
/// Each `put` opens a window from the given timestamp; a later `put` for
/// the same object closes the previous window. `fetch` serves the latest
/// window, `fetch_at` the window containing the timestamp.
#[derive(Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<(ObjectType, i64), Vec<Window>>>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an export valid from `valid_from` onward.
    pub fn put(&self, object_type: ObjectType, id: i64, valid_from: i64, data: Vec<u8>) {
        let mut objects = match self.objects.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let windows = objects.entry((object_type, id)).or_default();
        if let Some(last) = windows.last_mut() {
            if last.valid_to.is_none() {
                last.valid_to = Some(valid_from);
            }
        }
        windows.push(Window {
            valid_from,
            valid_to: None,
            data,
        });
    }

}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn fetch(&self, object_type: ObjectType, id: i64) -> Result<Vec<u8>, StoreError> {
        let objects = match self.objects.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        objects
            .get(&(object_type, id))
            .and_then(|windows| windows.last())
            .map(|w| w.data.clone())
            .ok_or(StoreError::NotFound { object_type, id })
    }

    async fn fetch_at(
        &self,
        object_type: ObjectType,
        id: i64,
        timestamp: i64,
    ) -> Result<Vec<u8>, StoreError> {
        let objects = match self.objects.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        objects
            .get(&(object_type, id))
            .and_then(|windows| {
                windows.iter().find(|w| {
                    w.valid_from <= timestamp
                        && w.valid_to.map_or(true, |end| timestamp < end)
                })
            })
            .map(|w| w.data.clone())
            .ok_or(StoreError::NotFound { object_type, id })
    }
}
