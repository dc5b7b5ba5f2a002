//! Configuration structures for myjql.

use crate::page::MAX_PAGES;
use serde::{Deserialize, Serialize};

/// Storage configuration for the database engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Pager cache capacity in number of page slots.
    pub max_pages: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            max_pages: MAX_PAGES,
        }
    }
}

impl StorageConfig {
    /// Returns the total cache size in bytes.
    pub fn cache_size_bytes(&self) -> usize {
        self.max_pages * crate::page::PAGE_SIZE
    }
}
