//! Table facade: the single on-disk table and its engine operations.

use crate::cursor::SearchBias;
use crate::node::{set_node_root, LeafNode};
use crate::pager::Pager;
use crate::row::{Key, Row};
use myjql_common::{Result, StorageConfig};
use std::path::Path;
use tracing::debug;

/// The single key/value table: a B+ tree rooted at page 0 over a pager.
pub struct Table {
    pub(crate) pager: Pager,
    pub(crate) root_page_num: u32,
    closed: bool,
}

impl Table {
    /// Opens the table with the default configuration, creating the
    /// database file if missing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, &StorageConfig::default())
    }

    /// Opens the table with an explicit configuration.
    pub fn open_with_config(path: impl AsRef<Path>, config: &StorageConfig) -> Result<Self> {
        let mut pager = Pager::open(path, config)?;

        if pager.num_pages() == 0 {
            // New database file: page 0 becomes an empty leaf root.
            let page = pager.page(0)?;
            LeafNode::new(page).init();
            set_node_root(page, true);
            debug!("initialized new database: page 0 as leaf root");
        }

        Ok(Self {
            pager,
            root_page_num: 0,
            closed: false,
        })
    }

    /// Inserts a row at its key position. Duplicate keys append after the
    /// existing run.
    pub fn insert(&mut self, row: &Row) -> Result<()> {
        self.insert_row(row)
    }

    /// Returns every row whose key equals `key`, in stored order.
    pub fn select(&mut self, key: &Key) -> Result<Vec<Row>> {
        let mut cursor = self.find(key, SearchBias::Leftmost)?;
        self.normalize(&mut cursor)?;

        let mut rows = Vec::new();
        while !cursor.end_of_table {
            if self.cursor_key(&cursor)? != *key {
                break;
            }
            rows.push(self.cursor_row(&cursor)?);
            self.advance(&mut cursor)?;
        }
        Ok(rows)
    }

    /// Returns every row of the table in key order.
    pub fn scan(&mut self) -> Result<Vec<Row>> {
        let mut cursor = self.start()?;
        let mut rows = Vec::new();
        while !cursor.end_of_table {
            rows.push(self.cursor_row(&cursor)?);
            self.advance(&mut cursor)?;
        }
        Ok(rows)
    }

    /// Deletes every row whose key equals `key`, one at a time. Returns
    /// the number of rows removed.
    pub fn delete(&mut self, key: &Key) -> Result<u64> {
        self.delete_all(key)
    }

    /// Flushes every resident page and consumes the table.
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.pager.close()
    }
}

impl Drop for Table {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.pager.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{is_node_root, node_type, NodeType};
    use crate::row::key_from_str;
    use tempfile::tempdir;

    #[test]
    fn test_open_initializes_leaf_root() {
        let dir = tempdir().unwrap();
        let mut table = Table::open(dir.path().join("t.db")).unwrap();

        assert_eq!(table.pager.num_pages(), 1);
        let page = table.pager.page(0).unwrap();
        assert_eq!(node_type(page), NodeType::Leaf);
        assert!(is_node_root(page));
        assert_eq!(LeafNode::new(page).num_cells(), 0);
    }

    #[test]
    fn test_first_insert_lands_in_root_leaf() {
        let dir = tempdir().unwrap();
        let mut table = Table::open(dir.path().join("t.db")).unwrap();

        table.insert(&Row::new(1, "apple").unwrap()).unwrap();

        assert_eq!(table.pager.num_pages(), 1);
        let page = table.pager.page(0).unwrap();
        let leaf = LeafNode::new(page);
        assert_eq!(leaf.num_cells(), 1);
        assert_eq!(leaf.row(0).b(), "apple");
    }

    #[test]
    fn test_insert_and_scan() {
        let dir = tempdir().unwrap();
        let mut table = Table::open(dir.path().join("t.db")).unwrap();

        table.insert(&Row::new(2, "banana").unwrap()).unwrap();
        table.insert(&Row::new(1, "apple").unwrap()).unwrap();

        let rows = table.scan().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].b(), "apple");
        assert_eq!(rows[1].b(), "banana");
    }

    #[test]
    fn test_select_missing_key_is_empty() {
        let dir = tempdir().unwrap();
        let mut table = Table::open(dir.path().join("t.db")).unwrap();
        table.insert(&Row::new(1, "apple").unwrap()).unwrap();

        let rows = table.select(&key_from_str("banana")).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_reopen_preserves_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.db");

        {
            let mut table = Table::open(&path).unwrap();
            table.insert(&Row::new(7, "kept").unwrap()).unwrap();
            table.close().unwrap();
        }

        let mut table = Table::open(&path).unwrap();
        let rows = table.select(&key_from_str("kept")).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].a, 7);
    }

    #[test]
    fn test_drop_flushes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.db");

        {
            let mut table = Table::open(&path).unwrap();
            table.insert(&Row::new(3, "dropped").unwrap()).unwrap();
            // Dropped without an explicit close.
        }

        let mut table = Table::open(&path).unwrap();
        assert_eq!(table.select(&key_from_str("dropped")).unwrap().len(), 1);
    }
}
