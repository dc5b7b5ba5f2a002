//! Storage engine for myjql.
//!
//! This crate provides:
//! - Pager for page-level file I/O with a flat in-memory cache
//! - Node codec interpreting raw pages as B+ tree leaf/internal nodes
//! - Cursor-based search over leaf cells in key order
//! - B+ tree insert and delete with splits, redistribution, and merges
//! - Row representation and serialization
//! - Debug helpers for tree validation and page dumps

pub mod btree;
pub mod cursor;
pub mod debug;
pub mod node;
pub mod pager;
pub mod row;
pub mod table;

pub use cursor::Cursor;
pub use pager::Pager;
pub use row::{key_from_str, Key, Row, COLUMN_B_SIZE, KEY_SIZE, ROW_SIZE};
pub use table::Table;
