//! Cursor-based search over leaf cells in key order.
//!
//! A cursor is a plain position (page number, cell index, end flag); it
//! holds no reference into the pager and is valid only until the next
//! tree mutation.

use crate::node::{node_type, InternalNode, LeafNode, NodeType};
use crate::row::{Key, Row};
use crate::table::Table;
use myjql_common::{MyjqlError, Result};

/// A position over the leaf cells of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    /// Page number of the leaf the cursor points into.
    pub page_num: u32,
    /// Cell index within that leaf.
    pub cell_num: u32,
    /// Set once the cursor has moved past the last cell of the last leaf.
    pub end_of_table: bool,
}

/// Which end of a run of equal keys a descent lands on.
///
/// Lookups and deletes position at the leftmost equal cell; inserts
/// position one past the rightmost so duplicate runs stay in insertion
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SearchBias {
    Leftmost,
    Rightmost,
}

/// Binary search for the first index in `[0, n)` where `pred` is false.
fn partition_point_by(n: usize, mut pred: impl FnMut(usize) -> bool) -> usize {
    let mut lo = 0;
    let mut hi = n;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if pred(mid) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

impl Table {
    /// Descends from the root to the leaf position for `key`.
    ///
    /// With [`SearchBias::Leftmost`] the cursor lands on the leftmost cell
    /// `>= key` (following the leftmost equal separator); with
    /// [`SearchBias::Rightmost`] it lands one past the last cell `<= key`.
    /// Either index may equal the leaf's cell count.
    pub(crate) fn find(&mut self, key: &Key, bias: SearchBias) -> Result<Cursor> {
        let mut page_num = self.root_page_num;
        loop {
            let page = self.pager.page(page_num)?;
            match node_type(page) {
                NodeType::Leaf => {
                    let leaf = LeafNode::new(page);
                    let num_cells = leaf.num_cells() as usize;
                    let cell_num = partition_point_by(num_cells, |i| match bias {
                        SearchBias::Leftmost => leaf.key(i) < *key,
                        SearchBias::Rightmost => leaf.key(i) <= *key,
                    });
                    return Ok(Cursor {
                        page_num,
                        cell_num: cell_num as u32,
                        end_of_table: false,
                    });
                }
                NodeType::Internal => {
                    let node = InternalNode::new(page);
                    let num_keys = node.num_keys() as usize;
                    if num_keys == 0 {
                        return Err(MyjqlError::Corrupted(format!(
                            "descent reached internal node {page_num} with zero keys"
                        )));
                    }
                    let child_num = partition_point_by(num_keys, |i| match bias {
                        SearchBias::Leftmost => node.key(i) < *key,
                        SearchBias::Rightmost => node.key(i) <= *key,
                    });
                    page_num = node.child(child_num)?;
                }
            }
        }
    }

    /// Positions a cursor on the first cell of the leftmost leaf by
    /// walking the left spine.
    pub fn start(&mut self) -> Result<Cursor> {
        let mut page_num = self.root_page_num;
        loop {
            let page = self.pager.page(page_num)?;
            match node_type(page) {
                NodeType::Leaf => {
                    let leaf = LeafNode::new(page);
                    return Ok(Cursor {
                        page_num,
                        cell_num: 0,
                        end_of_table: leaf.num_cells() == 0,
                    });
                }
                NodeType::Internal => {
                    let node = InternalNode::new(page);
                    if node.num_keys() == 0 {
                        return Err(MyjqlError::Corrupted(format!(
                            "descent reached internal node {page_num} with zero keys"
                        )));
                    }
                    page_num = node.child(0)?;
                }
            }
        }
    }

    /// Advances the cursor one cell, following the leaf chain at leaf
    /// boundaries.
    pub fn advance(&mut self, cursor: &mut Cursor) -> Result<()> {
        let page = self.pager.page(cursor.page_num)?;
        let leaf = LeafNode::new(page);
        cursor.cell_num += 1;
        if cursor.cell_num >= leaf.num_cells() {
            let next = leaf.next_leaf();
            if next == 0 {
                cursor.end_of_table = true;
            } else {
                cursor.page_num = next;
                cursor.cell_num = 0;
            }
        }
        Ok(())
    }

    /// Steps a cursor sitting one past the last cell of its leaf into the
    /// head of the successor leaf, or marks it end-of-table.
    ///
    /// `find` can land there when a stale separator equal to the probe key
    /// routes the descent into a leaf whose matches were all deleted; the
    /// leftmost match then lives in the next leaf.
    pub(crate) fn normalize(&mut self, cursor: &mut Cursor) -> Result<()> {
        let page = self.pager.page(cursor.page_num)?;
        let leaf = LeafNode::new(page);
        if cursor.cell_num >= leaf.num_cells() {
            let next = leaf.next_leaf();
            if next == 0 {
                cursor.end_of_table = true;
            } else {
                cursor.page_num = next;
                cursor.cell_num = 0;
            }
        }
        Ok(())
    }

    /// Reads the row under the cursor.
    pub fn cursor_row(&mut self, cursor: &Cursor) -> Result<Row> {
        let page = self.pager.page(cursor.page_num)?;
        Ok(LeafNode::new(page).row(cursor.cell_num as usize))
    }

    /// Reads the key under the cursor.
    pub(crate) fn cursor_key(&mut self, cursor: &Cursor) -> Result<Key> {
        let page = self.pager.page(cursor.page_num)?;
        Ok(LeafNode::new(page).key(cursor.cell_num as usize))
    }
}
