//! B+ tree algorithms over the pager.
//!
//! The tree itself is stateless: every operation walks pages through the
//! [`crate::pager::Pager`] owned by the [`crate::table::Table`]. Page 0 is
//! always the root. Splits and merges allocate pages by appending; a
//! merged-away page is never reclaimed.
//!
//! Cross-page mutations read the cells of a node into a vector, compute
//! the new distribution, and write each page back in turn, so no two page
//! buffers are ever borrowed at once.

mod delete;
mod insert;

use crate::node::{set_node_parent, InternalNode};
use crate::table::Table;
use myjql_common::{MyjqlError, Result};

impl Table {
    /// Points the parent field of each listed page at `parent`.
    pub(crate) fn reparent(&mut self, children: &[u32], parent: u32) -> Result<()> {
        for &child in children {
            let page = self.pager.page(child)?;
            set_node_parent(page, parent);
        }
        Ok(())
    }

    /// Returns the child position of `child_num` under `parent_num`,
    /// where `num_keys` denotes the rightmost child.
    pub(crate) fn child_index(&mut self, parent_num: u32, child_num: u32) -> Result<usize> {
        let page = self.pager.page(parent_num)?;
        let node = InternalNode::new(page);
        let num_keys = node.num_keys() as usize;
        for i in 0..num_keys {
            if node.cell(i).child == child_num {
                return Ok(i);
            }
        }
        if node.right_child() == child_num {
            return Ok(num_keys);
        }
        Err(MyjqlError::Corrupted(format!(
            "page {child_num} is not a child of its recorded parent {parent_num}"
        )))
    }
}
