//! Insert path: leaf insert, leaf split, root creation, and the cascading
//! internal insert/split above it.

use crate::cursor::{Cursor, SearchBias};
use crate::node::{
    is_node_root, max_key, node_parent, set_node_parent, set_node_root, InternalCell,
    InternalNode, LeafNode, INTERNAL_NODE_MAX_CELLS, LEAF_NODE_LEFT_SPLIT_COUNT,
    LEAF_NODE_MAX_CELLS,
};
use crate::row::{Key, Row, KEY_SIZE};
use crate::table::Table;
use myjql_common::{MyjqlError, Result};
use tracing::trace;

impl Table {
    pub(crate) fn insert_row(&mut self, row: &Row) -> Result<()> {
        let key = row.key();
        let cursor = self.find(&key, SearchBias::Rightmost)?;

        let at_capacity = {
            let page = self.pager.page(cursor.page_num)?;
            LeafNode::new(page).num_cells() as usize >= LEAF_NODE_MAX_CELLS
        };

        if at_capacity {
            self.leaf_split_and_insert(&cursor, row)
        } else {
            let page = self.pager.page(cursor.page_num)?;
            LeafNode::new(page).insert_cell(cursor.cell_num as usize, &row.to_bytes());
            Ok(())
        }
    }

    /// Splits a full leaf around the incoming cell: the old page keeps the
    /// left half, a fresh page takes the right half, and the left max key
    /// is lifted into the parent.
    fn leaf_split_and_insert(&mut self, cursor: &Cursor, row: &Row) -> Result<()> {
        let new_page_num = self.pager.unused_page_num();

        let (mut cells, old_next, old_parent, old_is_root) = {
            let page = self.pager.page(cursor.page_num)?;
            let leaf = LeafNode::new(page);
            (
                leaf.cells(),
                leaf.next_leaf(),
                node_parent(page),
                is_node_root(page),
            )
        };

        cells.insert(cursor.cell_num as usize, row.to_bytes());
        let right_cells = cells.split_off(LEAF_NODE_LEFT_SPLIT_COUNT);
        let mut left_max: Key = [0u8; KEY_SIZE];
        match cells.last() {
            Some(cell) => left_max.copy_from_slice(&cell[..KEY_SIZE]),
            None => {
                return Err(MyjqlError::Corrupted(
                    "leaf split produced an empty left half".to_string(),
                ))
            }
        }

        {
            let page = self.pager.page(cursor.page_num)?;
            let mut leaf = LeafNode::new(page);
            leaf.write_cells(&cells);
            leaf.set_next_leaf(new_page_num);
        }
        {
            let page = self.pager.page(new_page_num)?;
            let mut leaf = LeafNode::new(page);
            leaf.init();
            leaf.write_cells(&right_cells);
            leaf.set_next_leaf(old_next);
            set_node_parent(page, old_parent);
        }

        trace!(
            left = cursor.page_num,
            right = new_page_num,
            "split leaf"
        );

        if old_is_root {
            self.create_new_root(new_page_num)
        } else {
            self.internal_insert(old_parent, cursor.page_num, new_page_num, left_max)
        }
    }

    /// Handles splitting a leaf root: the old root's cells move to a fresh
    /// left page and page 0 is reinitialized as an internal root over the
    /// two halves.
    fn create_new_root(&mut self, right_page_num: u32) -> Result<()> {
        let left_page_num = self.pager.unused_page_num();

        let root_data = *self.pager.page(self.root_page_num)?;
        {
            let page = self.pager.page(left_page_num)?;
            *page = root_data;
            set_node_root(page, false);
        }
        let left_max = max_key(&root_data);

        {
            let page = self.pager.page(self.root_page_num)?;
            let mut root = InternalNode::new(page);
            root.init();
            root.set_root(true);
            root.set_num_keys(1);
            root.set_cell(
                0,
                &InternalCell {
                    child: left_page_num,
                    key: left_max,
                },
            );
            root.set_right_child(right_page_num);
        }

        self.reparent(&[left_page_num, right_page_num], self.root_page_num)?;

        trace!(
            left = left_page_num,
            right = right_page_num,
            "created new root"
        );
        Ok(())
    }

    /// Installs `(new_child, key)` into an internal node directly to the
    /// right of the child that just split, then splits the node itself if
    /// it overflowed. Positioning by the split child rather than by key
    /// keeps sibling order correct when separator keys repeat.
    fn internal_insert(
        &mut self,
        node_num: u32,
        old_child: u32,
        new_child: u32,
        key: Key,
    ) -> Result<()> {
        {
            let page = self.pager.page(new_child)?;
            set_node_parent(page, node_num);
        }

        let index = self.child_index(node_num, old_child)?;
        let num_keys = {
            let page = self.pager.page(node_num)?;
            let mut node = InternalNode::new(page);
            let num_keys = node.num_keys() as usize;
            if num_keys == 0 {
                return Err(MyjqlError::Corrupted(format!(
                    "insert into internal node {node_num} with zero keys"
                )));
            }

            if index == num_keys {
                // The rightmost child split: it becomes the last cell and
                // the new child takes the rightmost slot.
                node.set_cell(
                    num_keys,
                    &InternalCell {
                        child: old_child,
                        key,
                    },
                );
                node.set_num_keys(num_keys as u32 + 1);
                node.set_right_child(new_child);
            } else {
                // The old separator shifts right by one and now bounds the
                // new child; the lifted key bounds the shrunken old child.
                node.insert_cell(
                    index,
                    &InternalCell {
                        child: old_child,
                        key,
                    },
                );
                node.set_child(index + 1, new_child)?;
            }
            num_keys + 1
        };

        if num_keys > INTERNAL_NODE_MAX_CELLS {
            self.internal_split(node_num)
        } else {
            Ok(())
        }
    }

    /// Splits an overfull internal node around its middle key, lifting
    /// that key into the parent (or a rebuilt root).
    fn internal_split(&mut self, node_num: u32) -> Result<()> {
        let (entries, old_right_child, parent, root) = {
            let page = self.pager.page(node_num)?;
            let node = InternalNode::new(page);
            (
                node.entries(),
                node.right_child(),
                node_parent(page),
                is_node_root(page),
            )
        };

        let mid = entries.len() / 2;
        let lifted = entries[mid].key;
        let mid_child = entries[mid].child;
        let left_entries = &entries[..mid];
        let right_entries = &entries[mid + 1..];

        let left_children: Vec<u32> = left_entries
            .iter()
            .map(|cell| cell.child)
            .chain(std::iter::once(mid_child))
            .collect();
        let right_children: Vec<u32> = right_entries
            .iter()
            .map(|cell| cell.child)
            .chain(std::iter::once(old_right_child))
            .collect();

        if root {
            // Root split: both halves move to fresh pages and page 0 is
            // rebuilt as a one-key internal root above them.
            let left_num = self.pager.unused_page_num();
            {
                let page = self.pager.page(left_num)?;
                let mut left = InternalNode::new(page);
                left.init();
                left.write_entries(left_entries);
                left.set_right_child(mid_child);
            }
            let right_num = self.pager.unused_page_num();
            {
                let page = self.pager.page(right_num)?;
                let mut right = InternalNode::new(page);
                right.init();
                right.write_entries(right_entries);
                right.set_right_child(old_right_child);
            }
            {
                let page = self.pager.page(node_num)?;
                let mut node = InternalNode::new(page);
                node.init();
                node.set_root(true);
                node.set_num_keys(1);
                node.set_cell(
                    0,
                    &InternalCell {
                        child: left_num,
                        key: lifted,
                    },
                );
                node.set_right_child(right_num);
            }

            self.reparent(&[left_num, right_num], node_num)?;
            self.reparent(&left_children, left_num)?;
            self.reparent(&right_children, right_num)?;

            trace!(
                left = left_num,
                right = right_num,
                "split internal root"
            );
            Ok(())
        } else {
            let right_num = self.pager.unused_page_num();
            {
                let page = self.pager.page(right_num)?;
                let mut right = InternalNode::new(page);
                right.init();
                right.write_entries(right_entries);
                right.set_right_child(old_right_child);
                set_node_parent(page, parent);
            }
            {
                let page = self.pager.page(node_num)?;
                let mut node = InternalNode::new(page);
                node.write_entries(left_entries);
                node.set_right_child(mid_child);
            }

            self.reparent(&right_children, right_num)?;

            trace!(
                left = node_num,
                right = right_num,
                "split internal node"
            );
            self.internal_insert(parent, node_num, right_num, lifted)
        }
    }
}
