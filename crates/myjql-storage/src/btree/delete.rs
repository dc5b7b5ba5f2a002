//! Delete path: cell removal, sibling redistribution, merges, and root
//! collapse.
//!
//! Deleting a key removes matching cells one at a time, re-finding the
//! leftmost match after every removal since rebalancing invalidates
//! cursors. A node that drops below its minimum fill borrows a single
//! entry from a sibling when the sibling can spare one, and merges into
//! the left of the pair otherwise; a merge removes a separator from the
//! parent and the check cascades upward.

use crate::cursor::SearchBias;
use crate::node::{
    is_node_root, node_parent, node_type, set_node_parent, set_node_root, InternalCell,
    InternalNode, LeafNode, NodeType, INTERNAL_NODE_MIN_CELLS, LEAF_NODE_MIN_CELLS,
};
use crate::row::Key;
use crate::table::Table;
use myjql_common::Result;
use tracing::{debug, trace};

impl Table {
    pub(crate) fn delete_all(&mut self, key: &Key) -> Result<u64> {
        let mut deleted = 0;
        loop {
            let mut cursor = self.find(key, SearchBias::Leftmost)?;
            self.normalize(&mut cursor)?;
            if cursor.end_of_table || self.cursor_key(&cursor)? != *key {
                break;
            }
            self.leaf_delete(cursor.page_num, cursor.cell_num as usize)?;
            deleted += 1;
        }
        Ok(deleted)
    }

    fn leaf_delete(&mut self, page_num: u32, cell_num: usize) -> Result<()> {
        {
            let page = self.pager.page(page_num)?;
            LeafNode::new(page).remove_cell(cell_num);
        }
        self.rebalance(page_num)
    }

    /// Restores the fill invariant of a node after a removal, cascading
    /// into the parent when a merge consumes a separator.
    fn rebalance(&mut self, page_num: u32) -> Result<()> {
        let (root, kind, count, parent) = {
            let page = self.pager.page(page_num)?;
            let kind = node_type(page);
            let count = match kind {
                NodeType::Leaf => LeafNode::new(page).num_cells() as usize,
                NodeType::Internal => InternalNode::new(page).num_keys() as usize,
            };
            (is_node_root(page), kind, count, node_parent(page))
        };

        if root {
            return self.adjust_root();
        }

        let min = match kind {
            NodeType::Leaf => LEAF_NODE_MIN_CELLS,
            NodeType::Internal => INTERNAL_NODE_MIN_CELLS,
        };
        if count >= min {
            return Ok(());
        }

        let child_idx = self.child_index(parent, page_num)?;
        let parent_keys = {
            let page = self.pager.page(parent)?;
            InternalNode::new(page).num_keys() as usize
        };
        let rightmost = child_idx == parent_keys;

        match kind {
            NodeType::Leaf => self.rebalance_leaf(page_num, parent, child_idx, rightmost),
            NodeType::Internal => self.rebalance_internal(page_num, parent, child_idx, rightmost),
        }
    }

    fn rebalance_leaf(
        &mut self,
        page_num: u32,
        parent: u32,
        child_idx: usize,
        rightmost: bool,
    ) -> Result<()> {
        if rightmost {
            // Borrow from or merge with the left neighbor.
            let sep_idx = child_idx - 1;
            let sibling = {
                let page = self.pager.page(parent)?;
                InternalNode::new(page).child(sep_idx)?
            };
            let sibling_cells = {
                let page = self.pager.page(sibling)?;
                LeafNode::new(page).num_cells() as usize
            };

            if sibling_cells > LEAF_NODE_MIN_CELLS {
                let (cell, new_sep) = {
                    let page = self.pager.page(sibling)?;
                    let mut leaf = LeafNode::new(page);
                    let last = leaf.num_cells() as usize - 1;
                    let cell = leaf.cell(last);
                    leaf.remove_cell(last);
                    (cell, leaf.key(last - 1))
                };
                {
                    let page = self.pager.page(page_num)?;
                    LeafNode::new(page).insert_cell(0, &cell);
                }
                {
                    let page = self.pager.page(parent)?;
                    InternalNode::new(page).set_key(sep_idx, &new_sep);
                }
                trace!(node = page_num, sibling, "borrowed leaf cell from left sibling");
                Ok(())
            } else {
                self.merge_leaves(sibling, page_num, parent, sep_idx)
            }
        } else {
            // The sibling is the next leaf to the right.
            let sep_idx = child_idx;
            let sibling = {
                let page = self.pager.page(page_num)?;
                LeafNode::new(page).next_leaf()
            };
            let sibling_cells = {
                let page = self.pager.page(sibling)?;
                LeafNode::new(page).num_cells() as usize
            };

            if sibling_cells > LEAF_NODE_MIN_CELLS {
                let (cell, new_sep) = {
                    let page = self.pager.page(sibling)?;
                    let mut leaf = LeafNode::new(page);
                    let cell = leaf.cell(0);
                    leaf.remove_cell(0);
                    (cell, leaf.key(0))
                };
                {
                    let page = self.pager.page(page_num)?;
                    let mut leaf = LeafNode::new(page);
                    let end = leaf.num_cells() as usize;
                    leaf.insert_cell(end, &cell);
                }
                {
                    let page = self.pager.page(parent)?;
                    InternalNode::new(page).set_key(sep_idx, &new_sep);
                }
                trace!(node = page_num, sibling, "borrowed leaf cell from right sibling");
                Ok(())
            } else {
                self.merge_leaves(page_num, sibling, parent, sep_idx)
            }
        }
    }

    /// Moves every cell of `right` into `left`, unlinks `right` from the
    /// leaf chain, and drops the separator between them from the parent.
    /// The emptied page is never reclaimed.
    fn merge_leaves(&mut self, left: u32, right: u32, parent: u32, sep_idx: usize) -> Result<()> {
        let (right_cells, right_next) = {
            let page = self.pager.page(right)?;
            let leaf = LeafNode::new(page);
            (leaf.cells(), leaf.next_leaf())
        };
        {
            let page = self.pager.page(right)?;
            LeafNode::new(page).set_next_leaf(0);
        }
        {
            let page = self.pager.page(left)?;
            let mut leaf = LeafNode::new(page);
            let mut cells = leaf.cells();
            cells.extend_from_slice(&right_cells);
            leaf.write_cells(&cells);
            leaf.set_next_leaf(right_next);
        }

        trace!(survivor = left, removed = right, "merged leaf into left sibling");
        self.remove_parent_entry(parent, sep_idx)?;
        self.rebalance(parent)
    }

    fn rebalance_internal(
        &mut self,
        page_num: u32,
        parent: u32,
        child_idx: usize,
        rightmost: bool,
    ) -> Result<()> {
        if rightmost {
            let sep_idx = child_idx - 1;
            let sibling = {
                let page = self.pager.page(parent)?;
                InternalNode::new(page).child(sep_idx)?
            };
            let sibling_keys = {
                let page = self.pager.page(sibling)?;
                InternalNode::new(page).num_keys() as usize
            };

            if sibling_keys > INTERNAL_NODE_MIN_CELLS {
                // The separator comes down in front of this node's
                // children; the sibling's rightmost child comes with it.
                let sep_key = {
                    let page = self.pager.page(parent)?;
                    InternalNode::new(page).key(sep_idx)
                };
                let (moved_child, dropped) = {
                    let page = self.pager.page(sibling)?;
                    let mut node = InternalNode::new(page);
                    let last = node.num_keys() as usize - 1;
                    let dropped = node.cell(last);
                    let old_right = node.right_child();
                    node.set_num_keys(last as u32);
                    node.set_right_child(dropped.child);
                    (old_right, dropped)
                };
                {
                    let page = self.pager.page(page_num)?;
                    InternalNode::new(page).insert_cell(
                        0,
                        &InternalCell {
                            child: moved_child,
                            key: sep_key,
                        },
                    );
                }
                self.reparent(&[moved_child], page_num)?;
                {
                    let page = self.pager.page(parent)?;
                    InternalNode::new(page).set_key(sep_idx, &dropped.key);
                }
                trace!(
                    node = page_num,
                    sibling,
                    "borrowed internal entry from left sibling"
                );
                Ok(())
            } else {
                self.merge_internals(sibling, page_num, parent, sep_idx)
            }
        } else {
            let sep_idx = child_idx;
            let sibling = {
                let page = self.pager.page(parent)?;
                InternalNode::new(page).child(child_idx + 1)?
            };
            let sibling_keys = {
                let page = self.pager.page(sibling)?;
                InternalNode::new(page).num_keys() as usize
            };

            if sibling_keys > INTERNAL_NODE_MIN_CELLS {
                // The separator comes down behind this node's children;
                // the sibling's leftmost child comes with it.
                let sep_key = {
                    let page = self.pager.page(parent)?;
                    InternalNode::new(page).key(sep_idx)
                };
                let first = {
                    let page = self.pager.page(sibling)?;
                    let mut node = InternalNode::new(page);
                    let mut entries = node.entries();
                    let first = entries.remove(0);
                    node.write_entries(&entries);
                    first
                };
                {
                    let page = self.pager.page(page_num)?;
                    let mut node = InternalNode::new(page);
                    let end = node.num_keys() as usize;
                    let old_right = node.right_child();
                    node.set_cell(
                        end,
                        &InternalCell {
                            child: old_right,
                            key: sep_key,
                        },
                    );
                    node.set_num_keys(end as u32 + 1);
                    node.set_right_child(first.child);
                }
                self.reparent(&[first.child], page_num)?;
                {
                    let page = self.pager.page(parent)?;
                    InternalNode::new(page).set_key(sep_idx, &first.key);
                }
                trace!(
                    node = page_num,
                    sibling,
                    "borrowed internal entry from right sibling"
                );
                Ok(())
            } else {
                self.merge_internals(page_num, sibling, parent, sep_idx)
            }
        }
    }

    /// Pulls the separator down into `left`, appends every entry of
    /// `right`, and drops the separator from the parent. The emptied page
    /// is never reclaimed.
    fn merge_internals(
        &mut self,
        left: u32,
        right: u32,
        parent: u32,
        sep_idx: usize,
    ) -> Result<()> {
        let sep_key = {
            let page = self.pager.page(parent)?;
            InternalNode::new(page).key(sep_idx)
        };
        let (right_entries, right_rightmost) = {
            let page = self.pager.page(right)?;
            let node = InternalNode::new(page);
            (node.entries(), node.right_child())
        };
        let moved_children: Vec<u32> = right_entries
            .iter()
            .map(|cell| cell.child)
            .chain(std::iter::once(right_rightmost))
            .collect();

        {
            let page = self.pager.page(left)?;
            let mut node = InternalNode::new(page);
            let mut entries = node.entries();
            entries.push(InternalCell {
                child: node.right_child(),
                key: sep_key,
            });
            entries.extend_from_slice(&right_entries);
            node.write_entries(&entries);
            node.set_right_child(right_rightmost);
        }
        self.reparent(&moved_children, left)?;

        trace!(
            survivor = left,
            removed = right,
            "merged internal node into left sibling"
        );
        self.remove_parent_entry(parent, sep_idx)?;
        self.rebalance(parent)
    }

    /// Removes separator `sep_idx` and the child pointer to its right
    /// from an internal node.
    fn remove_parent_entry(&mut self, parent: u32, sep_idx: usize) -> Result<()> {
        let page = self.pager.page(parent)?;
        let mut node = InternalNode::new(page);
        let num_keys = node.num_keys() as usize;
        let left_child = node.cell(sep_idx).child;

        if sep_idx + 1 < num_keys {
            // Shift the cells after the pair left by one, keeping the left
            // child pointer in place.
            let mut entries = node.entries();
            entries.remove(sep_idx);
            entries[sep_idx].child = left_child;
            node.write_entries(&entries);
        } else {
            // The removed child was the rightmost.
            node.set_num_keys(num_keys as u32 - 1);
            node.set_right_child(left_child);
        }
        Ok(())
    }

    /// Handles an underflowing root: an empty root leaf stays as the
    /// empty tree; an internal root with no separators left is replaced
    /// by its sole surviving child, shrinking the tree height by one.
    fn adjust_root(&mut self) -> Result<()> {
        let root_page = self.root_page_num;
        let num_keys = {
            let page = self.pager.page(root_page)?;
            if node_type(page) == NodeType::Leaf {
                return Ok(());
            }
            InternalNode::new(page).num_keys()
        };
        if num_keys > 0 {
            return Ok(());
        }

        let survivor = {
            let page = self.pager.page(root_page)?;
            InternalNode::new(page).right_child()
        };
        let data = *self.pager.page(survivor)?;
        {
            let page = self.pager.page(root_page)?;
            *page = data;
            set_node_root(page, true);
            set_node_parent(page, 0);
        }

        if node_type(&data) == NodeType::Internal {
            let children = {
                let page = self.pager.page(root_page)?;
                let node = InternalNode::new(page);
                let mut children: Vec<u32> =
                    node.entries().iter().map(|cell| cell.child).collect();
                children.push(node.right_child());
                children
            };
            self.reparent(&children, root_page)?;
        }

        debug!(from = survivor, "collapsed root into page 0");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{LEAF_NODE_LEFT_SPLIT_COUNT, LEAF_NODE_MAX_CELLS};
    use crate::row::{key_from_str, Row};
    use tempfile::tempdir;

    fn open_table() -> (Table, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let table = Table::open(dir.path().join("t.db")).unwrap();
        (table, dir)
    }

    /// Inserts distinct keys k000..k(n-1), splitting once past capacity.
    fn fill_distinct(table: &mut Table, n: usize) {
        for i in 0..n {
            let row = Row::new(i as u32, &format!("k{i:03}")).unwrap();
            table.insert(&row).unwrap();
        }
    }

    #[test]
    fn test_delete_from_single_leaf() {
        let (mut table, _dir) = open_table();
        fill_distinct(&mut table, 3);

        let deleted = table.delete(&key_from_str("k001")).unwrap();
        assert_eq!(deleted, 1);

        let rows = table.scan().unwrap();
        let keys: Vec<String> = rows.iter().map(|r| r.b().to_string()).collect();
        assert_eq!(keys, vec!["k000", "k002"]);
    }

    #[test]
    fn test_delete_missing_key_is_noop() {
        let (mut table, _dir) = open_table();
        fill_distinct(&mut table, 3);

        assert_eq!(table.delete(&key_from_str("nope")).unwrap(), 0);
        assert_eq!(table.scan().unwrap().len(), 3);
    }

    #[test]
    fn test_delete_all_duplicates() {
        let (mut table, _dir) = open_table();
        for a in 0..5 {
            table.insert(&Row::new(a, "dup").unwrap()).unwrap();
        }
        table.insert(&Row::new(99, "other").unwrap()).unwrap();

        assert_eq!(table.delete(&key_from_str("dup")).unwrap(), 5);
        assert!(table.select(&key_from_str("dup")).unwrap().is_empty());
        assert_eq!(table.scan().unwrap().len(), 1);
    }

    #[test]
    fn test_delete_empties_root_leaf_in_place() {
        let (mut table, _dir) = open_table();
        table.insert(&Row::new(1, "only").unwrap()).unwrap();

        assert_eq!(table.delete(&key_from_str("only")).unwrap(), 1);
        assert_eq!(table.pager.num_pages(), 1);

        let page = table.pager.page(0).unwrap();
        assert_eq!(node_type(page), NodeType::Leaf);
        assert!(is_node_root(page));
        assert_eq!(LeafNode::new(page).num_cells(), 0);
        assert!(table.scan().unwrap().is_empty());
    }

    #[test]
    fn test_merge_collapses_root() {
        let (mut table, _dir) = open_table();
        // One split: left leaf holds LEFT_SPLIT_COUNT cells, right the rest.
        fill_distinct(&mut table, LEAF_NODE_MAX_CELLS + 1);
        assert_eq!(table.pager.num_pages(), 3);

        // Two deletions from the left leaf drop it below minimum fill;
        // its right sibling sits exactly at minimum, so they merge and
        // the root collapses back to a leaf.
        table.delete(&key_from_str("k000")).unwrap();
        table.delete(&key_from_str("k001")).unwrap();

        let page = table.pager.page(0).unwrap();
        assert_eq!(node_type(page), NodeType::Leaf);
        assert!(is_node_root(page));
        assert_eq!(table.scan().unwrap().len(), LEAF_NODE_MAX_CELLS - 1);
    }

    #[test]
    fn test_redistribute_from_right_sibling() {
        let (mut table, _dir) = open_table();
        fill_distinct(&mut table, LEAF_NODE_MAX_CELLS + 1);
        // Pad the right leaf above minimum so underflow borrows instead
        // of merging ("m" sorts after every "k" key).
        for a in 0..3 {
            table
                .insert(&Row::new(a, &format!("m{a:03}")).unwrap())
                .unwrap();
        }

        table.delete(&key_from_str("k000")).unwrap();
        table.delete(&key_from_str("k001")).unwrap();

        // Still two leaves under the root.
        let page = table.pager.page(0).unwrap();
        assert_eq!(node_type(page), NodeType::Internal);

        // Every remaining row is intact and ordered.
        let rows = table.scan().unwrap();
        assert_eq!(rows.len(), LEAF_NODE_MAX_CELLS + 2);
        let keys: Vec<_> = rows.iter().map(|r| r.key()).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);

        // The left leaf was refilled to exactly the minimum.
        let page = table.pager.page(0).unwrap();
        let left_num = InternalNode::new(page).child(0).unwrap();
        let page = table.pager.page(left_num).unwrap();
        assert_eq!(
            LeafNode::new(page).num_cells() as usize,
            crate::node::LEAF_NODE_MIN_CELLS
        );
    }

    #[test]
    fn test_delete_everything_leaves_empty_root_leaf() {
        let (mut table, _dir) = open_table();
        fill_distinct(&mut table, LEAF_NODE_MAX_CELLS + 1);

        for i in 0..LEAF_NODE_MAX_CELLS + 1 {
            let deleted = table.delete(&key_from_str(&format!("k{i:03}"))).unwrap();
            assert_eq!(deleted, 1, "k{i:03}");
        }

        let page = table.pager.page(0).unwrap();
        assert_eq!(node_type(page), NodeType::Leaf);
        assert!(is_node_root(page));
        assert_eq!(LeafNode::new(page).num_cells(), 0);
    }

    #[test]
    fn test_left_split_count_constant_used_by_merge_test() {
        // The merge test above assumes the right sibling lands exactly at
        // minimum fill after one split.
        assert_eq!(
            LEAF_NODE_MAX_CELLS + 1 - LEAF_NODE_LEFT_SPLIT_COUNT,
            crate::node::LEAF_NODE_MIN_CELLS
        );
    }
}
