//! Debug helpers: structural tree validation and page dumps.
//!
//! `validate_tree` walks the whole tree and checks every structural
//! invariant the engine maintains; the test suite runs it after mutation
//! sequences. `dump_tree` renders every page for inspection.

use crate::node::{
    is_node_root, node_parent, node_type, InternalNode, LeafNode, NodeType,
    INTERNAL_NODE_MAX_CELLS, INTERNAL_NODE_MIN_CELLS, LEAF_NODE_MAX_CELLS, LEAF_NODE_MIN_CELLS,
};
use crate::row::Key;
use crate::table::Table;
use myjql_common::{MyjqlError, Result};
use std::fmt::Write as _;

/// Summary of a validated tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeStats {
    /// Number of node levels; 1 for a lone root leaf.
    pub height: usize,
    /// Number of reachable leaf pages.
    pub leaf_pages: usize,
    /// Total rows stored.
    pub rows: u64,
}

fn corrupted(msg: String) -> MyjqlError {
    MyjqlError::Corrupted(msg)
}

/// Walks the tree and verifies its structural invariants:
/// node ordering, separator bounds, fill discipline, parent pointers,
/// uniform leaf depth, and the left-to-right leaf chain.
pub fn validate_tree(table: &mut Table) -> Result<TreeStats> {
    let root = table.root_page_num;
    {
        let page = table.pager.page(root)?;
        if !is_node_root(page) {
            return Err(corrupted(format!("page {root} is not marked as root")));
        }
    }

    let mut leaves = Vec::new();
    let mut rows = 0;
    let height = check_node(table, root, None, None, 1, &mut leaves, &mut rows)?;

    // The chain must visit exactly the in-order leaves and end at 0.
    for window in leaves.windows(2) {
        let page = table.pager.page(window[0])?;
        let next = LeafNode::new(page).next_leaf();
        if next != window[1] {
            return Err(corrupted(format!(
                "leaf {} links to {} but in-order successor is {}",
                window[0], next, window[1]
            )));
        }
    }
    if let Some(&last) = leaves.last() {
        let page = table.pager.page(last)?;
        let next = LeafNode::new(page).next_leaf();
        if next != 0 {
            return Err(corrupted(format!(
                "last leaf {last} links to {next} instead of terminating"
            )));
        }
    }

    Ok(TreeStats {
        height,
        leaf_pages: leaves.len(),
        rows,
    })
}

/// Recursively checks one node; returns the height of its subtree.
fn check_node(
    table: &mut Table,
    page_num: u32,
    lower: Option<Key>,
    upper: Option<Key>,
    depth: usize,
    leaves: &mut Vec<u32>,
    rows: &mut u64,
) -> Result<usize> {
    let root = page_num == table.root_page_num;
    let page = table.pager.page(page_num)?;

    match node_type(page) {
        NodeType::Leaf => {
            let leaf = LeafNode::new(page);
            let num_cells = leaf.num_cells() as usize;
            if num_cells > LEAF_NODE_MAX_CELLS {
                return Err(corrupted(format!(
                    "leaf {page_num} holds {num_cells} cells (max {LEAF_NODE_MAX_CELLS})"
                )));
            }
            if !root && num_cells < LEAF_NODE_MIN_CELLS {
                return Err(corrupted(format!(
                    "leaf {page_num} holds {num_cells} cells (min {LEAF_NODE_MIN_CELLS})"
                )));
            }
            for i in 0..num_cells {
                let key = leaf.key(i);
                if i > 0 && leaf.key(i - 1) > key {
                    return Err(corrupted(format!("leaf {page_num} keys out of order")));
                }
                if lower.is_some_and(|bound| key < bound) {
                    return Err(corrupted(format!(
                        "leaf {page_num} key below separator bound"
                    )));
                }
                if upper.is_some_and(|bound| key > bound) {
                    return Err(corrupted(format!(
                        "leaf {page_num} key above separator bound"
                    )));
                }
            }
            *rows += num_cells as u64;
            leaves.push(page_num);
            Ok(depth)
        }
        NodeType::Internal => {
            let node = InternalNode::new(page);
            let num_keys = node.num_keys() as usize;
            if num_keys > INTERNAL_NODE_MAX_CELLS {
                return Err(corrupted(format!(
                    "internal {page_num} holds {num_keys} keys (max {INTERNAL_NODE_MAX_CELLS})"
                )));
            }
            if !root && num_keys < INTERNAL_NODE_MIN_CELLS {
                return Err(corrupted(format!(
                    "internal {page_num} holds {num_keys} keys (min {INTERNAL_NODE_MIN_CELLS})"
                )));
            }
            if root && num_keys == 0 {
                return Err(corrupted(format!("internal root {page_num} has no keys")));
            }

            let mut children = Vec::with_capacity(num_keys + 1);
            for i in 0..num_keys {
                let key = node.key(i);
                if i > 0 && node.key(i - 1) > key {
                    return Err(corrupted(format!(
                        "internal {page_num} keys out of order"
                    )));
                }
                children.push((node.child(i)?, lower_bound(i, &node, lower), Some(key)));
            }
            children.push((
                node.right_child(),
                lower_bound(num_keys, &node, lower),
                upper,
            ));
            // The last cell's key also bounds everything under the node.
            if let (Some(bound), true) = (upper, num_keys > 0) {
                if node.key(num_keys - 1) > bound {
                    return Err(corrupted(format!(
                        "internal {page_num} separator above parent bound"
                    )));
                }
            }

            let mut subtree_height = None;
            for (child, child_lower, child_upper) in children {
                {
                    let child_page = table.pager.page(child)?;
                    if node_parent(child_page) != page_num {
                        return Err(corrupted(format!(
                            "page {child} records parent {} instead of {page_num}",
                            node_parent(child_page)
                        )));
                    }
                    if is_node_root(child_page) {
                        return Err(corrupted(format!(
                            "non-root page {child} is marked as root"
                        )));
                    }
                }
                let h = check_node(table, child, child_lower, child_upper, depth + 1, leaves, rows)?;
                match subtree_height {
                    None => subtree_height = Some(h),
                    Some(prev) if prev != h => {
                        return Err(corrupted(format!(
                            "children of internal {page_num} have uneven depth"
                        )));
                    }
                    Some(_) => {}
                }
            }
            subtree_height
                .ok_or_else(|| corrupted(format!("internal {page_num} has no children")))
        }
    }
}

fn lower_bound(child_num: usize, node: &InternalNode<'_>, inherited: Option<Key>) -> Option<Key> {
    if child_num == 0 {
        inherited
    } else {
        Some(node.key(child_num - 1))
    }
}

/// Renders every page of the database for inspection.
pub fn dump_tree(table: &mut Table) -> Result<String> {
    let mut out = String::new();
    for page_num in 0..table.pager.num_pages() {
        let page = table.pager.page(page_num)?;
        match node_type(page) {
            NodeType::Internal => {
                let root = is_node_root(page);
                let parent = node_parent(page);
                let node = InternalNode::new(page);
                let _ = writeln!(
                    out,
                    "page {page_num}: internal, root={}, parent={}, keys={}, right_child={}",
                    root,
                    parent,
                    node.num_keys(),
                    node.right_child()
                );
                for i in 0..node.num_keys() as usize {
                    let cell = node.cell(i);
                    let _ = writeln!(
                        out,
                        "  cell {i}: child={} key={}",
                        cell.child,
                        render_key(&cell.key)
                    );
                }
            }
            NodeType::Leaf => {
                let root = is_node_root(page);
                let parent = node_parent(page);
                let leaf = LeafNode::new(page);
                let _ = writeln!(
                    out,
                    "page {page_num}: leaf, root={}, parent={}, cells={}, next_leaf={}",
                    root,
                    parent,
                    leaf.num_cells(),
                    leaf.next_leaf()
                );
                for i in 0..leaf.num_cells() as usize {
                    let row = leaf.row(i);
                    let _ = writeln!(out, "  cell {i}: {row}");
                }
            }
        }
    }
    Ok(out)
}

fn render_key(key: &Key) -> String {
    let end = key.iter().position(|&c| c == 0).unwrap_or(key.len());
    String::from_utf8_lossy(&key[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::Row;
    use tempfile::tempdir;

    #[test]
    fn test_validate_empty_table() {
        let dir = tempdir().unwrap();
        let mut table = Table::open(dir.path().join("t.db")).unwrap();
        let stats = validate_tree(&mut table).unwrap();
        assert_eq!(
            stats,
            TreeStats {
                height: 1,
                leaf_pages: 1,
                rows: 0
            }
        );
    }

    #[test]
    fn test_validate_after_split() {
        let dir = tempdir().unwrap();
        let mut table = Table::open(dir.path().join("t.db")).unwrap();
        for i in 0..300u32 {
            table
                .insert(&Row::new(i, &format!("k{i:03}")).unwrap())
                .unwrap();
        }
        let stats = validate_tree(&mut table).unwrap();
        assert_eq!(stats.rows, 300);
        assert!(stats.height >= 2);
        assert!(stats.leaf_pages >= 2);
    }

    #[test]
    fn test_dump_mentions_every_page() {
        let dir = tempdir().unwrap();
        let mut table = Table::open(dir.path().join("t.db")).unwrap();
        table.insert(&Row::new(1, "apple").unwrap()).unwrap();

        let dump = dump_tree(&mut table).unwrap();
        assert!(dump.contains("page 0: leaf"));
        assert!(dump.contains("(1, apple)"));
    }
}
