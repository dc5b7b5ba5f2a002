//! Meta commands: lines starting with `.`.

use myjql_storage::node::{
    COMMON_NODE_HEADER_SIZE, LEAF_NODE_CELL_SIZE, LEAF_NODE_HEADER_SIZE, LEAF_NODE_MAX_CELLS,
    LEAF_NODE_SPACE_FOR_CELLS,
};
use myjql_storage::ROW_SIZE;

/// Outcome of a meta command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// `.exit`: shut down cleanly.
    Exit,
    /// Text to print, e.g. the constants listing.
    Output(String),
    /// Not a known command; the shell reports it.
    Unrecognized,
}

/// Executes a meta command line.
pub fn execute(line: &str) -> CommandResult {
    match line {
        ".exit" => CommandResult::Exit,
        ".constants" => CommandResult::Output(render_constants()),
        _ => CommandResult::Unrecognized,
    }
}

/// Renders the node layout constants.
fn render_constants() -> String {
    format!(
        "Constants:\n\
         ROW_SIZE: {ROW_SIZE}\n\
         COMMON_NODE_HEADER_SIZE: {COMMON_NODE_HEADER_SIZE}\n\
         LEAF_NODE_HEADER_SIZE: {LEAF_NODE_HEADER_SIZE}\n\
         LEAF_NODE_CELL_SIZE: {LEAF_NODE_CELL_SIZE}\n\
         LEAF_NODE_SPACE_FOR_CELLS: {LEAF_NODE_SPACE_FOR_CELLS}\n\
         LEAF_NODE_MAX_CELLS: {LEAF_NODE_MAX_CELLS}"
    )
}
