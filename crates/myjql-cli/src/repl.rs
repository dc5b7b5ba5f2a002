//! The interactive shell: reads lines, dispatches meta commands and
//! statements, and prints results in the shell's line protocol.

use crate::commands::{self, CommandResult};
use crate::statement::{prepare, PrepareError, Statement};
use myjql_common::Result;
use myjql_storage::{Row, Table};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

const PROMPT: &str = "myjql> ";

/// Longest accepted input line, excluding the newline.
const INPUT_BUFFER_SIZE: usize = 31;

/// What to do after responding to one line.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Response {
    /// Keep reading; print the text if there is any.
    Continue(Option<String>),
    /// Shut down cleanly.
    Exit,
}

pub struct Repl {
    table: Table,
    editor: DefaultEditor,
}

impl Repl {
    pub fn new(table: Table) -> Result<Self> {
        let editor = DefaultEditor::new().map_err(std::io::Error::other)?;
        Ok(Self { table, editor })
    }

    /// Runs the shell until `.exit`, end of input, or interrupt. A fatal
    /// engine error surfaces as `Err`.
    pub fn run(&mut self) -> Result<()> {
        loop {
            match self.editor.readline(PROMPT) {
                Ok(line) => {
                    if line.len() > INPUT_BUFFER_SIZE {
                        println!("Input is too long.");
                        continue;
                    }
                    let _ = self.editor.add_history_entry(line.as_str());
                    match self.respond(&line)? {
                        Response::Exit => return Ok(()),
                        Response::Continue(Some(text)) => println!("{text}"),
                        Response::Continue(None) => {}
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return Ok(()),
                Err(err) => return Err(std::io::Error::other(err).into()),
            }
        }
    }

    /// Flushes the table and consumes the shell.
    pub fn close(self) -> Result<()> {
        self.table.close()
    }

    /// Produces the response for one input line.
    pub(crate) fn respond(&mut self, line: &str) -> Result<Response> {
        if line.starts_with('.') {
            return Ok(match commands::execute(line) {
                CommandResult::Exit => Response::Exit,
                CommandResult::Output(text) => Response::Continue(Some(text)),
                CommandResult::Unrecognized => {
                    Response::Continue(Some(format!("Unrecognized command '{line}'.")))
                }
            });
        }

        let statement = match prepare(line) {
            Ok(statement) => statement,
            Err(PrepareError::Empty) => return Ok(Response::Continue(None)),
            Err(PrepareError::Syntax) => {
                return Ok(Response::Continue(Some("Syntax error.".to_string())))
            }
            Err(PrepareError::NegativeValue) => {
                return Ok(Response::Continue(Some(
                    "Column `a` must be positive.".to_string(),
                )))
            }
            Err(PrepareError::StringTooLong) => {
                return Ok(Response::Continue(Some(
                    "String for column `b` is too long.".to_string(),
                )))
            }
            Err(PrepareError::Unrecognized) => {
                return Ok(Response::Continue(Some(format!(
                    "Unrecognized keyword at start of '{line}'."
                ))))
            }
        };

        let rows = match statement {
            Statement::Insert(row) => {
                self.table.insert(&row)?;
                None
            }
            Statement::Select(None) => Some(self.table.scan()?),
            Statement::Select(Some(key)) => Some(self.table.select(&key)?),
            Statement::Delete(key) => {
                self.table.delete(&key)?;
                None
            }
        };

        // Every successful statement ends with a blank line, `Executed.`,
        // and another blank line.
        let text = match rows {
            Some(rows) => format!("{}\n\nExecuted.\n", render_rows(&rows)),
            None => "\nExecuted.\n".to_string(),
        };
        Ok(Response::Continue(Some(text)))
    }
}

fn render_rows(rows: &[Row]) -> String {
    if rows.is_empty() {
        "(Empty)".to_string()
    } else {
        rows.iter()
            .map(|row| row.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_repl() -> (Repl, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let table = Table::open(dir.path().join("t.db")).unwrap();
        (Repl::new(table).unwrap(), dir)
    }

    fn text_of(response: Response) -> String {
        match response {
            Response::Continue(Some(text)) => text,
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn test_insert_and_select_protocol() {
        let (mut repl, _dir) = open_repl();

        let text = text_of(repl.respond("insert 1 apple").unwrap());
        assert_eq!(text, "\nExecuted.\n");

        let text = text_of(repl.respond("insert 2 banana").unwrap());
        assert_eq!(text, "\nExecuted.\n");

        let text = text_of(repl.respond("select").unwrap());
        assert_eq!(text, "(1, apple)\n(2, banana)\n\nExecuted.\n");
    }

    #[test]
    fn test_select_empty_table() {
        let (mut repl, _dir) = open_repl();
        let text = text_of(repl.respond("select").unwrap());
        assert_eq!(text, "(Empty)\n\nExecuted.\n");
    }

    #[test]
    fn test_select_key_without_match() {
        let (mut repl, _dir) = open_repl();
        repl.respond("insert 1 apple").unwrap();
        let text = text_of(repl.respond("select banana").unwrap());
        assert_eq!(text, "(Empty)\n\nExecuted.\n");
    }

    #[test]
    fn test_duplicate_select_in_insertion_order() {
        let (mut repl, _dir) = open_repl();
        repl.respond("insert 1 apple").unwrap();
        repl.respond("insert 2 apple").unwrap();
        let text = text_of(repl.respond("select apple").unwrap());
        assert_eq!(text, "(1, apple)\n(2, apple)\n\nExecuted.\n");
    }

    #[test]
    fn test_delete_statement() {
        let (mut repl, _dir) = open_repl();
        repl.respond("insert 1 apple").unwrap();
        let text = text_of(repl.respond("delete apple").unwrap());
        assert_eq!(text, "\nExecuted.\n");
        let text = text_of(repl.respond("select apple").unwrap());
        assert_eq!(text, "(Empty)\n\nExecuted.\n");
    }

    #[test]
    fn test_error_messages() {
        let (mut repl, _dir) = open_repl();
        assert_eq!(
            text_of(repl.respond("insert 1").unwrap()),
            "Syntax error."
        );
        assert_eq!(
            text_of(repl.respond("insert -1 a").unwrap()),
            "Column `a` must be positive."
        );
        assert_eq!(
            text_of(repl.respond("insert 1 twelve_chars").unwrap()),
            "String for column `b` is too long."
        );
        assert_eq!(
            text_of(repl.respond("frobnicate").unwrap()),
            "Unrecognized keyword at start of 'frobnicate'."
        );
    }

    #[test]
    fn test_meta_commands() {
        let (mut repl, _dir) = open_repl();
        assert_eq!(repl.respond(".exit").unwrap(), Response::Exit);
        let text = text_of(repl.respond(".help").unwrap());
        assert_eq!(text, "Unrecognized command '.help'.");
        let text = text_of(repl.respond(".constants").unwrap());
        assert!(text.starts_with("Constants:\n"));
        assert!(text.contains("LEAF_NODE_MAX_CELLS: 254"));
    }

    #[test]
    fn test_empty_line_is_silent() {
        let (mut repl, _dir) = open_repl();
        assert_eq!(repl.respond("").unwrap(), Response::Continue(None));
    }
}
