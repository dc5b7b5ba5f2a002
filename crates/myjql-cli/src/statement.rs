//! Statement parsing: `insert`, `select`, and `delete`.
//!
//! Keywords are matched by prefix on the raw line and arguments split on
//! whitespace, matching the shell's historic lexing. `insert` ignores
//! trailing tokens; `select` and `delete` reject them.

use myjql_storage::{key_from_str, Key, Row, COLUMN_B_SIZE};

/// A parsed statement ready for execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Insert(Row),
    /// `select` with no key scans the whole table.
    Select(Option<Key>),
    Delete(Key),
}

/// Why a line failed to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrepareError {
    /// Blank line; skipped without a message.
    Empty,
    Syntax,
    NegativeValue,
    StringTooLong,
    Unrecognized,
}

/// Parses one input line into a statement.
pub fn prepare(input: &str) -> Result<Statement, PrepareError> {
    if input.is_empty() {
        return Err(PrepareError::Empty);
    }
    if input.starts_with("insert") {
        prepare_insert(input)
    } else if input.starts_with("select") {
        prepare_select(input)
    } else if input.starts_with("delete") {
        prepare_delete(input)
    } else {
        Err(PrepareError::Unrecognized)
    }
}

fn prepare_insert(input: &str) -> Result<Statement, PrepareError> {
    let mut tokens = input.split_whitespace();
    let _keyword = tokens.next();
    let a = tokens.next().ok_or(PrepareError::Syntax)?;
    let b = tokens.next().ok_or(PrepareError::Syntax)?;

    let a: i64 = a.parse().map_err(|_| PrepareError::Syntax)?;
    if a < 0 {
        return Err(PrepareError::NegativeValue);
    }
    let a = u32::try_from(a).map_err(|_| PrepareError::Syntax)?;
    if b.len() > COLUMN_B_SIZE {
        return Err(PrepareError::StringTooLong);
    }

    match Row::new(a, b) {
        Ok(row) => Ok(Statement::Insert(row)),
        Err(_) => Err(PrepareError::StringTooLong),
    }
}

/// Parses the optional key argument shared by `select` and `delete`.
fn prepare_condition(input: &str) -> Result<Option<Key>, PrepareError> {
    let mut tokens = input.split_whitespace();
    let _keyword = tokens.next();
    let b = match tokens.next() {
        Some(b) => b,
        None => return Ok(None),
    };
    if tokens.next().is_some() {
        return Err(PrepareError::Syntax);
    }
    if b.len() > COLUMN_B_SIZE {
        return Err(PrepareError::StringTooLong);
    }
    Ok(Some(key_from_str(b)))
}

fn prepare_select(input: &str) -> Result<Statement, PrepareError> {
    Ok(Statement::Select(prepare_condition(input)?))
}

fn prepare_delete(input: &str) -> Result<Statement, PrepareError> {
    match prepare_condition(input)? {
        Some(key) => Ok(Statement::Delete(key)),
        None => Err(PrepareError::Syntax),
    }
}
