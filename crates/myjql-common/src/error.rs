//! Error types for myjql.

use thiserror::Error;

/// Result type alias using MyjqlError.
pub type Result<T> = std::result::Result<T, MyjqlError>;

/// Errors that can occur in myjql operations.
#[derive(Debug, Error)]
pub enum MyjqlError {
    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Pager errors
    #[error("Db file is not a whole number of pages. Corrupt file.")]
    CorruptFile,

    #[error("Tried to fetch page number out of bound: {page_num} (max {max})")]
    PageOutOfBounds { page_num: u32, max: u32 },

    #[error("Tried to flush unallocated page: {page_num}")]
    FlushNullPage { page_num: u32 },

    // B+ tree errors
    #[error("B+ tree corrupted: {0}")]
    Corrupted(String),

    // Row errors
    #[error("String for column `b` is too long: {len} bytes (max {max})")]
    KeyTooLong { len: usize, max: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_io_error_conversion() {
        let io_err = IoError::new(ErrorKind::NotFound, "file not found");
        let err: MyjqlError = io_err.into();
        assert!(matches!(err, MyjqlError::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_corrupt_file_display() {
        let err = MyjqlError::CorruptFile;
        assert_eq!(
            err.to_string(),
            "Db file is not a whole number of pages. Corrupt file."
        );
    }

    #[test]
    fn test_page_out_of_bounds_display() {
        let err = MyjqlError::PageOutOfBounds {
            page_num: 250,
            max: 100,
        };
        assert_eq!(
            err.to_string(),
            "Tried to fetch page number out of bound: 250 (max 100)"
        );
    }

    #[test]
    fn test_flush_null_page_display() {
        let err = MyjqlError::FlushNullPage { page_num: 7 };
        assert_eq!(err.to_string(), "Tried to flush unallocated page: 7");
    }

    #[test]
    fn test_corrupted_display() {
        let err = MyjqlError::Corrupted("internal node with zero keys".to_string());
        assert_eq!(
            err.to_string(),
            "B+ tree corrupted: internal node with zero keys"
        );
    }

    #[test]
    fn test_key_too_long_display() {
        let err = MyjqlError::KeyTooLong { len: 14, max: 11 };
        assert_eq!(
            err.to_string(),
            "String for column `b` is too long: 14 bytes (max 11)"
        );
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_ok() -> Result<i32> {
            Ok(42)
        }

        fn returns_err() -> Result<i32> {
            Err(MyjqlError::CorruptFile)
        }

        assert!(returns_ok().is_ok());
        assert!(returns_err().is_err());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MyjqlError>();
    }
}
