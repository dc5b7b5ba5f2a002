//! Page constants for myjql storage.

/// Page size in bytes (4 KB).
///
/// Every node of the B+ tree occupies exactly one page; the database file
/// is a concatenation of pages and its length is always a multiple of this.
pub const PAGE_SIZE: usize = 4096;

/// Maximum number of page slots the pager will hold in memory.
///
/// The cache has one slot per page number and never evicts; a working set
/// beyond this bound is a fatal error.
pub const MAX_PAGES: usize = 100;

/// A raw in-memory page buffer.
pub type PageBuf = [u8; PAGE_SIZE];
