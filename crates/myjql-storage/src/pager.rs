//! Pager: page-level file I/O behind a flat in-memory cache.
//!
//! One slot per page number, no eviction. Pages load lazily on first
//! access and are written back only when the pager closes; the on-disk
//! image therefore always reflects the last clean shutdown.

use myjql_common::{MyjqlError, PageBuf, Result, StorageConfig, PAGE_SIZE};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::{debug, trace};

/// Owns the database file and the page cache.
pub struct Pager {
    file: File,
    file_length: u64,
    /// Highest touched page number plus one; new pages append here.
    num_pages: u32,
    slots: Vec<Option<Box<PageBuf>>>,
}

impl Pager {
    /// Opens the database file, creating it if missing.
    ///
    /// The file length must be a whole number of pages.
    pub fn open(path: impl AsRef<Path>, config: &StorageConfig) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;

        let file_length = file.metadata()?.len();
        if file_length % PAGE_SIZE as u64 != 0 {
            return Err(MyjqlError::CorruptFile);
        }

        let num_pages = (file_length / PAGE_SIZE as u64) as u32;
        let mut slots = Vec::with_capacity(config.max_pages);
        slots.resize_with(config.max_pages, || None);

        debug!(num_pages, "opened database file");

        Ok(Self {
            file,
            file_length,
            num_pages,
            slots,
        })
    }

    /// Number of pages the pager currently addresses.
    pub fn num_pages(&self) -> u32 {
        self.num_pages
    }

    /// Returns the next unused page number. Fetching that page reserves it.
    pub fn unused_page_num(&self) -> u32 {
        self.num_pages
    }

    /// Returns the in-memory buffer for a page, loading it from disk on a
    /// cache miss. Touching a page at or past `num_pages` extends the
    /// addressed range.
    pub fn page(&mut self, page_num: u32) -> Result<&mut PageBuf> {
        let slot = page_num as usize;
        if slot >= self.slots.len() {
            return Err(MyjqlError::PageOutOfBounds {
                page_num,
                max: self.slots.len() as u32,
            });
        }

        if self.slots[slot].is_none() {
            let mut buf: Box<PageBuf> = Box::new([0u8; PAGE_SIZE]);
            let file_pages = (self.file_length / PAGE_SIZE as u64) as u32;
            if page_num <= file_pages {
                self.file
                    .seek(SeekFrom::Start(page_num as u64 * PAGE_SIZE as u64))?;
                // A short read past the end of the file leaves the tail
                // zeroed.
                let mut filled = 0;
                while filled < PAGE_SIZE {
                    let n = self.file.read(&mut buf[filled..])?;
                    if n == 0 {
                        break;
                    }
                    filled += n;
                }
            }
            trace!(page_num, "loaded page into cache");
            self.slots[slot] = Some(buf);

            if page_num >= self.num_pages {
                self.num_pages = page_num + 1;
            }
        }

        self.slots[slot]
            .as_deref_mut()
            .ok_or_else(|| MyjqlError::Corrupted(format!("page {page_num} missing after load")))
    }

    /// Writes one resident page back to disk.
    pub fn flush(&mut self, page_num: u32) -> Result<()> {
        let buf = self
            .slots
            .get(page_num as usize)
            .and_then(|s| s.as_deref())
            .ok_or(MyjqlError::FlushNullPage { page_num })?;
        self.file
            .seek(SeekFrom::Start(page_num as u64 * PAGE_SIZE as u64))?;
        self.file.write_all(buf)?;
        Ok(())
    }

    /// Flushes every resident page in `[0, num_pages)` and releases the
    /// cache. The file handle itself closes when the pager is dropped.
    pub fn close(&mut self) -> Result<()> {
        let mut flushed = 0;
        for page_num in 0..self.num_pages {
            if self.slots[page_num as usize].is_some() {
                self.flush(page_num)?;
                self.slots[page_num as usize] = None;
                flushed += 1;
            }
        }
        self.file_length = self.num_pages as u64 * PAGE_SIZE as u64;
        debug!(flushed, "flushed pages at close");
        Ok(())
    }
}
