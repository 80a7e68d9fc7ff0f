//! Page allocator
//!
//! A page owns a storage medium and a flat table of slots, one per block.
//! Block `i` lives at byte offset `i * block_size`; there is no header and no
//! persisted slot table.
//!
//! # Architecture
//!
//! ```text
//! Page (one Mutex around everything below)
//!   ├─→ Medium   [blk 0][blk 1][blk 2][blk 3]
//!   └─→ Slots    [ 1  ][ 0  ][ 2  ][ 0  ]   first-fit scan from 0
//! ```
//!
//! Every operation, reads included, runs under the page lock, so a reader
//! never sees a half-written block.

pub mod address;
pub mod block;
pub mod slot;

pub use address::MemoryAddress;
pub use slot::{Slot, SlotState};

use crate::codec::{self, Codec, JsonCodec};
use crate::config::{MediumKind, PageConfig};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::{debug, info, warn};

/// Storage a page can be laid over: anything seekable, readable and writable
pub trait Medium: Read + Write + Seek + Send {}

impl<T: Read + Write + Seek + Send + ?Sized> Medium for T {}

/// Fixed-layout block allocator
///
/// `block_count` blocks of `block_size` bytes, handed out first-fit and
/// reference counted. Freed blocks are zero-filled on the medium.
pub struct Page<M: Medium, C: Codec = JsonCodec> {
    inner: Mutex<Inner<M>>,
    block_size: usize,
    block_count: usize,
    codec: C,
}

impl<M: Medium> Page<M, JsonCodec> {
    /// Lay a page over `medium` using the JSON codec for the object path
    ///
    /// Nothing is written at construction time. Regions of the medium that
    /// were never written read back as zeros.
    pub fn new(medium: M, block_size: usize, block_count: usize) -> Result<Self> {
        Self::with_codec(medium, block_size, block_count, JsonCodec)
    }
}

impl Page<Cursor<Vec<u8>>, JsonCodec> {
    /// Page over a zeroed in-memory buffer of exactly `size` bytes
    pub fn in_memory(block_size: usize, block_count: usize) -> Result<Self> {
        let size = geometry(block_size, block_count)?;
        Self::new(Cursor::new(vec![0u8; size]), block_size, block_count)
    }
}

impl Page<File, JsonCodec> {
    /// Page over a file, created if missing
    ///
    /// A file shorter than the page is extended to the page size; existing
    /// bytes are kept. Allocation state always starts empty.
    pub fn open_file<P: AsRef<Path>>(
        path: P,
        block_size: usize,
        block_count: usize,
    ) -> Result<Self> {
        let size = geometry(block_size, block_count)?;
        let file = open_medium_file(path.as_ref(), size as u64)?;
        Self::new(file, block_size, block_count)
    }

    /// Flush file data and metadata to disk
    pub fn sync(&self) -> Result<()> {
        self.inner.lock().medium.sync_all()?;
        Ok(())
    }
}

impl Page<Box<dyn Medium>, JsonCodec> {
    /// Open the medium described by `config`
    pub fn from_config(config: &PageConfig) -> Result<Self> {
        config.validate()?;
        let size = geometry(config.block_size, config.block_count)?;

        let medium: Box<dyn Medium> = match config.medium {
            MediumKind::Memory => Box::new(Cursor::new(vec![0u8; size])),
            MediumKind::File => {
                let path = config.path.as_deref().ok_or_else(|| {
                    Error::Config("File medium requires a path".to_string())
                })?;
                Box::new(open_medium_file(path, size as u64)?)
            }
        };

        Self::new(medium, config.block_size, config.block_count)
    }
}

impl<M: Medium, C: Codec> Page<M, C> {
    /// Lay a page over `medium` with a custom codec
    pub fn with_codec(
        mut medium: M,
        block_size: usize,
        block_count: usize,
        codec: C,
    ) -> Result<Self> {
        geometry(block_size, block_count)?;

        medium
            .stream_position()
            .map_err(|e| Error::InvalidMedium(format!("Medium does not support seeking: {}", e)))?;
        // zero-length transfers fail on handles opened without the access mode
        medium
            .read(&mut [0u8; 0])
            .map_err(|e| Error::InvalidMedium(format!("Medium does not support reading: {}", e)))?;
        medium
            .write(&[0u8; 0])
            .map_err(|e| Error::InvalidMedium(format!("Medium does not support writing: {}", e)))?;

        info!(block_size, block_count, "Opened page");

        Ok(Self {
            inner: Mutex::new(Inner {
                medium,
                slots: vec![Slot::new(); block_count],
                used: 0,
                block_size,
            }),
            block_size,
            block_count,
            codec,
        })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn block_count(&self) -> usize {
        self.block_count
    }

    /// Total bytes covered by the page (`block_size * block_count`)
    pub fn size(&self) -> usize {
        self.block_size * self.block_count
    }

    /// Number of slots with refcount > 0
    pub fn used_blocks(&self) -> usize {
        self.inner.lock().used
    }

    pub fn free_blocks(&self) -> usize {
        self.block_count - self.used_blocks()
    }

    /// Current refcount of a slot (0 = free)
    pub fn refcount(&self, index: usize) -> Result<u32> {
        let inner = self.inner.lock();
        inner.check_index(index)?;
        Ok(inner.slots[index].refcount())
    }

    /// Store up to one block of data in the first free slot
    ///
    /// Short data is zero-padded to the block size. Returns the slot index,
    /// owned once by the caller.
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        if data.len() > self.block_size {
            return Err(Error::InvalidArgument(format!(
                "Data size {} exceeds block size {}",
                data.len(),
                self.block_size
            )));
        }

        let mut inner = self.inner.lock();
        let index = inner.allocate(data)?;
        inner.record_usage();
        Ok(index)
    }

    /// Read one whole block
    pub fn read_block(&self, index: usize) -> Result<Vec<u8>> {
        let mut inner = self.inner.lock();
        inner.check_index(index)?;
        inner.read_block(index)
    }

    /// Overwrite one whole block in place; allocation state is untouched
    pub fn write_block(&self, index: usize, data: &[u8]) -> Result<()> {
        if data.len() != self.block_size {
            return Err(Error::InvalidArgument(format!(
                "Block write of {} bytes, expected exactly {}",
                data.len(),
                self.block_size
            )));
        }

        let mut inner = self.inner.lock();
        inner.check_index(index)?;
        let offset = inner.offset(index);
        inner.write_at(offset, data)
    }

    /// Add an owner to an allocated slot
    pub fn lock(&self, index: usize) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.check_index(index)?;
        if !inner.slots[index].lock() {
            return Err(Error::InvalidAddress {
                index,
                block_count: self.block_count,
            });
        }
        debug!(slot = index, refcount = inner.slots[index].refcount(), "Locked slot");
        Ok(())
    }

    /// Drop one owner; the slot is zeroed and freed when none remain
    pub fn release(&self, index: usize) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.release(index)?;
        inner.record_usage();
        Ok(())
    }

    /// Add an owner to every slot of `address`
    pub fn lock_address(&self, address: &MemoryAddress<'_, M, C>) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.validate(address.entries())?;
        for &(index, _) in address.entries() {
            inner.slots[index].lock();
        }
        debug!(blocks = address.len(), "Locked address");
        Ok(())
    }

    /// Release every slot of `address`, consuming the handle
    pub fn release_address(&self, address: MemoryAddress<'_, M, C>) -> Result<()> {
        address.release()
    }

    pub(crate) fn release_entries(&self, entries: &[(usize, u64)]) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.validate(entries)?;
        for &(index, _) in entries {
            inner.release(index)?;
        }
        inner.record_usage();
        Ok(())
    }

    /// Wrap raw slot indices (one owned reference each) back into a handle
    ///
    /// Each index may appear once.
    pub fn adopt(&self, positions: Vec<usize>) -> Result<MemoryAddress<'_, M, C>> {
        let inner = self.inner.lock();
        let mut seen = HashSet::with_capacity(positions.len());
        let mut entries = Vec::with_capacity(positions.len());
        for index in positions {
            inner.check_index(index)?;
            if !seen.insert(index) {
                return Err(Error::InvalidArgument(format!(
                    "Slot {} appears more than once",
                    index
                )));
            }
            let slot = &inner.slots[index];
            if slot.is_free() {
                return Err(Error::InvalidAddress {
                    index,
                    block_count: self.block_count,
                });
            }
            entries.push((index, slot.generation));
        }
        Ok(MemoryAddress::new(self, entries))
    }

    /// Force-free up to `count` allocated slots, after skipping the first
    /// `start` allocated slots in ascending order
    ///
    /// Refcounts are ignored. Returns how many slots were freed.
    pub fn remove_range(&self, count: usize, start: usize) -> Result<usize> {
        let mut inner = self.inner.lock();
        let targets: Vec<usize> = inner.allocated().skip(start).take(count).collect();
        for &index in &targets {
            inner.force_free(index)?;
        }
        inner.record_usage();
        debug!(removed = targets.len(), start, "Removed range");
        Ok(targets.len())
    }

    /// Store `data` across as many blocks as needed
    ///
    /// All-or-nothing: if any block cannot be written, the blocks already
    /// written by this call are freed before the error is returned.
    pub fn put(&self, data: &[u8]) -> Result<MemoryAddress<'_, M, C>> {
        let chunks = block::split(data, self.block_size);

        let mut inner = self.inner.lock();
        if chunks.len() > inner.free_count() {
            warn!(
                needed = chunks.len(),
                free = inner.free_count(),
                "Put exceeds free capacity"
            );
            metrics::counter!("pagefile_out_of_capacity_total").increment(1);
            return Err(Error::OutOfCapacity {
                block_count: self.block_count,
            });
        }

        let mut pending = PendingPut::new(&mut inner);
        for chunk in &chunks {
            pending.write(chunk)?;
        }
        let entries = pending.commit();
        inner.record_usage();
        drop(inner);

        debug!(bytes = data.len(), blocks = entries.len(), "Put payload");
        Ok(MemoryAddress::new(self, entries))
    }

    /// Concatenate the blocks of `address`, padding included
    pub fn get(&self, address: &MemoryAddress<'_, M, C>) -> Result<Vec<u8>> {
        let mut inner = self.inner.lock();
        inner.validate(address.entries())?;

        let mut buffer = Vec::with_capacity(address.len() * self.block_size);
        for &(index, _) in address.entries() {
            buffer.extend_from_slice(&inner.read_block(index)?);
        }
        Ok(buffer)
    }

    /// Serialize `value` with the page codec and store it
    pub fn put_value<T: Serialize>(&self, value: &T) -> Result<MemoryAddress<'_, M, C>> {
        let payload = self.codec.encode(value)?;
        self.put(&codec::frame(&payload)?)
    }

    /// Decode a value stored with [`Page::put_value`]
    pub fn get_value<T: DeserializeOwned>(&self, address: &MemoryAddress<'_, M, C>) -> Result<T> {
        let bytes = self.get(address)?;
        self.codec.decode(codec::unframe(&bytes)?)
    }

    /// Free every slot and zero the whole page in one write
    ///
    /// Outstanding addresses become stale.
    pub fn clean(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        let zeros = vec![0u8; self.size()];
        inner.write_at(0, &zeros)?;

        for slot in inner.slots.iter_mut().filter(|s| !s.is_free()) {
            slot.free();
        }
        inner.used = 0;
        inner.record_usage();
        metrics::counter!("pagefile_cleans_total").increment(1);

        info!(size = self.size(), "Cleaned page");
        Ok(())
    }

    /// Allocated slots in ascending order with their raw block bytes,
    /// skipping the first `offset` and returning at most `count`
    pub fn get_items(&self, offset: usize, count: usize) -> Result<Vec<(usize, Vec<u8>)>> {
        let mut inner = self.inner.lock();
        let indices: Vec<usize> = inner.allocated().skip(offset).take(count).collect();

        let mut items = Vec::with_capacity(indices.len());
        for index in indices {
            let data = inner.read_block(index)?;
            items.push((index, data));
        }
        Ok(items)
    }

    /// Flush the medium
    pub fn flush(&self) -> Result<()> {
        self.inner.lock().medium.flush()?;
        Ok(())
    }

    /// Get statistics about the page
    pub fn stats(&self) -> PageStats {
        let inner = self.inner.lock();
        PageStats {
            block_size: self.block_size,
            block_count: self.block_count,
            used_blocks: inner.used,
            free_blocks: inner.free_count(),
            total_refs: inner.slots.iter().map(|s| s.refcount() as u64).sum(),
        }
    }

    /// Dispose of the page and hand the medium back to the caller
    pub fn into_inner(self) -> M {
        self.inner.into_inner().medium
    }
}

impl<M: Medium, C: Codec> fmt::Debug for Page<M, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("block_size", &self.block_size)
            .field("block_count", &self.block_count)
            .field("used_blocks", &self.used_blocks())
            .finish()
    }
}

/// Statistics for a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageStats {
    pub block_size: usize,
    pub block_count: usize,
    pub used_blocks: usize,
    pub free_blocks: usize,
    /// Sum of all refcounts
    pub total_refs: u64,
}

/// Validate geometry and return the page size in bytes
fn geometry(block_size: usize, block_count: usize) -> Result<usize> {
    if block_size == 0 {
        return Err(Error::InvalidArgument("Block size must be non-zero".to_string()));
    }
    if block_count == 0 {
        return Err(Error::InvalidArgument("Block count must be non-zero".to_string()));
    }
    block_size
        .checked_mul(block_count)
        .filter(|&size| u64::try_from(size).is_ok())
        .ok_or_else(|| {
            Error::InvalidArgument(format!(
                "Page of {} x {} bytes overflows",
                block_count, block_size
            ))
        })
}

/// Open (or create) a read-write file of at least `size` bytes
fn open_medium_file(path: &Path, size: u64) -> Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;

    let len = file.metadata()?.len();
    if len < size {
        file.set_len(size)?;
        debug!(path = ?path, from = len, to = size, "Extended page file");
    }
    Ok(file)
}

struct Inner<M> {
    medium: M,
    slots: Vec<Slot>,
    used: usize,
    block_size: usize,
}

impl<M: Medium> Inner<M> {
    fn offset(&self, index: usize) -> u64 {
        index as u64 * self.block_size as u64
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.slots.len() {
            return Err(Error::InvalidAddress {
                index,
                block_count: self.slots.len(),
            });
        }
        Ok(())
    }

    fn free_count(&self) -> usize {
        self.slots.len() - self.used
    }

    fn allocated(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| !slot.is_free())
            .map(|(index, _)| index)
    }

    /// Every entry must name a live slot of the generation it was issued for
    fn validate(&self, entries: &[(usize, u64)]) -> Result<()> {
        for &(index, generation) in entries {
            self.check_index(index)?;
            let slot = &self.slots[index];
            if slot.is_free() || slot.generation != generation {
                return Err(Error::StaleAddress { index });
            }
        }
        Ok(())
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        self.medium.seek(SeekFrom::Start(offset))?;
        self.medium.write_all(buf)?;
        Ok(())
    }

    /// Bytes past the end of the medium read as zeros
    fn read_block(&mut self, index: usize) -> Result<Vec<u8>> {
        let offset = self.offset(index);
        self.medium.seek(SeekFrom::Start(offset))?;

        let mut buf = Vec::with_capacity(self.block_size);
        Read::by_ref(&mut self.medium)
            .take(self.block_size as u64)
            .read_to_end(&mut buf)?;
        buf.resize(self.block_size, 0);
        Ok(buf)
    }

    fn zero_block(&mut self, index: usize) -> Result<()> {
        let zeros = vec![0u8; self.block_size];
        let offset = self.offset(index);
        self.write_at(offset, &zeros)
    }

    /// First-fit allocation of one block
    fn allocate(&mut self, data: &[u8]) -> Result<usize> {
        let index = match self.slots.iter().position(Slot::is_free) {
            Some(index) => index,
            None => {
                warn!(block_count = self.slots.len(), "No free block left in page");
                metrics::counter!("pagefile_out_of_capacity_total").increment(1);
                return Err(Error::OutOfCapacity {
                    block_count: self.slots.len(),
                });
            }
        };

        let block = block::pad_to(data, self.block_size);
        let offset = self.offset(index);
        if let Err(e) = self.write_at(offset, &block) {
            // a torn write may have left bytes behind in a free slot
            if let Err(zero_err) = self.zero_block(index) {
                warn!(slot = index, error = %zero_err, "Failed to zero block after torn write");
            }
            return Err(e);
        }
        self.slots[index].allocate();
        self.used += 1;

        metrics::counter!("pagefile_blocks_written_total").increment(1);
        debug!(slot = index, bytes = data.len(), "Wrote block");
        Ok(index)
    }

    /// Drop one owner, returning the remaining refcount
    fn release(&mut self, index: usize) -> Result<u32> {
        self.check_index(index)?;
        match self.slots[index].refcount() {
            0 => Err(Error::DoubleRelease { index }),
            1 => {
                self.force_free(index)?;
                Ok(0)
            }
            _ => {
                let remaining = self.slots[index].release().unwrap_or_default();
                debug!(slot = index, refcount = remaining, "Released slot");
                Ok(remaining)
            }
        }
    }

    /// Zero the block, then mark it free whatever its refcount
    fn force_free(&mut self, index: usize) -> Result<()> {
        self.zero_block(index)?;
        self.slots[index].free();
        self.used -= 1;

        metrics::counter!("pagefile_blocks_released_total").increment(1);
        debug!(slot = index, "Freed block");
        Ok(())
    }

    fn record_usage(&self) {
        metrics::gauge!("pagefile_used_blocks").set(self.used as f64);
    }
}

/// Blocks written by an in-flight [`Page::put`]; freed again unless committed
struct PendingPut<'a, M: Medium> {
    inner: &'a mut Inner<M>,
    written: Vec<usize>,
}

impl<'a, M: Medium> PendingPut<'a, M> {
    fn new(inner: &'a mut Inner<M>) -> Self {
        Self {
            inner,
            written: Vec::new(),
        }
    }

    fn write(&mut self, chunk: &[u8]) -> Result<()> {
        let index = self.inner.allocate(chunk)?;
        self.written.push(index);
        Ok(())
    }

    fn commit(mut self) -> Vec<(usize, u64)> {
        let written = std::mem::take(&mut self.written);
        written
            .into_iter()
            .map(|index| (index, self.inner.slots[index].generation))
            .collect()
    }
}

impl<M: Medium> Drop for PendingPut<'_, M> {
    fn drop(&mut self) {
        if self.written.is_empty() {
            return;
        }
        let written = std::mem::take(&mut self.written);
        warn!(blocks = written.len(), "Rolling back partial put");
        for index in written.into_iter().rev() {
            if let Err(e) = self.inner.force_free(index) {
                warn!(slot = index, error = %e, "Failed to roll back block");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(block_size: usize, block_count: usize) -> Page<Cursor<Vec<u8>>> {
        Page::in_memory(block_size, block_count).unwrap()
    }

    #[test]
    fn test_geometry() {
        assert_eq!(geometry(4, 3).unwrap(), 12);
        assert!(matches!(geometry(0, 3), Err(Error::InvalidArgument(_))));
        assert!(matches!(geometry(4, 0), Err(Error::InvalidArgument(_))));
        assert!(matches!(
            geometry(usize::MAX, 2),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_write_first_fit() -> Result<()> {
        let page = page(4, 3);
        assert_eq!(page.write(&[1, 2, 3, 4])?, 0);
        assert_eq!(page.write(&[5, 6, 7, 8])?, 1);
        assert_eq!(page.used_blocks(), 2);
        assert_eq!(page.size(), 12);

        page.release(0)?;
        assert_eq!(page.write(&[9])?, 0);
        assert_eq!(page.read_block(0)?, vec![9, 0, 0, 0]);
        Ok(())
    }

    #[test]
    fn test_write_rejects_oversized_block() {
        let page = page(4, 3);
        let result = page.write(&[1, 2, 3, 4, 5]);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
        assert_eq!(page.used_blocks(), 0);
    }

    #[test]
    fn test_release_zeroes_block() -> Result<()> {
        let page = page(4, 2);
        let index = page.write(&[1, 2, 3, 4])?;
        page.release(index)?;

        let medium = page.into_inner().into_inner();
        assert!(medium.iter().all(|&b| b == 0));
        Ok(())
    }

    #[test]
    fn test_double_release() -> Result<()> {
        let page = page(4, 2);
        let index = page.write(&[1])?;
        page.release(index)?;
        assert!(matches!(
            page.release(index),
            Err(Error::DoubleRelease { index: 0 })
        ));
        Ok(())
    }

    #[test]
    fn test_index_bounds() {
        let page = page(4, 2);
        assert!(matches!(
            page.read_block(2),
            Err(Error::InvalidAddress { index: 2, .. })
        ));
        assert!(matches!(page.lock(5), Err(Error::InvalidAddress { .. })));
        assert!(matches!(page.release(9), Err(Error::InvalidAddress { .. })));
    }

    #[test]
    fn test_lock_free_slot_fails() {
        let page = page(4, 2);
        assert!(matches!(
            page.lock(0),
            Err(Error::InvalidAddress { index: 0, .. })
        ));
        assert_eq!(page.refcount(0).unwrap(), 0);
    }

    #[test]
    fn test_write_block_in_place() -> Result<()> {
        let page = page(4, 2);
        let index = page.write(&[1, 2, 3, 4])?;
        page.write_block(index, &[4, 3, 2, 1])?;
        assert_eq!(page.read_block(index)?, vec![4, 3, 2, 1]);
        assert!(matches!(
            page.write_block(index, &[1, 2]),
            Err(Error::InvalidArgument(_))
        ));
        Ok(())
    }

    #[test]
    fn test_read_past_end_of_short_medium() -> Result<()> {
        let page = Page::new(Cursor::new(Vec::new()), 4, 2)?;
        assert_eq!(page.read_block(1)?, vec![0; 4]);
        Ok(())
    }

    #[test]
    fn test_stats() -> Result<()> {
        let page = page(4, 4);
        let index = page.write(&[1])?;
        page.lock(index)?;
        page.write(&[2])?;

        let stats = page.stats();
        assert_eq!(stats.used_blocks, 2);
        assert_eq!(stats.free_blocks, 2);
        assert_eq!(stats.total_refs, 3);
        Ok(())
    }

    #[test]
    fn test_pending_put_rolls_back() -> Result<()> {
        let page = page(4, 3);
        {
            let mut inner = page.inner.lock();
            let mut pending = PendingPut::new(&mut inner);
            pending.write(&[1])?;
            pending.write(&[2])?;
            // dropped without commit
        }
        assert_eq!(page.used_blocks(), 0);
        assert_eq!(page.read_block(0)?, vec![0; 4]);
        assert_eq!(page.read_block(1)?, vec![0; 4]);
        Ok(())
    }

    /// Writes one byte of the next non-empty buffer, then refuses
    /// anything that is not all zeros
    struct TornMedium {
        inner: Cursor<Vec<u8>>,
        torn: bool,
    }

    impl Read for TornMedium {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl Write for TornMedium {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if buf.is_empty() {
                return Ok(0);
            }
            if !self.torn {
                self.torn = true;
                return self.inner.write(&buf[..1]);
            }
            if buf.iter().any(|&b| b != 0) {
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "device gone"));
            }
            self.inner.write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Seek for TornMedium {
        fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    #[test]
    fn test_torn_write_leaves_free_block_zeroed() -> Result<()> {
        let medium = TornMedium {
            inner: Cursor::new(vec![0u8; 8]),
            torn: false,
        };
        let page = Page::new(medium, 4, 2)?;

        assert!(matches!(page.write(&[5, 6, 7, 8]), Err(Error::Io(_))));
        assert_eq!(page.used_blocks(), 0);
        assert_eq!(page.refcount(0)?, 0);
        assert_eq!(page.read_block(0)?, vec![0; 4]);
        Ok(())
    }

    #[test]
    fn test_debug() {
        let page = page(4, 3);
        let text = format!("{:?}", page);
        assert!(text.contains("block_size: 4"));
    }
}
