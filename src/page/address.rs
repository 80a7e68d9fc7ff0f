//! Ownership handle over a multi-block payload

use super::{Medium, Page};
use crate::codec::{Codec, JsonCodec};
use crate::error::Result;
use serde::de::DeserializeOwned;
use std::fmt;
use tracing::warn;

/// One owned reference to an ordered run of slots holding a single payload
///
/// Each entry remembers the slot generation it was issued against, so an
/// address whose slots were force-freed (by [`Page::clean`] or
/// [`Page::remove_range`]) is rejected instead of touching a new owner's data.
///
/// Dropping the address releases its slots. Use [`MemoryAddress::release`] to
/// observe release errors, or [`MemoryAddress::leak`] to hand ownership over
/// to the raw index API.
pub struct MemoryAddress<'p, M: Medium, C: Codec = JsonCodec> {
    page: &'p Page<M, C>,
    entries: Vec<(usize, u64)>,
}

impl<'p, M: Medium, C: Codec> MemoryAddress<'p, M, C> {
    pub(crate) fn new(page: &'p Page<M, C>, entries: Vec<(usize, u64)>) -> Self {
        Self { page, entries }
    }

    pub(crate) fn entries(&self) -> &[(usize, u64)] {
        &self.entries
    }

    /// Slot indices in payload order
    pub fn positions(&self) -> Vec<usize> {
        self.entries.iter().map(|&(index, _)| index).collect()
    }

    /// Number of blocks held
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw payload bytes, including block padding
    pub fn get(&self) -> Result<Vec<u8>> {
        self.page.get(self)
    }

    /// Decode the payload written by [`Page::put_value`]
    pub fn get_value<T: DeserializeOwned>(&self) -> Result<T> {
        self.page.get_value(self)
    }

    /// Add one owner to every slot without producing a new handle
    ///
    /// Each call must be balanced by a [`Page::release`] per slot (or by
    /// dropping a handle obtained through [`Page::adopt`]).
    pub fn lock(&self) -> Result<()> {
        self.page.lock_address(self)
    }

    /// Shared ownership: lock every slot and return a second handle
    pub fn share(&self) -> Result<MemoryAddress<'p, M, C>> {
        self.page.lock_address(self)?;
        Ok(Self::new(self.page, self.entries.clone()))
    }

    /// Release this handle's reference on every slot
    pub fn release(mut self) -> Result<()> {
        let entries = std::mem::take(&mut self.entries);
        self.page.release_entries(&entries)
    }

    /// Give up the handle without releasing; the caller now owns one
    /// reference on each returned slot index
    pub fn leak(mut self) -> Vec<usize> {
        let positions = self.positions();
        self.entries.clear();
        positions
    }
}

impl<M: Medium, C: Codec> Drop for MemoryAddress<'_, M, C> {
    fn drop(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        let entries = std::mem::take(&mut self.entries);
        if let Err(e) = self.page.release_entries(&entries) {
            warn!(blocks = entries.len(), error = %e, "Failed to release dropped address");
        }
    }
}

impl<M: Medium, C: Codec> fmt::Debug for MemoryAddress<'_, M, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryAddress")
            .field("positions", &self.positions())
            .finish()
    }
}
