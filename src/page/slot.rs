//! Slot management for the page allocator

use std::fmt;

/// Allocation state of one block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Unowned; the block's bytes on the medium are all zero
    Free,
    /// Owned by `refcount` holders (always > 0)
    Allocated { refcount: u32 },
}

/// A slot in the page, indexed directly by block number
///
/// `generation` is bumped every time the slot becomes Free, so handles that
/// captured an older generation can be recognised as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub state: SlotState,
    pub generation: u64,
}

impl Slot {
    /// Create a new free slot
    pub fn new() -> Self {
        Self {
            state: SlotState::Free,
            generation: 0,
        }
    }

    pub fn is_free(&self) -> bool {
        self.state == SlotState::Free
    }

    /// Current number of owners (0 when free)
    pub fn refcount(&self) -> u32 {
        match self.state {
            SlotState::Free => 0,
            SlotState::Allocated { refcount } => refcount,
        }
    }

    /// Take a free slot with a single owner
    pub fn allocate(&mut self) {
        debug_assert!(self.is_free());
        self.state = SlotState::Allocated { refcount: 1 };
    }

    /// Add an owner. Returns `false` if the slot is free.
    pub fn lock(&mut self) -> bool {
        match &mut self.state {
            SlotState::Free => false,
            SlotState::Allocated { refcount } => {
                *refcount = refcount.saturating_add(1);
                true
            }
        }
    }

    /// Drop one owner. Returns the remaining refcount, or `None` if the slot
    /// was already free. Reaching zero frees the slot.
    pub fn release(&mut self) -> Option<u32> {
        match self.state {
            SlotState::Free => None,
            SlotState::Allocated { refcount: 1 } => {
                self.free();
                Some(0)
            }
            SlotState::Allocated { refcount } => {
                self.state = SlotState::Allocated {
                    refcount: refcount - 1,
                };
                Some(refcount - 1)
            }
        }
    }

    /// Force the slot free regardless of its refcount
    pub fn free(&mut self) {
        self.state = SlotState::Free;
        self.generation = self.generation.wrapping_add(1);
    }
}

impl Default for Slot {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state {
            SlotState::Free => write!(f, "Free(gen={})", self.generation),
            SlotState::Allocated { refcount } => {
                write!(f, "Allocated(refs={}, gen={})", refcount, self.generation)
            }
        }
    }
}
