//! 64 KiB scratch buffers for transient atom paths
//!
//! Parsing a path from text needs a buffer sized for the worst case
//! before the real depth is known. Buffers are recycled through a
//! process-wide free list so that short-lived views do not hit the
//! allocator on every parse.

use crate::core::atom::Atom;
use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};

/// Size of one scratch buffer in bytes
pub const SCRATCH_BYTES: usize = 65536;

/// Number of atoms one scratch buffer holds
pub const SCRATCH_ATOMS: usize = SCRATCH_BYTES / std::mem::size_of::<Atom>();

/// Buffers kept on the free list; anything beyond is released
const MAX_POOLED: usize = 16;

static POOL: Mutex<ScratchPool> = parking_lot::const_mutex(ScratchPool::new());

/// Scratch pool statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScratchStats {
    /// Buffers handed out from the free list
    pub reused: u64,
    /// Buffers freshly allocated
    pub allocated: u64,
    /// Buffers currently on the free list
    pub pooled: usize,
}

struct ScratchPool {
    free: Vec<Box<[Atom]>>,
    reused: u64,
    allocated: u64,
}

impl ScratchPool {
    const fn new() -> Self {
        ScratchPool {
            free: Vec::new(),
            reused: 0,
            allocated: 0,
        }
    }

    fn take(&mut self) -> Box<[Atom]> {
        match self.free.pop() {
            Some(buffer) => {
                self.reused += 1;
                buffer
            }
            None => {
                self.allocated += 1;
                vec![Atom::EMPTY; SCRATCH_ATOMS].into_boxed_slice()
            }
        }
    }

    fn give_back(&mut self, buffer: Box<[Atom]>) {
        if self.free.len() < MAX_POOLED {
            self.free.push(buffer);
        }
    }
}

/// Current pool statistics
pub fn stats() -> ScratchStats {
    let pool = POOL.lock();
    ScratchStats {
        reused: pool.reused,
        allocated: pool.allocated,
        pooled: pool.free.len(),
    }
}

/// Exclusively owned scratch buffer, returned to the pool on drop
pub struct Scratch {
    buffer: Option<Box<[Atom]>>,
}

impl Scratch {
    /// Take a buffer from the pool, allocating if the pool is empty
    pub fn take() -> Self {
        Scratch {
            buffer: Some(POOL.lock().take()),
        }
    }
}

impl Deref for Scratch {
    type Target = [Atom];

    fn deref(&self) -> &[Atom] {
        self.buffer.as_deref().unwrap_or(&[])
    }
}

impl DerefMut for Scratch {
    fn deref_mut(&mut self) -> &mut [Atom] {
        self.buffer.as_deref_mut().unwrap_or(&mut [])
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            POOL.lock().give_back(buffer);
        }
    }
}

impl std::fmt::Debug for Scratch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scratch").field("atoms", &self.len()).finish()
    }
}
