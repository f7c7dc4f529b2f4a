//! Growable residue storage
//!
//! `ResidueBuffer` holds the raw bytes of a sequence. Its capacity grows in
//! whole `SEQUENCE_BLOCK` steps so that repeated small appends from the
//! format readers reallocate rarely, and it never shrinks.

use crate::types::SEQUENCE_BLOCK;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BufferError {
    #[error("could not grow residue buffer from {current} to {requested} bytes")]
    Allocation { current: usize, requested: usize },
}

pub type BufferResult<T> = Result<T, BufferError>;

/// Byte buffer with block-quantised, monotonically growing capacity.
///
/// One byte past the logical end is always kept free, so an append of `n`
/// bytes fits in place only when `n + 1 < capacity - len`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResidueBuffer {
    data: Vec<u8>,
    capacity: usize,
}

impl ResidueBuffer {
    /// Empty buffer with room for one block.
    pub fn new() -> Self {
        Self::with_capacity(SEQUENCE_BLOCK)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Adopt an already filled vector; capacity equals its length.
    pub fn from_vec(data: Vec<u8>) -> Self {
        let capacity = data.len();
        Self { data, capacity }
    }

    /// Zero-filled buffer whose length and capacity are both `len`.
    pub fn zeroed(len: usize) -> Self {
        Self {
            data: vec![0; len],
            capacity: len,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Logical capacity, as accounted in blocks.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Append bytes, growing capacity by whole blocks when they do not fit.
    ///
    /// On failure the buffer keeps its previous contents and capacity.
    pub fn append(&mut self, more: &[u8]) -> BufferResult<()> {
        let needed = more.len() + 1;
        let remaining = self.capacity - self.data.len();

        if needed >= remaining {
            let deficit = needed - remaining;
            let blocks = 1 + deficit / SEQUENCE_BLOCK;
            let requested = self.capacity + blocks * SEQUENCE_BLOCK;

            self.data
                .try_reserve_exact(requested - self.data.len())
                .map_err(|_| {
                    log::warn!(
                        "residue buffer block error growing from {} to {} bytes",
                        self.capacity,
                        requested
                    );
                    BufferError::Allocation {
                        current: self.capacity,
                        requested,
                    }
                })?;

            log::debug!("residue buffer grew {} -> {} bytes", self.capacity, requested);
            self.capacity = requested;
        }

        self.data.extend_from_slice(more);
        Ok(())
    }
}

impl AsRef<[u8]> for ResidueBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}
