//! Zstd adapter: delta buffers in, length-tracked payloads out.
//!
//! The sender allocates one [`CompressedFrame`] per session, sized to
//! the zstd worst-case bound for a full delta buffer, and overwrites it
//! every cycle — compression can therefore never run out of
//! destination space at steady state. Decompression restores the exact
//! original bytes or reports a typed error; a payload that does not
//! round-trip to a whole frame is never merged.

use crate::error::CastorError;

/// Default zstd compression level. Level 1 favours speed; delta
/// buffers are mostly zero runs and compress well even at the fastest
/// setting.
pub const DEFAULT_LEVEL: i32 = 1;

/// Byte length of the size prefix a payload carries on the wire.
pub const PAYLOAD_HEADER_LEN: usize = 4;

/// Worst-case compressed size for an input of `len` bytes.
///
/// Destination buffers sized to this bound can always hold the result,
/// whatever the input looks like.
pub fn max_compressed_len(len: usize) -> usize {
    zstd::zstd_safe::compress_bound(len)
}

// ── CompressedFrame ──────────────────────────────────────────────

/// A compressed delta payload: a fixed-capacity byte buffer plus the
/// number of bytes currently valid.
///
/// The buffer is allocated once and overwritten each cycle; only the
/// latest payload is retained. A fresh frame has an empty payload and
/// a wire length of just the 4-byte size header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedFrame {
    size: u32,
    data: Box<[u8]>,
}

impl CompressedFrame {
    /// Allocate an empty payload buffer with the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            size: 0,
            data: vec![0u8; capacity].into_boxed_slice(),
        }
    }

    /// Build a payload directly from received wire bytes.
    pub fn from_payload(payload: &[u8]) -> Self {
        Self {
            size: payload.len() as u32,
            data: payload.to_vec().into_boxed_slice(),
        }
    }

    /// The valid compressed bytes.
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.size as usize]
    }

    /// Number of valid payload bytes.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Allocated capacity of the underlying buffer.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Whether a payload has been written since allocation (or the
    /// last [`clear`](Self::clear)).
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Bytes this payload occupies on the wire: the size header plus
    /// the payload itself. An empty frame is header-only.
    pub fn wire_len(&self) -> usize {
        PAYLOAD_HEADER_LEN + self.size as usize
    }

    /// Discard the payload, keeping the allocation.
    pub fn clear(&mut self) {
        self.size = 0;
    }

    pub(crate) fn set_size(&mut self, size: usize) {
        debug_assert!(size <= self.data.len());
        self.size = size as u32;
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

// ── FrameCompressor ──────────────────────────────────────────────

/// Session-held zstd compression context.
///
/// Reusing one context across cycles avoids per-frame allocation in
/// the zstd internals.
pub struct FrameCompressor {
    ctx: zstd::bulk::Compressor<'static>,
    level: i32,
}

impl FrameCompressor {
    /// Create a compressor at the given zstd level.
    pub fn new(level: i32) -> Result<Self, CastorError> {
        let ctx = zstd::bulk::Compressor::new(level)
            .map_err(|e| CastorError::Compress(e.to_string()))?;
        Ok(Self { ctx, level })
    }

    /// The configured compression level.
    pub fn level(&self) -> i32 {
        self.level
    }

    /// Compress `src` into `dst`, overwriting any previous payload.
    ///
    /// Returns the compressed size. `dst` must have been allocated
    /// with at least [`max_compressed_len`]`(src.len())` capacity;
    /// anything smaller is a programming error surfaced as a typed
    /// error before zstd is invoked.
    pub fn compress_into(
        &mut self,
        src: &[u8],
        dst: &mut CompressedFrame,
    ) -> Result<usize, CastorError> {
        let bound = max_compressed_len(src.len());
        if dst.capacity() < bound {
            return Err(CastorError::SizeMismatch {
                expected: bound,
                actual: dst.capacity(),
            });
        }

        dst.clear();
        let written = self
            .ctx
            .compress_to_buffer(src, &mut dst.buffer_mut()[..])
            .map_err(|e| CastorError::Compress(e.to_string()))?;
        dst.set_size(written);
        Ok(written)
    }
}

// ── FrameDecompressor ────────────────────────────────────────────

/// Session-held zstd decompression context.
pub struct FrameDecompressor {
    ctx: zstd::bulk::Decompressor<'static>,
}

impl FrameDecompressor {
    /// Create a decompressor.
    pub fn new() -> Result<Self, CastorError> {
        let ctx = zstd::bulk::Decompressor::new()
            .map_err(|e| CastorError::Decompress(e.to_string()))?;
        Ok(Self { ctx })
    }

    /// Decompress a payload into `dst`, expecting to fill it exactly.
    ///
    /// A payload that decodes to any other length indicates corruption
    /// or a desynchronized session; the caller must not merge it.
    pub fn decompress_into(&mut self, payload: &[u8], dst: &mut [u8]) -> Result<(), CastorError> {
        let written = self
            .ctx
            .decompress_to_buffer(payload, &mut dst[..])
            .map_err(|e| CastorError::Decompress(e.to_string()))?;
        if written != dst.len() {
            return Err(CastorError::DecompressedLength {
                expected: dst.len(),
                actual: written,
            });
        }
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
