//! Receiver session: decompress → XOR-merge onto the reconstruction.
//!
//! The receiver maintains a single frame buffer, initialized to black,
//! and updates it in place by merging each incoming delta. Because the
//! sender's first diff is against black too, a receiver that applies
//! every payload in production order tracks the sender's display
//! exactly.
//!
//! # Ordering
//!
//! Payloads must be applied in the exact order the sender produced
//! them, with none dropped — the merge is only correct while this
//! buffer is bit-identical to the frame the sender diffed against.
//! There are no sequence numbers or checksums: a reordered or lost
//! payload silently corrupts the mirror with no error signal. Keeping
//! the stream in order is the transport's job.

use crate::compress::{CompressedFrame, FrameDecompressor};
use crate::delta;
use crate::error::CastorError;
use crate::frame::{FrameGeometry, PixelBuffer};

/// Receiver-side session state.
///
/// Not internally synchronized: merges must not overlap, which the
/// exclusive `&mut self` receiver enforces.
pub struct ReceiverPipeline {
    geometry: FrameGeometry,
    frame: PixelBuffer,
    scratch: Vec<u8>,
    decompressor: FrameDecompressor,
    merged: u64,
}

impl ReceiverPipeline {
    /// Create a session with an all-black reconstruction buffer.
    pub fn new(geometry: FrameGeometry) -> Result<Self, CastorError> {
        Ok(Self {
            geometry,
            frame: PixelBuffer::black(geometry),
            scratch: vec![0u8; geometry.byte_len()],
            decompressor: FrameDecompressor::new()?,
            merged: 0,
        })
    }

    /// The session's fixed geometry.
    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    /// Decompress `payload` and merge it into the reconstruction.
    ///
    /// The payload is fully decompressed and length-verified before
    /// any pixel is touched, so a corrupt or truncated payload leaves
    /// the reconstruction exactly as it was — no partial merge.
    pub fn apply(&mut self, payload: &CompressedFrame) -> Result<&PixelBuffer, CastorError> {
        self.decompressor
            .decompress_into(payload.payload(), &mut self.scratch)?;
        delta::merge_into(&self.scratch, self.frame.as_bytes_mut())?;
        self.merged += 1;
        Ok(&self.frame)
    }

    /// The latest renderable frame (black until the first merge).
    pub fn frame(&self) -> &PixelBuffer {
        &self.frame
    }

    /// Number of payloads merged so far.
    pub fn merged(&self) -> u64 {
        self.merged
    }
}

// ── Tests ────────────────────────────────────────────────────────
