//! Sender session: capture → diff → compress → slot swap.
//!
//! One [`iterate`](SenderPipeline::iterate) runs the whole sender side
//! for a single frame. The session owns two frame slots whose
//! *previous*/*current* roles alternate via an index swap — no pixel
//! data is ever copied between them — plus a scratch delta buffer and
//! the single reusable [`CompressedFrame`] the payload is written
//! into. All allocation happens at construction; the hot path only
//! overwrites.

use std::time::Instant;

use crate::capture::FrameSource;
use crate::compress::{CompressedFrame, FrameCompressor, max_compressed_len};
use crate::delta;
use crate::error::CastorError;
use crate::frame::{FrameGeometry, PixelBuffer};
use crate::stats::StageTimings;

/// Sender-side session state.
///
/// Not internally synchronized: iterations must not overlap, which the
/// exclusive `&mut self` receiver enforces. Independent sessions are
/// fully independent.
pub struct SenderPipeline {
    geometry: FrameGeometry,
    /// The two frame slots. `front` indexes the slot the next capture
    /// writes into; the other slot holds the previous frame.
    slots: [PixelBuffer; 2],
    front: usize,
    scratch: Vec<u8>,
    payload: CompressedFrame,
    compressor: FrameCompressor,
    iterations: u64,
    last_timings: StageTimings,
}

impl SenderPipeline {
    /// Create a session at the default compression level.
    ///
    /// Both slots start black, matching the receiver's all-zero
    /// initial reconstruction — the first payload is a diff against
    /// black.
    pub fn new(geometry: FrameGeometry) -> Result<Self, CastorError> {
        Self::with_level(geometry, crate::compress::DEFAULT_LEVEL)
    }

    /// Create a session with an explicit zstd level.
    pub fn with_level(geometry: FrameGeometry, level: i32) -> Result<Self, CastorError> {
        let byte_len = geometry.byte_len();
        Ok(Self {
            geometry,
            slots: [PixelBuffer::black(geometry), PixelBuffer::black(geometry)],
            front: 0,
            scratch: vec![0u8; byte_len],
            payload: CompressedFrame::with_capacity(max_compressed_len(byte_len)),
            compressor: FrameCompressor::new(level)?,
            iterations: 0,
            last_timings: StageTimings::default(),
        })
    }

    /// The session's fixed geometry.
    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    /// Run one sender cycle against `source`.
    ///
    /// Captures into the current slot, diffs it against the previous
    /// slot, compresses the delta into the session payload, then swaps
    /// the slot roles so the just-captured frame becomes *previous*.
    ///
    /// The returned payload is overwritten by the next call — callers
    /// that retain it across iterations must clone it first.
    ///
    /// A capture failure skips the cycle: no diff is computed, the
    /// slots keep their roles, and the previous payload stays intact,
    /// so the caller can simply retry on the next interval.
    pub fn iterate<S: FrameSource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> Result<&CompressedFrame, CastorError> {
        if source.geometry() != self.geometry {
            return Err(CastorError::GeometryMismatch {
                expected: self.geometry,
                actual: source.geometry(),
            });
        }

        let start = Instant::now();
        source.fill(&mut self.slots[self.front])?;
        let captured = Instant::now();

        let current = &self.slots[self.front];
        let previous = &self.slots[1 - self.front];
        delta::diff_into(previous.as_bytes(), current.as_bytes(), &mut self.scratch)?;
        let diffed = Instant::now();

        self.compressor
            .compress_into(&self.scratch, &mut self.payload)?;
        let compressed = Instant::now();

        // Role swap: the frame just captured becomes `previous` and the
        // stale slot will be overwritten by the next capture.
        self.front = 1 - self.front;
        self.iterations += 1;
        self.last_timings = StageTimings {
            capture: captured.duration_since(start),
            diff: diffed.duration_since(captured),
            compress: compressed.duration_since(diffed),
        };

        Ok(&self.payload)
    }

    /// The most recent compressed payload. Empty (header-only) until
    /// the first successful [`iterate`](Self::iterate).
    pub fn latest(&self) -> &CompressedFrame {
        &self.payload
    }

    /// The frame captured on the most recent cycle (black before the
    /// first one).
    pub fn previous(&self) -> &PixelBuffer {
        &self.slots[1 - self.front]
    }

    /// The frame captured on the cycle before that — the slot the next
    /// capture will overwrite.
    pub fn current(&self) -> &PixelBuffer {
        &self.slots[self.front]
    }

    /// Number of completed cycles.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Stage durations of the most recent completed cycle.
    pub fn last_timings(&self) -> StageTimings {
        self.last_timings
    }
}

// ── Tests ────────────────────────────────────────────────────────
