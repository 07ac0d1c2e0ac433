//! Frame storage: pixel formats, session geometry, and the owned
//! `PixelBuffer` that every pipeline stage reads and writes.
//!
//! A session fixes its geometry once; every buffer it allocates has
//! exactly `stride * height` bytes where `stride = width * 4`. The
//! delta stage walks frames as 8-byte words, so the stride must be a
//! whole number of words — geometry validation rejects odd widths at
//! setup instead of silently truncating the last column.

use serde::{Deserialize, Serialize};

use crate::error::CastorError;

/// Byte width of the delta words the pipeline operates on.
pub const WORD_BYTES: usize = 8;

// ── PixelFormat ──────────────────────────────────────────────────

/// 32-bit pixel layouts accepted by the pipeline.
///
/// The delta and compression stages treat pixels as opaque bytes, so
/// the format only matters to capture backends and renderers. Both
/// variants are 4 bytes per pixel; there is no 24-bit path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 4 bytes per pixel: Alpha, Red, Green, Blue.
    Argb8,
    /// 4 bytes per pixel: Blue, Green, Red, Alpha.
    Bgra8,
}

impl PixelFormat {
    /// Bytes consumed by a single pixel in this format.
    pub const fn bytes_per_pixel(self) -> usize {
        4
    }
}

// ── FrameGeometry ────────────────────────────────────────────────

/// Fixed frame dimensions for the lifetime of a session.
///
/// Validated once at construction; every buffer, delta, and payload in
/// the session derives its size from this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameGeometry {
    width: u32,
    height: u32,
    format: PixelFormat,
}

impl FrameGeometry {
    /// Validate and fix the session dimensions.
    ///
    /// Fails if either dimension is zero or if the row stride would not
    /// be a whole number of 8-byte words (odd widths are rejected, not
    /// rounded).
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Result<Self, CastorError> {
        if width == 0 || height == 0 {
            return Err(CastorError::InvalidGeometry("dimensions must be nonzero"));
        }
        let stride = width as usize * format.bytes_per_pixel();
        if stride % WORD_BYTES != 0 {
            return Err(CastorError::InvalidGeometry(
                "row stride must be a multiple of 8 bytes (width must be even)",
            ));
        }
        Ok(Self {
            width,
            height,
            format,
        })
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel layout.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Row stride in bytes.
    pub fn stride(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    /// Total byte size of one frame.
    pub fn byte_len(&self) -> usize {
        self.stride() * self.height as usize
    }

    /// Frame size in 8-byte words.
    pub fn word_len(&self) -> usize {
        self.byte_len() / WORD_BYTES
    }
}

// ── PixelBuffer ──────────────────────────────────────────────────

/// An owned raw frame: `stride * height` bytes in the session's pixel
/// format.
///
/// Buffers are allocated once per session and overwritten in place on
/// every cycle; they never resize. Cloning is supported for callers
/// that need to retain a frame across iterations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    geometry: FrameGeometry,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Allocate an all-zero (black) frame for the given geometry.
    pub fn black(geometry: FrameGeometry) -> Self {
        Self {
            geometry,
            data: vec![0u8; geometry.byte_len()],
        }
    }

    /// The geometry this buffer was allocated for.
    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    /// Total byte length (`stride * height`).
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// Raw frame bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Mutable raw frame bytes, for capture backends and the merge
    /// stage to overwrite in place.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// The frame as 8-byte delta words. The geometry guarantees the
    /// buffer divides evenly.
    pub fn words(&self) -> impl Iterator<Item = u64> + '_ {
        debug_assert_eq!(self.data.len() % WORD_BYTES, 0);
        self.data
            .chunks_exact(WORD_BYTES)
            .map(|w| u64::from_ne_bytes(w.try_into().expect("chunk is 8 bytes")))
    }

    /// Returns one row of pixels.
    pub fn row(&self, y: u32) -> &[u8] {
        let stride = self.geometry.stride();
        let start = y as usize * stride;
        &self.data[start..start + stride]
    }

    /// Returns the pixel bytes at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let bpp = self.geometry.format.bytes_per_pixel();
        let offset = y as usize * self.geometry.stride() + x as usize * bpp;
        &self.data[offset..offset + bpp]
    }

    /// Overwrite this frame from a byte slice of identical length.
    pub fn copy_from(&mut self, src: &[u8]) -> Result<(), CastorError> {
        if src.len() != self.data.len() {
            return Err(CastorError::SizeMismatch {
                expected: self.data.len(),
                actual: src.len(),
            });
        }
        self.data.copy_from_slice(src);
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
