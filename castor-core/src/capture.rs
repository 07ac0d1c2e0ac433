//! Display acquisition seam.
//!
//! Real screen grabbing lives outside this crate — platform backends
//! (DXGI, X11, a capture crate) implement [`FrameSource`] and hand the
//! pipeline raw pixels through it. The pipeline only requires that a
//! source overwrite a caller-supplied buffer with a frame of the fixed
//! session geometry.
//!
//! [`PatternSource`] is the in-tree implementation: a deterministic
//! animated test pattern used by the tests and the loopback demo.

use crate::error::CastorError;
use crate::frame::{FrameGeometry, PixelBuffer};

// ── FrameSource ──────────────────────────────────────────────────

/// A producer of raw frames at a fixed geometry.
///
/// # Contract
///
/// - Every call to [`fill`](Self::fill) overwrites the entire target
///   buffer with the current display contents, in the session's pixel
///   format.
/// - The geometry is constant for the source's lifetime and must match
///   the buffer it is asked to fill.
/// - Implementations must not allocate on the hot path after the first
///   call; staging state belongs in the source itself.
/// - A failed read returns [`CastorError::Capture`]; the caller skips
///   that cycle and retries on the next one, so a failure must leave
///   no half-written state the implementation relies on.
pub trait FrameSource {
    /// The fixed dimensions this source produces.
    fn geometry(&self) -> FrameGeometry;

    /// Overwrite `target` with the current frame.
    fn fill(&mut self, target: &mut PixelBuffer) -> Result<(), CastorError>;
}

// ── PatternSource ────────────────────────────────────────────────

/// Deterministic synthetic frame source.
///
/// Renders a diagonal gradient that drifts one step per frame, so
/// consecutive frames differ in most pixels while two sources created
/// with the same geometry produce identical sequences — which is what
/// makes mirror tests exact instead of statistical.
#[derive(Debug, Clone)]
pub struct PatternSource {
    geometry: FrameGeometry,
    tick: u32,
}

impl PatternSource {
    /// Create a source at tick zero.
    pub fn new(geometry: FrameGeometry) -> Self {
        Self { geometry, tick: 0 }
    }

    /// Number of frames produced so far.
    pub fn tick(&self) -> u32 {
        self.tick
    }

    fn render(&self, target: &mut PixelBuffer) {
        let width = self.geometry.width();
        let height = self.geometry.height();
        let t = self.tick;
        let bytes = target.as_bytes_mut();

        let mut offset = 0;
        for y in 0..height {
            for x in 0..width {
                let shade = (x.wrapping_add(t)) ^ (y.wrapping_add(t));
                bytes[offset] = 0xFF;
                bytes[offset + 1] = shade as u8;
                bytes[offset + 2] = (shade >> 1) as u8;
                bytes[offset + 3] = y as u8;
                offset += 4;
            }
        }
    }
}

impl FrameSource for PatternSource {
    fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    fn fill(&mut self, target: &mut PixelBuffer) -> Result<(), CastorError> {
        if target.geometry() != self.geometry {
            return Err(CastorError::GeometryMismatch {
                expected: self.geometry,
                actual: target.geometry(),
            });
        }
        self.render(target);
        self.tick = self.tick.wrapping_add(1);
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
