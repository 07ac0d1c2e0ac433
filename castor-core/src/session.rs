//! Session descriptor: the handshake record both ends agree on.
//!
//! A mirror session runs at fixed dimensions; the sender announces
//! them once, before any payload, and the receiver allocates its
//! reconstruction from the same descriptor. How the descriptor reaches
//! the far side is the transport's business — this module only gives
//! it a compact serialized form.

use serde::{Deserialize, Serialize};

use crate::error::CastorError;
use crate::frame::{FrameGeometry, PixelFormat};

/// Fixed session parameters announced by the sender.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionDescriptor {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Pixel layout of every frame in the session.
    pub format: PixelFormat,
}

impl SessionDescriptor {
    /// Describe an already-validated geometry.
    pub fn from_geometry(geometry: FrameGeometry) -> Self {
        Self {
            width: geometry.width(),
            height: geometry.height(),
            format: geometry.format(),
        }
    }

    /// Validate the announced dimensions into a session geometry.
    ///
    /// The same rules as local setup apply: a remote peer announcing
    /// an odd width is rejected before any buffer is allocated.
    pub fn geometry(&self) -> Result<FrameGeometry, CastorError> {
        FrameGeometry::new(self.width, self.height, self.format)
    }

    /// Serialize to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CastorError> {
        bincode::serialize(self).map_err(|e| CastorError::Encoding(e.to_string()))
    }

    /// Deserialize from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CastorError> {
        bincode::deserialize(bytes).map_err(|e| CastorError::Encoding(e.to_string()))
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_roundtrip() {
        let desc = SessionDescriptor {
            width: 1920,
            height: 1080,
            format: PixelFormat::Bgra8,
        };
        let bytes = desc.to_bytes().unwrap();
        let decoded = SessionDescriptor::from_bytes(&bytes).unwrap();
        assert_eq!(desc, decoded);
    }

    #[test]
    fn descriptor_matches_geometry() {
        let geo = FrameGeometry::new(1280, 720, PixelFormat::Argb8).unwrap();
        let desc = SessionDescriptor::from_geometry(geo);
        assert_eq!(desc.geometry().unwrap(), geo);
    }

    #[test]
    fn invalid_announcement_is_rejected() {
        let desc = SessionDescriptor {
            width: 31,
            height: 64,
            format: PixelFormat::Argb8,
        };
        assert!(desc.geometry().is_err());
    }

    #[test]
    fn truncated_bytes_fail_to_decode() {
        let desc = SessionDescriptor {
            width: 64,
            height: 64,
            format: PixelFormat::Argb8,
        };
        let bytes = desc.to_bytes().unwrap();
        assert!(SessionDescriptor::from_bytes(&bytes[..bytes.len() - 1]).is_err());
    }
}
