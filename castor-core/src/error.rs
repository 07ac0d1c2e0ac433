//! Error types for the mirror pipeline.
//!
//! All fallible operations return `Result<T, CastorError>`. Capture and
//! decompression failures are per-iteration and recoverable; size and
//! geometry mismatches indicate a misconfigured session and should be
//! treated as fatal by the caller.

use thiserror::Error;

use crate::frame::FrameGeometry;

/// The canonical error type for the mirror pipeline.
#[derive(Debug, Error)]
pub enum CastorError {
    // ── Session setup ────────────────────────────────────────────
    /// The requested frame dimensions cannot form a valid session.
    #[error("invalid frame geometry: {0}")]
    InvalidGeometry(&'static str),

    /// Two buffers that must match in byte length do not.
    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// A frame source or payload was produced for a different session.
    #[error("frame geometry mismatch: expected {expected:?}, got {actual:?}")]
    GeometryMismatch {
        expected: FrameGeometry,
        actual: FrameGeometry,
    },

    // ── Per-iteration failures ───────────────────────────────────
    /// The display could not be read; skip this cycle and retry.
    #[error("screen capture failed: {0}")]
    Capture(String),

    /// Compressing a delta buffer failed.
    #[error("compression failed: {0}")]
    Compress(String),

    /// Compressed bytes could not be decoded at all.
    #[error("decompression failed: {0}")]
    Decompress(String),

    /// Decompression succeeded but did not restore a whole frame.
    /// The payload must not be merged.
    #[error("decompressed length mismatch: expected {expected} bytes, got {actual}")]
    DecompressedLength { expected: usize, actual: usize },

    // ── Wire framing ─────────────────────────────────────────────
    /// A payload exceeds the configured maximum wire size.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The session descriptor could not be (de)serialized.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// The underlying stream or I/O layer reported an error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// An mpsc channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,
}

// ── Convenient From implementations ──────────────────────────────

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for CastorError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        CastorError::ChannelClosed
    }
}

impl From<Box<bincode::ErrorKind>> for CastorError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        CastorError::Encoding(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = CastorError::SizeMismatch {
            expected: 4096,
            actual: 1024,
        };
        assert!(e.to_string().contains("4096"));
        assert!(e.to_string().contains("1024"));

        let e = CastorError::Capture("display unplugged".into());
        assert!(e.to_string().contains("display unplugged"));
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke");
        let e: CastorError = io_err.into();
        assert!(matches!(e, CastorError::Io(_)));
    }

    #[test]
    fn from_mpsc_send() {
        let (tx, rx) = tokio::sync::mpsc::channel::<u8>(1);
        drop(rx);
        let err = tx.try_send(1).unwrap_err();
        let send_err = match err {
            tokio::sync::mpsc::error::TrySendError::Closed(v) => {
                tokio::sync::mpsc::error::SendError(v)
            }
            other => panic!("unexpected: {other:?}"),
        };
        let e: CastorError = send_err.into();
        assert!(matches!(e, CastorError::ChannelClosed));
    }
}
