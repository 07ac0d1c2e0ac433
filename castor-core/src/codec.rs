//! Length-prefixed wire framing for compressed payloads.
//!
//! The transport carrying payloads between sender and receiver is
//! external; this codec fixes the one thing both sides must agree on —
//! how a [`CompressedFrame`] is laid out on a byte stream:
//!
//! ```text
//! size:  u32 little-endian   (payload bytes that follow)
//! data:  [u8; size]
//! ```
//!
//! A fresh, never-written payload frames as a bare header (`size = 0`),
//! mirroring its in-memory "no payload yet" state. The decoder buffers
//! until a whole frame is available and rejects declared sizes beyond
//! [`MAX_PAYLOAD_LEN`] before reserving any memory for them.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::compress::{CompressedFrame, PAYLOAD_HEADER_LEN};
use crate::error::CastorError;

/// Upper bound on a single payload's declared size.
///
/// Generous enough for the zstd worst case of an 8K 32-bit frame;
/// anything larger is a corrupt or hostile length field.
pub const MAX_PAYLOAD_LEN: usize = 256 * 1024 * 1024;

/// Framing codec for `CompressedFrame`s over a byte stream.
#[derive(Debug, Default)]
pub struct PayloadCodec;

impl PayloadCodec {
    /// Create a codec.
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for PayloadCodec {
    type Item = CompressedFrame;
    type Error = CastorError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < PAYLOAD_HEADER_LEN {
            return Ok(None);
        }

        let size = u32::from_le_bytes(
            src[..PAYLOAD_HEADER_LEN]
                .try_into()
                .expect("header is 4 bytes"),
        ) as usize;

        if size > MAX_PAYLOAD_LEN {
            return Err(CastorError::PayloadTooLarge {
                size,
                max: MAX_PAYLOAD_LEN,
            });
        }

        if src.len() < PAYLOAD_HEADER_LEN + size {
            // Whole frame not buffered yet.
            src.reserve(PAYLOAD_HEADER_LEN + size - src.len());
            return Ok(None);
        }

        src.advance(PAYLOAD_HEADER_LEN);
        let payload = src.split_to(size);
        Ok(Some(CompressedFrame::from_payload(&payload)))
    }
}

impl Encoder<CompressedFrame> for PayloadCodec {
    type Error = CastorError;

    fn encode(&mut self, item: CompressedFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let payload = item.payload();
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(CastorError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD_LEN,
            });
        }
        dst.reserve(item.wire_len());
        dst.put_u32_le(payload.len() as u32);
        dst.put_slice(payload);
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
