//! # castor-core
//!
//! Frame pipeline for mirroring a display to a remote viewer: capture
//! a frame, XOR it word-wise against the previous frame, compress the
//! mostly-zero delta, and — on the far side — decompress and XOR-merge
//! onto a maintained reconstruction.
//!
//! ```text
//! SENDER                                      RECEIVER
//! ┌─────────────────────────┐                ┌──────────────────────┐
//! │ FrameSource::fill       │                │ FrameDecompressor    │
//! │   ↓                     │                │   ↓                  │
//! │ delta::diff_into        │   transport    │ delta::merge_into    │
//! │   ↓                     │  (external)    │   ↓                  │
//! │ FrameCompressor         │ ──────────►    │ reconstruction frame │
//! │   ↓                     │                │   ↓                  │
//! │ CompressedFrame         │                │ render / persist     │
//! └─────────────────────────┘                └──────────────────────┘
//! ```
//!
//! Transport, rendering, and OS capture are external collaborators:
//! the crate hands the transport a [`CompressedFrame`] (and a
//! [`PayloadCodec`] describing its byte-stream framing), and takes raw
//! pixels through the [`FrameSource`] seam.
//!
//! Deltas only reconstruct correctly when every payload is applied in
//! production order with none lost; there is no sequence numbering or
//! checksumming, so an unreliable transport silently corrupts the
//! mirror. See [`receiver`] for the full contract.
//!
//! ## Modules
//!
//! | Module     | Purpose                                             |
//! |------------|-----------------------------------------------------|
//! | `frame`    | Pixel formats, validated geometry, frame storage    |
//! | `delta`    | Word-wise XOR diff and self-inverse merge           |
//! | `compress` | Zstd contexts and the reusable payload buffer       |
//! | `capture`  | Frame-acquisition trait + deterministic test source |
//! | `sender`   | Capture → diff → compress → slot-swap session       |
//! | `receiver` | Decompress → merge session                          |
//! | `session`  | Serializable dimensions handshake                   |
//! | `codec`    | Length-prefixed wire framing for payloads           |
//! | `service`  | Paced sender loop feeding a payload sink            |
//! | `client`   | Receiver loop publishing frames over `watch`        |
//! | `stats`    | Stage timings and throughput metering               |
//! | `error`    | `CastorError` — typed, `thiserror`-based hierarchy  |

pub mod capture;
pub mod client;
pub mod codec;
pub mod compress;
pub mod delta;
pub mod error;
pub mod frame;
pub mod receiver;
pub mod sender;
pub mod service;
pub mod session;
pub mod stats;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use capture::{FrameSource, PatternSource};
pub use client::{MirrorStats, ReceiverClient};
pub use codec::{MAX_PAYLOAD_LEN, PayloadCodec};
pub use compress::{
    CompressedFrame, DEFAULT_LEVEL, FrameCompressor, FrameDecompressor, PAYLOAD_HEADER_LEN,
    max_compressed_len,
};
pub use error::CastorError;
pub use frame::{FrameGeometry, PixelBuffer, PixelFormat, WORD_BYTES};
pub use receiver::ReceiverPipeline;
pub use sender::SenderPipeline;
pub use service::{PayloadSink, SenderService, SenderServiceConfig};
pub use session::SessionDescriptor;
pub use stats::{StageTimings, ThroughputMeter};
