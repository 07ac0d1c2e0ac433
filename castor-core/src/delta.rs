//! Word-wise XOR delta between consecutive frames.
//!
//! Unchanged screen regions XOR to runs of zero, which the downstream
//! compressor collapses to almost nothing — this is what makes the
//! pipeline cheap for screen content, where most pixels are identical
//! from one frame to the next.
//!
//! The operation is self-inverse: applying the same XOR to a delta and
//! the frame it was diffed against recovers the other frame, so
//! [`merge_into`] is both the decoder and (composed with a capture)
//! the encoder's inverse. Both functions walk the buffers in 8-byte
//! words; callers obtain word-aligned lengths from
//! [`FrameGeometry`](crate::frame::FrameGeometry), which rejects odd
//! widths at session setup.

use crate::error::CastorError;
use crate::frame::WORD_BYTES;

/// Compute `out[w] = current[w] ^ previous[w]` for every 8-byte word.
///
/// All three slices must have identical, word-aligned lengths; a
/// mismatch is a session misconfiguration and fails loudly rather than
/// truncating.
pub fn diff_into(previous: &[u8], current: &[u8], out: &mut [u8]) -> Result<(), CastorError> {
    check_word_aligned(previous.len())?;
    check_same_len(previous.len(), current.len())?;
    check_same_len(previous.len(), out.len())?;

    let prev_words = previous.chunks_exact(WORD_BYTES);
    let cur_words = current.chunks_exact(WORD_BYTES);
    let out_words = out.chunks_exact_mut(WORD_BYTES);

    for ((prev, cur), out) in prev_words.zip(cur_words).zip(out_words) {
        let p = u64::from_ne_bytes(prev.try_into().expect("chunk is 8 bytes"));
        let c = u64::from_ne_bytes(cur.try_into().expect("chunk is 8 bytes"));
        out.copy_from_slice(&(c ^ p).to_ne_bytes());
    }
    Ok(())
}

/// Apply a delta to a frame in place: `frame[w] ^= delta[w]`.
///
/// Merging `diff_into(prev, cur)` onto `prev` yields `cur`; merging it
/// onto `cur` yields `prev` back. Lengths must match exactly.
pub fn merge_into(delta: &[u8], frame: &mut [u8]) -> Result<(), CastorError> {
    check_word_aligned(delta.len())?;
    check_same_len(frame.len(), delta.len())?;

    let delta_words = delta.chunks_exact(WORD_BYTES);
    let frame_words = frame.chunks_exact_mut(WORD_BYTES);

    for (frame, delta) in frame_words.zip(delta_words) {
        let f = u64::from_ne_bytes(frame.try_into().expect("chunk is 8 bytes"));
        let d = u64::from_ne_bytes(delta.try_into().expect("chunk is 8 bytes"));
        frame.copy_from_slice(&(f ^ d).to_ne_bytes());
    }
    Ok(())
}

// ── Internal ─────────────────────────────────────────────────────

fn check_word_aligned(len: usize) -> Result<(), CastorError> {
    if len % WORD_BYTES != 0 {
        return Err(CastorError::InvalidGeometry(
            "buffer length is not a multiple of 8 bytes",
        ));
    }
    Ok(())
}

fn check_same_len(expected: usize, actual: usize) -> Result<(), CastorError> {
    if expected != actual {
        return Err(CastorError::SizeMismatch { expected, actual });
    }
    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────
