//! Receiver-side consumer.
//!
//! Drains a stream of compressed payloads, merges each one through a
//! [`ReceiverPipeline`], and publishes the latest renderable frame via
//! a `tokio::sync::watch` channel so a renderer can always read the
//! newest mirror state without blocking the merge loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tokio::sync::{mpsc, watch};

use crate::compress::CompressedFrame;
use crate::error::CastorError;
use crate::frame::FrameGeometry;
use crate::receiver::ReceiverPipeline;

// ── MirrorStats ──────────────────────────────────────────────────

/// Per-session statistics exposed alongside the frame.
#[derive(Debug, Clone, Default)]
pub struct MirrorStats {
    /// Smoothed merge rate in frames per second.
    pub fps: f64,
    /// Total payloads merged since start.
    pub total_frames: u64,
    /// Total compressed bytes received.
    pub total_bytes: u64,
    /// Session frame width.
    pub width: u32,
    /// Session frame height.
    pub height: u32,
}

// ── ReceiverClient ───────────────────────────────────────────────

/// Merges incoming payloads and publishes the reconstruction.
///
/// Payloads are expected in production order on the channel; the
/// client applies them as they arrive and never reorders. A payload
/// that fails to decompress aborts the loop with the error — the
/// reconstruction is left at its last good state rather than merged
/// partially.
pub struct ReceiverClient {
    pipeline: ReceiverPipeline,
    rx: mpsc::Receiver<CompressedFrame>,
    running: Arc<AtomicBool>,
    frame_tx: watch::Sender<Vec<u8>>,
    frame_rx: watch::Receiver<Vec<u8>>,
    stats_tx: watch::Sender<MirrorStats>,
    stats_rx: watch::Receiver<MirrorStats>,
}

impl ReceiverClient {
    /// Create a client merging payloads from `rx`.
    pub fn new(
        geometry: FrameGeometry,
        rx: mpsc::Receiver<CompressedFrame>,
    ) -> Result<Self, CastorError> {
        let (frame_tx, frame_rx) = watch::channel(Vec::new());
        let (stats_tx, stats_rx) = watch::channel(MirrorStats::default());
        Ok(Self {
            pipeline: ReceiverPipeline::new(geometry)?,
            rx,
            running: Arc::new(AtomicBool::new(false)),
            frame_tx,
            frame_rx,
            stats_tx,
            stats_rx,
        })
    }

    /// Latest renderable frame bytes; empty until the first merge.
    pub fn frame_receiver(&self) -> watch::Receiver<Vec<u8>> {
        self.frame_rx.clone()
    }

    /// Statistics channel.
    pub fn stats_receiver(&self) -> watch::Receiver<MirrorStats> {
        self.stats_rx.clone()
    }

    /// A cloneable stop handle.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Signal the merge loop to stop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Whether the merge loop is currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run the merge loop.
    ///
    /// Ends cleanly when the payload channel closes or
    /// [`stop`](Self::stop) is called; returns the error if a payload
    /// fails to decompress or does not fill a whole frame.
    pub async fn run(&mut self) -> Result<(), CastorError> {
        self.running.store(true, Ordering::SeqCst);

        let geometry = self.pipeline.geometry();
        let mut fps_samples: Vec<f64> = Vec::with_capacity(64);
        let mut last_merge = Instant::now();
        let mut total_bytes: u64 = 0;

        while self.running.load(Ordering::SeqCst) {
            let Some(payload) = self.rx.recv().await else {
                break; // sender side closed — session over
            };

            total_bytes += payload.size() as u64;

            let frame = match self.pipeline.apply(&payload) {
                Ok(frame) => frame,
                Err(e) => {
                    self.running.store(false, Ordering::SeqCst);
                    return Err(e);
                }
            };
            let _ = self.frame_tx.send(frame.as_bytes().to_vec());

            // Smoothed fps over the last 60 inter-frame gaps.
            let now = Instant::now();
            fps_samples.push(now.duration_since(last_merge).as_secs_f64());
            last_merge = now;
            if fps_samples.len() > 60 {
                fps_samples.remove(0);
            }
            let avg = fps_samples.iter().sum::<f64>() / fps_samples.len() as f64;
            let fps = if avg > 0.0 { 1.0 / avg } else { 0.0 };

            let _ = self.stats_tx.send(MirrorStats {
                fps,
                total_frames: self.pipeline.merged(),
                total_bytes,
                width: geometry.width(),
                height: geometry.height(),
            });
        }

        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::PatternSource;
    use crate::frame::PixelFormat;
    use crate::sender::SenderPipeline;

    fn geo() -> FrameGeometry {
        FrameGeometry::new(16, 8, PixelFormat::Argb8).unwrap()
    }

    #[tokio::test]
    async fn merges_stream_and_publishes_frames() {
        let (tx, rx) = mpsc::channel(8);
        let mut client = ReceiverClient::new(geo(), rx).unwrap();
        let frame_rx = client.frame_receiver();
        let stats_rx = client.stats_receiver();

        let mut sender = SenderPipeline::new(geo()).unwrap();
        let mut source = PatternSource::new(geo());
        let mut expected = Vec::new();
        for _ in 0..3 {
            let payload = sender.iterate(&mut source).unwrap().clone();
            expected = sender.previous().as_bytes().to_vec();
            tx.send(payload).await.unwrap();
        }
        drop(tx);

        client.run().await.unwrap();

        assert_eq!(*frame_rx.borrow(), expected);
        let stats = stats_rx.borrow().clone();
        assert_eq!(stats.total_frames, 3);
        assert!(stats.total_bytes > 0);
        assert_eq!(stats.width, 16);
    }

    #[tokio::test]
    async fn bad_payload_aborts_with_error() {
        let (tx, rx) = mpsc::channel(2);
        let mut client = ReceiverClient::new(geo(), rx).unwrap();

        tx.send(CompressedFrame::from_payload(&[0xBA, 0xD0]))
            .await
            .unwrap();
        drop(tx);

        assert!(client.run().await.is_err());
        assert!(!client.is_running());
    }
}
