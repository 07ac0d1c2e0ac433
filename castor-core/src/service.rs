//! Sender-side capture loop.
//!
//! Wraps a [`SenderPipeline`] in a paced service: capture at a target
//! frame rate, hand every finished payload to a [`PayloadSink`], and
//! keep throughput accounting. The pipeline itself stays synchronous;
//! this loop is the single caller that serializes its iterations.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::capture::FrameSource;
use crate::compress::{CompressedFrame, DEFAULT_LEVEL};
use crate::error::CastorError;
use crate::sender::SenderPipeline;
use crate::stats::ThroughputMeter;

// ── PayloadSink ──────────────────────────────────────────────────

/// Where finished payloads go.
///
/// Real transports implement this at the process boundary; the
/// in-tree implementation for `mpsc::Sender` covers in-process
/// loopback and tests.
#[async_trait]
pub trait PayloadSink: Send {
    /// Deliver one payload. The reference is only valid for the call;
    /// sinks that queue must copy.
    async fn deliver(&mut self, payload: &CompressedFrame) -> Result<(), CastorError>;
}

#[async_trait]
impl PayloadSink for mpsc::Sender<CompressedFrame> {
    async fn deliver(&mut self, payload: &CompressedFrame) -> Result<(), CastorError> {
        self.send(payload.clone()).await?;
        Ok(())
    }
}

// ── SenderServiceConfig ──────────────────────────────────────────

/// Configuration for [`SenderService`].
#[derive(Debug, Clone)]
pub struct SenderServiceConfig {
    /// Target frames per second (1..=60).
    pub target_fps: u8,
    /// Zstd compression level.
    pub compression_level: i32,
}

impl Default for SenderServiceConfig {
    fn default() -> Self {
        Self {
            target_fps: 30,
            compression_level: DEFAULT_LEVEL,
        }
    }
}

// ── SenderService ────────────────────────────────────────────────

/// Paced capture/diff/compress loop feeding a payload sink.
///
/// # Lifetime
///
/// Call [`run`](Self::run) to start the loop; it runs until
/// [`stop`](Self::stop) is invoked, the sink closes, or an
/// unrecoverable error occurs. Capture failures are not
/// unrecoverable — the cycle is skipped and the loop retries on the
/// next interval.
pub struct SenderService<S: FrameSource + Send> {
    pipeline: SenderPipeline,
    source: S,
    sink: Box<dyn PayloadSink>,
    meter: ThroughputMeter,
    running: Arc<AtomicBool>,
    config: SenderServiceConfig,
}

impl<S: FrameSource + Send> SenderService<S> {
    /// Create a service with default configuration.
    pub fn new(source: S, sink: Box<dyn PayloadSink>) -> Result<Self, CastorError> {
        Self::with_config(source, sink, SenderServiceConfig::default())
    }

    /// Create a service with explicit configuration.
    pub fn with_config(
        source: S,
        sink: Box<dyn PayloadSink>,
        config: SenderServiceConfig,
    ) -> Result<Self, CastorError> {
        let pipeline = SenderPipeline::with_level(source.geometry(), config.compression_level)?;
        Ok(Self {
            pipeline,
            source,
            sink,
            meter: ThroughputMeter::new(),
            running: Arc::new(AtomicBool::new(false)),
            config,
        })
    }

    /// A cloneable handle that stops the service from another task.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Signal the service to stop after the current cycle.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Whether the loop is currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Compressed throughput over the last second, in bytes/second.
    pub fn throughput_bps(&self) -> u64 {
        self.meter.bytes_per_sec()
    }

    /// Number of completed pipeline cycles.
    pub fn iterations(&self) -> u64 {
        self.pipeline.iterations()
    }

    /// Run the capture loop.
    ///
    /// Intended to be spawned on the runtime; use
    /// [`stop_handle`](Self::stop_handle) to end it from outside.
    pub async fn run(&mut self) -> Result<(), CastorError> {
        self.running.store(true, Ordering::SeqCst);
        let fps = self.config.target_fps.clamp(1, 60);
        let frame_interval = Duration::from_secs_f64(1.0 / fps as f64);

        while self.running.load(Ordering::SeqCst) {
            let cycle_start = Instant::now();

            match self.pipeline.iterate(&mut self.source) {
                Ok(_) => {}
                Err(CastorError::Capture(_)) => {
                    // Display read failed — skip this cycle, retry on
                    // the next interval.
                    Self::pace(cycle_start, frame_interval).await;
                    continue;
                }
                Err(e) => {
                    self.running.store(false, Ordering::SeqCst);
                    return Err(e);
                }
            }

            let payload = self.pipeline.latest();
            let size = payload.size() as u64;
            if let Err(e) = self.sink.deliver(payload).await {
                self.running.store(false, Ordering::SeqCst);
                return match e {
                    // Sink gone means the session ended; not a fault.
                    CastorError::ChannelClosed => Ok(()),
                    other => Err(other),
                };
            }
            self.meter.record(size);

            Self::pace(cycle_start, frame_interval).await;
        }

        Ok(())
    }

    /// Sleep for the remainder of the frame interval.
    async fn pace(cycle_start: Instant, interval: Duration) {
        let elapsed = cycle_start.elapsed();
        if elapsed < interval {
            tokio::time::sleep(interval - elapsed).await;
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::PatternSource;
    use crate::frame::{FrameGeometry, PixelFormat};

    fn geo() -> FrameGeometry {
        FrameGeometry::new(16, 8, PixelFormat::Argb8).unwrap()
    }

    #[tokio::test]
    async fn delivers_payloads_until_stopped() {
        let (tx, mut rx) = mpsc::channel(16);
        let source = PatternSource::new(geo());
        let mut service = SenderService::with_config(
            source,
            Box::new(tx),
            SenderServiceConfig {
                target_fps: 60,
                compression_level: DEFAULT_LEVEL,
            },
        )
        .unwrap();

        let handle = service.stop_handle();
        let task = tokio::spawn(async move { service.run().await });

        let first = rx.recv().await.expect("first payload");
        assert!(!first.is_empty());
        let _ = rx.recv().await.expect("second payload");

        handle.store(false, Ordering::SeqCst);
        // Unblock a sender waiting on a full channel so it can observe
        // the stop flag.
        drop(rx);
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn closed_sink_ends_the_loop_cleanly() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let source = PatternSource::new(geo());
        let mut service = SenderService::new(source, Box::new(tx)).unwrap();
        // Receiver already gone: run() should end Ok, not error out.
        service.run().await.unwrap();
        assert!(!service.is_running());
    }
}
