//! castor — loopback mirror demo.
//!
//! Runs a complete sender→receiver session in one process: a synthetic
//! display source feeds the capture/diff/compress pipeline, payloads
//! cross an in-process channel standing in for the transport, and the
//! receiver reconstructs every frame by XOR-merge. When the requested
//! number of frames has been mirrored, the final reconstruction is
//! written out as a PNG.
//!
//! ```text
//! castor                         Run with defaults (90 frames)
//! castor --frames 300            Mirror 300 frames
//! castor --config <path>         Load a custom config TOML
//! castor --output shot.png       Override the PNG path
//! castor --gen-config            Write default config to stdout
//! ```

mod config;

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use castor_core::{
    FrameGeometry, PatternSource, PixelFormat, ReceiverClient, SenderService,
    SenderServiceConfig,
};

use crate::config::CliConfig;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "castor", about = "Mirror a synthetic display through the frame pipeline")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "castor.toml")]
    config: PathBuf,

    /// Number of frames to mirror before stopping.
    #[arg(short, long, default_value_t = 90)]
    frames: u64,

    /// Where to write the final reconstructed frame (overrides the
    /// config's output path).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&CliConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let config = CliConfig::load(&cli.config);

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("castor v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "session: {}x{} @ {} fps, zstd level {}",
        config.session.width,
        config.session.height,
        config.session.fps,
        config.encoder.compression_level
    );

    let geometry = FrameGeometry::new(
        config.session.width,
        config.session.height,
        PixelFormat::Argb8,
    )?;

    // Sender → channel → receiver, all in-process.
    let (tx, rx) = mpsc::channel(32);
    let mut service = SenderService::with_config(
        PatternSource::new(geometry),
        Box::new(tx),
        SenderServiceConfig {
            target_fps: config.session.fps,
            compression_level: config.encoder.compression_level,
        },
    )?;
    let mut client = ReceiverClient::new(geometry, rx)?;

    let service_stop = service.stop_handle();
    let mut stats_rx = client.stats_receiver();
    let frame_rx = client.frame_receiver();

    let service_task = tokio::spawn(async move { service.run().await });
    let client_task = tokio::spawn(async move { client.run().await });

    // Watch the mirror until the requested frame count is reached.
    let mut last_logged = 0u64;
    loop {
        if stats_rx.changed().await.is_err() {
            warn!("receiver ended before the frame target was reached");
            break;
        }
        let stats = stats_rx.borrow().clone();
        if stats.total_frames >= last_logged + 50 {
            last_logged = stats.total_frames;
            info!(
                "mirrored {} frames, {:.1} fps, {} KiB compressed",
                stats.total_frames,
                stats.fps,
                stats.total_bytes / 1024
            );
        }
        if stats.total_frames >= cli.frames {
            break;
        }
    }

    // Stop producing; the closing channel winds the client down once
    // it has drained what is in flight.
    service_stop.store(false, Ordering::SeqCst);
    service_task.await??;
    let client_result = tokio::time::timeout(Duration::from_secs(10), client_task).await?;
    client_result??;

    let stats = stats_rx.borrow().clone();
    let raw_bytes = stats.total_frames * geometry.byte_len() as u64;
    info!(
        "session complete: {} frames, {} bytes compressed ({} raw, {:.1}% of original)",
        stats.total_frames,
        stats.total_bytes,
        raw_bytes,
        100.0 * stats.total_bytes as f64 / raw_bytes.max(1) as f64
    );

    // Persist the final reconstruction.
    let png_path = cli
        .output
        .unwrap_or_else(|| PathBuf::from(&config.output.png_path));
    let frame = frame_rx.borrow().clone();
    if frame.is_empty() {
        warn!("no frame was mirrored; nothing to write");
        return Ok(());
    }

    let rgba = to_rgba(&frame, geometry.format());
    let img = image::RgbaImage::from_raw(geometry.width(), geometry.height(), rgba)
        .ok_or("reconstructed frame has the wrong byte length")?;
    img.save(&png_path)?;
    info!("wrote reconstruction to {}", png_path.display());

    Ok(())
}

/// Reorder 32-bit pixels into the RGBA layout PNG encoders expect.
fn to_rgba(frame: &[u8], format: PixelFormat) -> Vec<u8> {
    let mut out = Vec::with_capacity(frame.len());
    for px in frame.chunks_exact(4) {
        match format {
            PixelFormat::Argb8 => out.extend_from_slice(&[px[1], px[2], px[3], px[0]]),
            PixelFormat::Bgra8 => out.extend_from_slice(&[px[2], px[1], px[0], px[3]]),
        }
    }
    out
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba_swizzle_argb() {
        let argb = [0xAA, 0x11, 0x22, 0x33];
        assert_eq!(to_rgba(&argb, PixelFormat::Argb8), vec![0x11, 0x22, 0x33, 0xAA]);
    }

    #[test]
    fn rgba_swizzle_bgra() {
        let bgra = [0x33, 0x22, 0x11, 0xAA];
        assert_eq!(to_rgba(&bgra, PixelFormat::Bgra8), vec![0x11, 0x22, 0x33, 0xAA]);
    }
}
