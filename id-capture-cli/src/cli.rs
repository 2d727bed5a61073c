use std::path::PathBuf;

use clap::Parser;

/// Capture one identity document from a camera and print the recognized text.
#[derive(Debug, Parser, Clone)]
#[command(name = "id-capture")]
#[command(about = "Capture an ID card still from a V4L2 camera and run OCR on it")]
pub struct Args {
    /// Camera to use (device path, e.g. /dev/video2). Defaults to the first camera.
    #[arg(short, long)]
    pub device: Option<String>,

    /// Tesseract language code, overrides the configuration file.
    #[arg(short, long)]
    pub language: Option<String>,

    /// Path to the tesseract binary.
    #[arg(long)]
    pub tesseract: Option<PathBuf>,

    /// Delay between the preview going live and the capture.
    #[arg(long, default_value_t = 1500)]
    pub warmup_ms: u64,

    /// List available cameras and exit.
    #[arg(long)]
    pub list_devices: bool,

    /// JSON session configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Emit events and the final report as JSON.
    #[arg(long)]
    pub json: bool,
}
