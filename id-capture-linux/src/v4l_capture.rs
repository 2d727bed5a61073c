//! V4L2 live video stream.
//!
//! Opens a capture node, negotiates YUYV (falling back to MJPEG) and streams
//! through memory-mapped buffers on a dedicated thread. Each buffer is
//! converted to RGB8 and replaces the previous frame; only the latest frame
//! is kept.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::oneshot;
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

use id_capture_core::models::error::CaptureError;
use id_capture_core::models::frame::RawFrame;
use id_capture_core::traits::media_provider::MediaStream;

const BUFFER_COUNT: u32 = 4;
/// Upper bound on a blocking dequeue, so `stop` is noticed even when the
/// camera has stopped delivering.
const DEQUEUE_TIMEOUT: Duration = Duration::from_millis(250);

/// Pixel layouts the capture thread can convert to RGB8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    Yuyv,
    Mjpeg,
}

impl PixelLayout {
    fn fourcc(self) -> FourCC {
        match self {
            PixelLayout::Yuyv => FourCC::new(b"YUYV"),
            PixelLayout::Mjpeg => FourCC::new(b"MJPG"),
        }
    }

    fn from_fourcc(fourcc: FourCC) -> Option<Self> {
        [PixelLayout::Yuyv, PixelLayout::Mjpeg]
            .into_iter()
            .find(|layout| layout.fourcc() == fourcc)
    }
}

/// Negotiated stream format, reported once streaming has started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
}

#[derive(Debug, Error)]
enum StreamSetupError {
    #[error("cannot open {path}: {source}")]
    Open { path: String, source: io::Error },
    #[error("{path} offers neither YUYV nor MJPEG (current format {fourcc})")]
    UnsupportedFormat { path: String, fourcc: String },
    #[error("format negotiation failed on {path}: {source}")]
    Format { path: String, source: io::Error },
    #[error("failed to start streaming on {path}: {source}")]
    Stream { path: String, source: io::Error },
}

impl From<StreamSetupError> for CaptureError {
    fn from(e: StreamSetupError) -> Self {
        match &e {
            StreamSetupError::Open { source, .. }
                if source.kind() == io::ErrorKind::PermissionDenied =>
            {
                CaptureError::PermissionDenied
            }
            _ => CaptureError::DeviceUnavailable(e.to_string()),
        }
    }
}

/// Live stream on one V4L2 node.
///
/// Streaming starts in `open`; `play` only marks the stream as presented.
/// `stop` ends the capture thread and waits for it, which releases the node.
pub struct V4lStream {
    device_id: String,
    format: StreamFormat,
    running: Arc<AtomicBool>,
    latest: Arc<Mutex<Option<RawFrame>>>,
    capture_handle: Option<thread::JoinHandle<()>>,
    playing: bool,
}

impl V4lStream {
    /// Open `path` and start streaming. Resolves once the first buffers are
    /// queued or setup has failed.
    pub async fn open(path: &str) -> Result<Self, CaptureError> {
        let running = Arc::new(AtomicBool::new(true));
        let latest = Arc::new(Mutex::new(None));
        let (ready_tx, ready_rx) = oneshot::channel();

        let handle = {
            let running = Arc::clone(&running);
            let latest = Arc::clone(&latest);
            let path = path.to_string();
            thread::Builder::new()
                .name("v4l-capture".into())
                .spawn(move || {
                    capture_loop(&path, &running, &latest, ready_tx);
                    running.store(false, Ordering::SeqCst);
                })
                .map_err(|e| CaptureError::Unknown(format!("failed to spawn capture thread: {}", e)))?
        };

        let format = match ready_rx.await {
            Ok(Ok(format)) => format,
            Ok(Err(e)) => {
                let _ = handle.join();
                return Err(e.into());
            }
            Err(_) => {
                let _ = handle.join();
                return Err(CaptureError::DeviceUnavailable(format!(
                    "capture thread for {} exited during setup",
                    path
                )));
            }
        };

        log::info!(
            "streaming {} at {}x{} ({:?})",
            path,
            format.width,
            format.height,
            format.layout
        );

        Ok(Self {
            device_id: path.to_string(),
            format,
            running,
            latest,
            capture_handle: Some(handle),
            playing: false,
        })
    }
}

impl MediaStream for V4lStream {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn play(&mut self) -> Result<(), CaptureError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(CaptureError::DeviceUnavailable(format!(
                "{} stopped streaming",
                self.device_id
            )));
        }
        self.playing = true;
        Ok(())
    }

    fn current_frame(&self) -> Result<RawFrame, CaptureError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(CaptureError::DeviceUnavailable(format!(
                "{} stopped streaming",
                self.device_id
            )));
        }
        match self.latest.lock().clone() {
            Some(frame) => Ok(frame),
            None => {
                log::debug!(
                    "{} has not decoded a {}x{} frame yet",
                    self.device_id,
                    self.format.width,
                    self.format.height
                );
                Ok(RawFrame::new(0, 0, Vec::new()))
            }
        }
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.playing = false;
        if let Some(handle) = self.capture_handle.take() {
            if handle.join().is_err() {
                log::error!("capture thread for {} panicked", self.device_id);
            }
            log::debug!("released {}", self.device_id);
        }
    }

    fn is_live(&self) -> bool {
        self.playing && self.running.load(Ordering::SeqCst)
    }
}

impl Drop for V4lStream {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Capture loop running on a dedicated thread.
///
/// Sequence:
/// 1. Open the node
/// 2. Negotiate YUYV, else MJPEG
/// 3. Map buffers and report the format through `ready`
/// 4. Convert each dequeued buffer into the latest frame until stopped
fn capture_loop(
    path: &str,
    running: &AtomicBool,
    latest: &Mutex<Option<RawFrame>>,
    ready: oneshot::Sender<Result<StreamFormat, StreamSetupError>>,
) {
    let mut dev = match Device::with_path(path) {
        Ok(dev) => dev,
        Err(source) => {
            let _ = ready.send(Err(StreamSetupError::Open {
                path: path.to_string(),
                source,
            }));
            return;
        }
    };

    let format = match negotiate(&dev, path) {
        Ok(format) => format,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    let mut stream = match MmapStream::with_buffers(&mut dev, Type::VideoCapture, BUFFER_COUNT) {
        Ok(stream) => stream,
        Err(source) => {
            let _ = ready.send(Err(StreamSetupError::Stream {
                path: path.to_string(),
                source,
            }));
            return;
        }
    };

    stream.set_timeout(DEQUEUE_TIMEOUT);

    if ready.send(Ok(format)).is_err() {
        return;
    }

    let mut failures = 0u32;
    while running.load(Ordering::SeqCst) {
        match stream.next() {
            Ok((buf, meta)) => {
                let used = (meta.bytesused as usize).min(buf.len());
                let data = if used == 0 { buf } else { &buf[..used] };
                match decode(format, data) {
                    Ok(frame) => {
                        failures = 0;
                        *latest.lock() = Some(frame);
                    }
                    Err(e) => log::debug!("dropping frame {}: {}", meta.sequence, e),
                }
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                log::trace!("no frame from {} within {:?}", path, DEQUEUE_TIMEOUT);
            }
            Err(e) => {
                failures += 1;
                if failures % 30 == 1 {
                    log::warn!("failed to dequeue frame on {}: {}", path, e);
                }
                if e.kind() == io::ErrorKind::NotFound || failures >= 300 {
                    log::error!("{} is gone, ending capture", path);
                    break;
                }
                thread::sleep(Duration::from_millis(10));
            }
        }
    }

    log::debug!("capture loop on {} ended", path);
}

fn negotiate(dev: &Device, path: &str) -> Result<StreamFormat, StreamSetupError> {
    let format_error = |source| StreamSetupError::Format {
        path: path.to_string(),
        source,
    };

    let current = dev.format().map_err(format_error)?;
    for layout in [PixelLayout::Yuyv, PixelLayout::Mjpeg] {
        let mut wanted = current.clone();
        wanted.fourcc = layout.fourcc();
        match dev.set_format(&wanted) {
            Ok(actual) if PixelLayout::from_fourcc(actual.fourcc) == Some(layout) => {
                return Ok(StreamFormat {
                    width: actual.width,
                    height: actual.height,
                    layout,
                });
            }
            Ok(actual) => log::debug!("{} answered {} for {:?}", path, actual.fourcc, layout),
            Err(e) => log::debug!("{} rejected {:?}: {}", path, layout, e),
        }
    }

    Err(StreamSetupError::UnsupportedFormat {
        path: path.to_string(),
        fourcc: current.fourcc.to_string(),
    })
}

fn decode(format: StreamFormat, data: &[u8]) -> Result<RawFrame, String> {
    match format.layout {
        PixelLayout::Yuyv => yuyv_to_rgb(format.width, format.height, data),
        PixelLayout::Mjpeg => {
            let image = image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)
                .map_err(|e| e.to_string())?
                .to_rgb8();
            Ok(RawFrame::new(image.width(), image.height(), image.into_raw()))
        }
    }
}

/// Convert packed YUYV 4:2:2 to RGB8 (BT.601, limited range).
pub fn yuyv_to_rgb(width: u32, height: u32, data: &[u8]) -> Result<RawFrame, String> {
    let pixels = width as usize * height as usize;
    if pixels == 0 || width % 2 != 0 {
        return Err(format!("unsupported YUYV geometry {}x{}", width, height));
    }
    if data.len() < pixels * 2 {
        return Err(format!("short YUYV buffer: {} < {}", data.len(), pixels * 2));
    }

    let mut rgb = Vec::with_capacity(pixels * 3);
    for chunk in data[..pixels * 2].chunks_exact(4) {
        let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        rgb.extend_from_slice(&yuv_to_rgb(y0, u, v));
        rgb.extend_from_slice(&yuv_to_rgb(y1, u, v));
    }
    Ok(RawFrame::new(width, height, rgb))
}

fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = (y as i32 - 16).max(0) * 298;
    let d = u as i32 - 128;
    let e = v as i32 - 128;
    let clamp = |x: i32| ((x + 128) >> 8).clamp(0, 255) as u8;
    [
        clamp(c + 409 * e),
        clamp(c - 100 * d - 208 * e),
        clamp(c + 516 * d),
    ]
}
