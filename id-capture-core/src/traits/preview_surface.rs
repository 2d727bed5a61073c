use crate::traits::media_provider::MediaStream;

/// Where the live stream is rendered.
pub trait PreviewSurface: Send + Sync {
    /// Show `stream`; replaces anything previously attached.
    fn attach(&self, stream: &dyn MediaStream);

    /// Remove the stream from the surface.
    fn detach(&self);
}

/// Surface for headless sessions: renders nothing.
pub struct DetachedSurface;

impl PreviewSurface for DetachedSurface {
    fn attach(&self, stream: &dyn MediaStream) {
        log::debug!("preview attached to {} (headless)", stream.device_id());
    }

    fn detach(&self) {}
}
