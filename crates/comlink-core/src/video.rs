use std::collections::HashMap;
use std::sync::Arc;

use crate::events::SurfaceId;
use crate::platform::{
    CallPlatform, LocalStream, PlatformError, RemoteStream, StreamSource, VideoRenderer,
    VideoSurface,
};

struct StreamHolder {
    renderer: Box<dyn VideoRenderer>,
    view: Box<dyn VideoSurface>,
}

impl StreamHolder {
    fn dispose(self) {
        self.view.unmount();
        self.renderer.dispose();
    }
}

/// Keyed store of renderer + view pairs for live video streams.
///
/// A key is present if and only if a renderer has been created and not yet
/// disposed for that stream id. Remote streams are keyed by stream id; the
/// local preview lives in a singleton slot. Every acquire is paired with
/// exactly one dispose by the time the owning session goes away.
#[derive(Default)]
pub struct VideoRegistry {
    remote: HashMap<i32, StreamHolder>,
    local: Option<StreamHolder>,
}

impl VideoRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and store a renderer for a remote stream.
    ///
    /// Idempotent: an existing entry is returned untouched.
    pub async fn acquire_remote(
        &mut self,
        platform: &dyn CallPlatform,
        stream: Arc<dyn RemoteStream>,
    ) -> Result<SurfaceId, PlatformError> {
        let stream_id = stream.id();
        if let Some(existing) = self.remote.get(&stream_id) {
            return Ok(existing.view.surface_id());
        }

        let renderer = platform
            .create_renderer(&StreamSource::Remote(stream))
            .await?;
        let view = renderer.create_view()?;
        let surface = view.surface_id();

        tracing::debug!("remote renderer created for stream {stream_id}");
        self.remote.insert(stream_id, StreamHolder { renderer, view });
        Ok(surface)
    }

    /// Drop the entry for a remote stream: unmount the view, dispose the
    /// renderer. Missing entry is a no-op; calling twice is safe.
    pub fn release_remote(&mut self, stream_id: i32) {
        if let Some(holder) = self.remote.remove(&stream_id) {
            holder.dispose();
            tracing::debug!("remote renderer disposed for stream {stream_id}");
        }
    }

    /// Create and store the local preview renderer. Idempotent.
    pub async fn acquire_local(
        &mut self,
        platform: &dyn CallPlatform,
        stream: Arc<dyn LocalStream>,
    ) -> Result<SurfaceId, PlatformError> {
        if let Some(existing) = &self.local {
            return Ok(existing.view.surface_id());
        }

        let renderer = platform
            .create_renderer(&StreamSource::Local(stream))
            .await?;
        let view = renderer.create_view()?;
        let surface = view.surface_id();

        tracing::debug!("local preview renderer created");
        self.local = Some(StreamHolder { renderer, view });
        Ok(surface)
    }

    /// Drop the local preview entry, if any. Safe to call twice.
    pub fn release_local(&mut self) {
        if let Some(holder) = self.local.take() {
            holder.dispose();
            tracing::debug!("local preview renderer disposed");
        }
    }

    /// Release every entry. Used during full session teardown.
    pub fn clear(&mut self) {
        for (_, holder) in self.remote.drain() {
            holder.dispose();
        }
        self.release_local();
    }

    pub fn remote_surface(&self, stream_id: i32) -> Option<SurfaceId> {
        self.remote.get(&stream_id).map(|h| h.view.surface_id())
    }

    pub fn local_surface(&self) -> Option<SurfaceId> {
        self.local.as_ref().map(|h| h.view.surface_id())
    }

    pub fn remote_stream_ids(&self) -> Vec<i32> {
        self.remote.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.remote.is_empty() && self.local.is_none()
    }
}
