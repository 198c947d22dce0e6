//! Capability traits the orchestration core consumes.
//!
//! One implementation exists per target platform SDK; the testkit provides a
//! fake one. The core never sees a concrete media engine: calls, streams,
//! renderers, and chat clients are all reached through these seams, and the
//! platform pushes everything asynchronous through a single [`AgentEvent`]
//! channel handed out at agent creation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

use crate::credential::TokenCredential;
use crate::events::{CallState, SurfaceId};

/// Failure reported by a platform binding, message preserved verbatim.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct PlatformError(pub String);

impl PlatformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// An enumerated camera. Ordinal position is the index in the list returned
/// by [`CallPlatform::list_cameras`]; the platform keeps that order stable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    pub id: String,
    pub name: String,
}

/// Options passed to start/join/accept.
#[derive(Default)]
pub struct CallOptions {
    /// Outgoing video stream to attach from the start, if any.
    pub video: Option<Arc<dyn LocalStream>>,
}

/// Source a renderer is constructed from.
#[derive(Clone)]
pub enum StreamSource {
    Local(Arc<dyn LocalStream>),
    Remote(Arc<dyn RemoteStream>),
}

/// Everything asynchronous the platform pushes at the session layer.
///
/// Delivered in platform order on the channel returned by
/// [`CallPlatform::create_agent`]; call-scoped events carry the call id so
/// stale deliveries for superseded sessions can be discarded.
pub enum AgentEvent {
    IncomingCall(Arc<dyn IncomingCall>),
    StateChanged {
        call_id: String,
        state: CallState,
    },
    ParticipantsUpdated {
        call_id: String,
        added: Vec<Arc<dyn RemoteParticipant>>,
        removed: Vec<Arc<dyn RemoteParticipant>>,
    },
    VideoStreamsUpdated {
        call_id: String,
        participant_id: String,
        added: Vec<Arc<dyn RemoteStream>>,
        removed: Vec<i32>,
    },
}

/// Entry point to the calling side of a platform binding.
#[async_trait]
pub trait CallPlatform: Send + Sync {
    /// Construct the call agent for a credential. The returned receiver is
    /// the agent's only event channel; it closes when the agent is dropped.
    async fn create_agent(
        &self,
        credential: &TokenCredential,
    ) -> Result<(Arc<dyn CallAgent>, UnboundedReceiver<AgentEvent>), PlatformError>;

    /// Enumerate cameras, order stable across calls.
    async fn list_cameras(&self) -> Result<Vec<CameraDevice>, PlatformError>;

    async fn create_local_stream(
        &self,
        camera: &CameraDevice,
    ) -> Result<Arc<dyn LocalStream>, PlatformError>;

    async fn create_renderer(
        &self,
        source: &StreamSource,
    ) -> Result<Box<dyn VideoRenderer>, PlatformError>;
}

#[async_trait]
pub trait CallAgent: Send + Sync {
    async fn start_call(
        &self,
        participants: &[String],
        options: &CallOptions,
    ) -> Result<Arc<dyn CallHandle>, PlatformError>;

    async fn join_call(
        &self,
        group_call_id: Uuid,
        options: &CallOptions,
    ) -> Result<Arc<dyn CallHandle>, PlatformError>;
}

/// A live call owned by the platform.
#[async_trait]
pub trait CallHandle: Send + Sync {
    fn id(&self) -> String;
    fn state(&self) -> CallState;
    fn remote_participants(&self) -> Vec<Arc<dyn RemoteParticipant>>;
    async fn hang_up(&self) -> Result<(), PlatformError>;
    async fn mute_outgoing_audio(&self) -> Result<(), PlatformError>;
    async fn unmute_outgoing_audio(&self) -> Result<(), PlatformError>;
    async fn start_video(&self, stream: &Arc<dyn LocalStream>) -> Result<(), PlatformError>;
    async fn stop_video(&self, stream: &Arc<dyn LocalStream>) -> Result<(), PlatformError>;
}

/// A pushed incoming call awaiting acceptance.
#[async_trait]
pub trait IncomingCall: Send + Sync {
    fn id(&self) -> String;
    async fn accept(&self, options: &CallOptions) -> Result<Arc<dyn CallHandle>, PlatformError>;
}

pub trait RemoteParticipant: Send + Sync {
    fn id(&self) -> String;
    /// Video streams the participant is publishing right now.
    fn video_streams(&self) -> Vec<Arc<dyn RemoteStream>>;
}

/// A remote video stream. Ids are platform-assigned and unique while the
/// stream is live; the platform may reuse an id after disposal.
pub trait RemoteStream: Send + Sync {
    fn id(&self) -> i32;
}

/// The local camera stream.
#[async_trait]
pub trait LocalStream: Send + Sync {
    fn camera(&self) -> CameraDevice;
    async fn switch_source(&self, camera: &CameraDevice) -> Result<(), PlatformError>;
}

/// A renderer constructed for one stream; disposed exactly once by the
/// video registry.
pub trait VideoRenderer: Send + Sync {
    fn create_view(&self) -> Result<Box<dyn VideoSurface>, PlatformError>;
    fn dispose(&self);
}

/// A mountable rendering surface derived from a renderer.
pub trait VideoSurface: Send + Sync {
    fn surface_id(&self) -> SurfaceId;
    fn unmount(&self);
}

/// Entry point to the chat side of a platform binding.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    async fn create_client(
        &self,
        endpoint: &str,
        credential: &TokenCredential,
    ) -> Result<Arc<dyn ChatClient>, PlatformError>;
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn create_thread(
        &self,
        topic: &str,
        participants: &[String],
    ) -> Result<ThreadInfo, PlatformError>;

    /// Construct a client scoped to one thread. Local construction, no
    /// network round trip.
    fn thread_client(&self, thread_id: &str) -> Result<Arc<dyn ChatThreadClient>, PlatformError>;
}

#[async_trait]
pub trait ChatThreadClient: Send + Sync {
    fn thread_id(&self) -> String;
    async fn send_message(&self, content: &str) -> Result<String, PlatformError>;
    async fn list_messages(&self, max_messages: u32) -> Result<Vec<ChatMessageItem>, PlatformError>;
    async fn send_typing(&self) -> Result<(), PlatformError>;
}

/// A chat thread as reported by the platform at creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadInfo {
    pub id: String,
    pub topic: String,
}

/// One message from a thread listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessageItem {
    pub id: String,
    pub content: String,
    pub sender_id: String,
    pub sent_on: DateTime<Utc>,
}
