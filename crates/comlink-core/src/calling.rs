use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::credential::TokenCredential;
use crate::errors::CallError;
use crate::events::{CallState, EventEmitter, SessionEvent, SessionEventListener, SurfaceId};
use crate::platform::{
    AgentEvent, CallAgent, CallHandle, CallOptions, CallPlatform, CameraDevice, IncomingCall,
    LocalStream, PlatformError, RemoteParticipant, RemoteStream,
};
use crate::video::VideoRegistry;

/// Identifier and state of a freshly started or joined call.
#[derive(Debug, Clone)]
pub struct CallInfo {
    pub id: String,
    pub state: CallState,
}

/// The single live call session and the resources it owns.
struct CallSession {
    handle: Arc<dyn CallHandle>,
    state: CallState,
    participants: Vec<String>,
}

#[derive(Default)]
struct CoordinatorState {
    credential: Option<TokenCredential>,
    agent: Option<Arc<dyn CallAgent>>,
    // Bumped on every initialize; event loops for superseded agents exit.
    agent_generation: u64,
    session: Option<CallSession>,
    incoming: Option<Arc<dyn IncomingCall>>,
    local_stream: Option<Arc<dyn LocalStream>>,
    current_camera: Option<CameraDevice>,
    registry: VideoRegistry,
}

/// Owns the call lifecycle state machine and the video resource registry.
///
/// At most one call session exists at a time. Everything that mutates
/// session state, the registry, or the camera selection runs behind one
/// mutex, held across platform awaits, so host commands and platform events
/// apply in a single serial order. Platform events arrive on the channel
/// returned at agent creation and are applied by a spawned event loop.
pub struct CallCoordinator {
    platform: Arc<dyn CallPlatform>,
    config: SessionConfig,
    emitter: EventEmitter,
    inner: Arc<Mutex<CoordinatorState>>,
}

impl CallCoordinator {
    pub fn new(platform: Arc<dyn CallPlatform>, config: SessionConfig) -> Self {
        Self {
            platform,
            config,
            emitter: EventEmitter::new(),
            inner: Arc::new(Mutex::new(CoordinatorState::default())),
        }
    }

    /// Register a listener for session events.
    pub fn add_listener(&self, listener: Arc<dyn SessionEventListener>) {
        self.emitter.add_listener(listener);
    }

    /// Build the credential and the platform call agent.
    ///
    /// Re-initialization replaces both, but is rejected while a call session
    /// is live: replacing the agent underneath an attached call would orphan
    /// resources the coordinator could no longer release.
    pub async fn initialize(&self, access_token: &str) -> Result<(), CallError> {
        let mut state = self.inner.lock().await;
        if state.session.is_some() {
            return Err(CallError::Initialization("a call session is active".into()));
        }

        let credential = TokenCredential::new(access_token)
            .map_err(|e| CallError::Initialization(e.to_string()))?;
        let (agent, events) = self
            .platform
            .create_agent(&credential)
            .await
            .map_err(|e| CallError::Initialization(e.to_string()))?;

        // Device enumeration is best effort; camera-less hosts still call.
        if let Err(e) = self.platform.list_cameras().await {
            tracing::warn!("device enumeration unavailable: {e}");
        }

        state.credential = Some(credential);
        state.agent = Some(agent);
        state.agent_generation += 1;
        let generation = state.agent_generation;
        drop(state);

        let platform = Arc::clone(&self.platform);
        let config = self.config.clone();
        let emitter = self.emitter.clone();
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            event_loop(events, generation, platform, config, emitter, inner).await;
        });

        tracing::info!("call agent initialized");
        Ok(())
    }

    /// Place an outgoing call. With video, the local preview stream is
    /// acquired first; a host with zero cameras proceeds without video.
    pub async fn start_call(
        &self,
        participants: &[String],
        with_video: bool,
    ) -> Result<CallInfo, CallError> {
        if participants.is_empty() {
            return Err(CallError::InvalidArgument("participants list is required".into()));
        }

        let mut state = self.inner.lock().await;
        let agent = state.agent.clone().ok_or(CallError::NotInitialized)?;

        if state.session.is_some() {
            teardown(&mut state);
        }

        let video = if with_video {
            acquire_preview(&mut state, &self.platform, &self.emitter)
                .await
                .map_err(|e| CallError::CallStart(e.to_string()))?
        } else {
            None
        };

        let options = CallOptions { video };
        let handle = agent
            .start_call(participants, &options)
            .await
            .map_err(|e| CallError::CallStart(e.to_string()))?;

        attach_session(&mut state, &self.platform, &self.emitter, handle.clone()).await;
        tracing::info!(call_id = %handle.id(), "call started");
        Ok(CallInfo { id: handle.id(), state: handle.state() })
    }

    /// Join a group call by locator. The id must parse as a UUID before any
    /// platform interaction happens.
    pub async fn join_call(
        &self,
        group_call_id: &str,
        with_video: bool,
    ) -> Result<CallInfo, CallError> {
        let group_id = Uuid::parse_str(group_call_id)
            .map_err(|_| CallError::InvalidArgument("valid group call id is required".into()))?;

        let mut state = self.inner.lock().await;
        let agent = state.agent.clone().ok_or(CallError::NotInitialized)?;

        if state.session.is_some() {
            teardown(&mut state);
        }

        let video = if with_video {
            acquire_preview(&mut state, &self.platform, &self.emitter)
                .await
                .map_err(|e| CallError::CallJoin(e.to_string()))?
        } else {
            None
        };

        let options = CallOptions { video };
        let handle = agent
            .join_call(group_id, &options)
            .await
            .map_err(|e| CallError::CallJoin(e.to_string()))?;

        attach_session(&mut state, &self.platform, &self.emitter, handle.clone()).await;
        tracing::info!(call_id = %handle.id(), "call joined");
        Ok(CallInfo { id: handle.id(), state: handle.state() })
    }

    /// Hang up and fully dispose the session. A failed hang-up leaves the
    /// session attached so the caller may retry.
    pub async fn end_call(&self) -> Result<(), CallError> {
        let mut state = self.inner.lock().await;
        let session = state.session.as_ref().ok_or(CallError::NoActiveCall)?;
        let call_id = session.handle.id();

        session
            .handle
            .hang_up()
            .await
            .map_err(|e| CallError::Hangup(e.to_string()))?;

        teardown(&mut state);
        self.emitter.emit(SessionEvent::CallEnded { call_id: call_id.clone() });
        tracing::info!(%call_id, "call ended");
        Ok(())
    }

    pub async fn set_muted(&self, muted: bool) -> Result<(), CallError> {
        let state = self.inner.lock().await;
        let session = state.session.as_ref().ok_or(CallError::NoActiveCall)?;
        if muted {
            session
                .handle
                .mute_outgoing_audio()
                .await
                .map_err(|e| CallError::Mute(e.to_string()))
        } else {
            session
                .handle
                .unmute_outgoing_audio()
                .await
                .map_err(|e| CallError::Unmute(e.to_string()))
        }
    }

    /// Acquire the local preview (camera lookup, stream, renderer) and, when
    /// a call is live, start sending it.
    pub async fn start_video(&self) -> Result<(), CallError> {
        let mut state = self.inner.lock().await;
        let stream = match acquire_preview(&mut state, &self.platform, &self.emitter).await {
            Ok(Some(stream)) => stream,
            Ok(None) => return Err(CallError::VideoUnavailable("no camera available".into())),
            Err(e) => return Err(CallError::VideoUnavailable(e.to_string())),
        };

        if let Some(session) = &state.session {
            session
                .handle
                .start_video(&stream)
                .await
                .map_err(|e| CallError::VideoStart(e.to_string()))?;
        }
        Ok(())
    }

    /// Stop sending video and release the preview. No active local stream
    /// is a successful no-op.
    pub async fn stop_video(&self) -> Result<(), CallError> {
        let mut state = self.inner.lock().await;
        let Some(stream) = state.local_stream.clone() else {
            return Ok(());
        };

        if let Some(session) = &state.session {
            session
                .handle
                .stop_video(&stream)
                .await
                .map_err(|e| CallError::VideoStop(e.to_string()))?;
        }

        state.local_stream = None;
        if state.registry.local_surface().is_some() {
            state.registry.release_local();
            self.emitter.emit(SessionEvent::LocalVideoStopped);
        }
        Ok(())
    }

    /// Advance the current camera circularly through the enumerated list.
    /// With nothing previously selected the base index is 0, so the first
    /// invocation selects index 1 (or stays on 0 with a single device).
    pub async fn switch_camera(&self) -> Result<(), CallError> {
        let mut state = self.inner.lock().await;
        let Some(stream) = state.local_stream.clone() else {
            return Err(CallError::VideoUnavailable("no active camera stream".into()));
        };

        let cameras = self
            .platform
            .list_cameras()
            .await
            .map_err(|e| CallError::SwitchCamera(e.to_string()))?;
        if cameras.is_empty() {
            return Err(CallError::VideoUnavailable("no cameras detected".into()));
        }

        let current_index = state
            .current_camera
            .as_ref()
            .and_then(|current| cameras.iter().position(|c| c.id == current.id))
            .unwrap_or(0);
        let next = &cameras[(current_index + 1) % cameras.len()];

        stream
            .switch_source(next)
            .await
            .map_err(|e| CallError::SwitchCamera(e.to_string()))?;
        tracing::info!(camera = %next.id, "camera switched");
        state.current_camera = Some(next.clone());
        Ok(())
    }

    /// Whether a credential and call agent are held.
    pub async fn is_initialized(&self) -> bool {
        let state = self.inner.lock().await;
        state.credential.is_some() && state.agent.is_some()
    }

    /// Current call state, or `None` when no session exists.
    pub async fn current_state(&self) -> CallState {
        let state = self.inner.lock().await;
        state.session.as_ref().map(|s| s.state).unwrap_or(CallState::None)
    }

    pub async fn call_id(&self) -> Option<String> {
        let state = self.inner.lock().await;
        state.session.as_ref().map(|s| s.handle.id())
    }

    /// Remote participant ids of the live session, in arrival order.
    pub async fn participant_ids(&self) -> Vec<String> {
        let state = self.inner.lock().await;
        state.session.as_ref().map(|s| s.participants.clone()).unwrap_or_default()
    }

    /// Mountable surface for a remote stream, if one is registered.
    pub async fn remote_surface(&self, stream_id: i32) -> Option<SurfaceId> {
        self.inner.lock().await.registry.remote_surface(stream_id)
    }

    pub async fn remote_stream_ids(&self) -> Vec<i32> {
        self.inner.lock().await.registry.remote_stream_ids()
    }

    pub async fn local_surface(&self) -> Option<SurfaceId> {
        self.inner.lock().await.registry.local_surface()
    }
}

/// Dispose the attached session and everything it owns: registry entries
/// first, then the session reference itself.
fn teardown(state: &mut CoordinatorState) {
    state.registry.clear();
    state.session = None;
    state.incoming = None;
    state.local_stream = None;
    state.current_camera = None;
}

/// Record the new session and seed the registry from participants already
/// present on the call.
async fn attach_session(
    state: &mut CoordinatorState,
    platform: &Arc<dyn CallPlatform>,
    emitter: &EventEmitter,
    handle: Arc<dyn CallHandle>,
) {
    let mut participant_ids = Vec::new();
    for participant in handle.remote_participants() {
        let pid = participant.id();
        emitter.emit(SessionEvent::ParticipantJoined { participant_id: pid.clone() });
        for stream in participant.video_streams() {
            subscribe_remote_stream(state, platform, emitter, &pid, stream).await;
        }
        participant_ids.push(pid);
    }

    let call_state = handle.state();
    state.session = Some(CallSession {
        handle,
        state: call_state,
        participants: participant_ids,
    });
}

/// Ensure the local stream and its preview registry entry exist.
/// Returns `None` when no camera can be enumerated.
async fn acquire_preview(
    state: &mut CoordinatorState,
    platform: &Arc<dyn CallPlatform>,
    emitter: &EventEmitter,
) -> Result<Option<Arc<dyn LocalStream>>, PlatformError> {
    let stream = match state.local_stream.clone() {
        Some(stream) => stream,
        None => {
            let cameras = platform.list_cameras().await?;
            let Some(camera) = cameras.first() else {
                tracing::info!("no cameras enumerated, continuing without video");
                return Ok(None);
            };
            let stream = platform.create_local_stream(camera).await?;
            state.current_camera = Some(camera.clone());
            state.local_stream = Some(stream.clone());
            stream
        }
    };

    if state.registry.local_surface().is_none() {
        let surface = state.registry.acquire_local(platform.as_ref(), stream.clone()).await?;
        emitter.emit(SessionEvent::LocalVideoStarted { surface });
    }
    Ok(Some(stream))
}

async fn subscribe_remote_stream(
    state: &mut CoordinatorState,
    platform: &Arc<dyn CallPlatform>,
    emitter: &EventEmitter,
    participant_id: &str,
    stream: Arc<dyn RemoteStream>,
) {
    let stream_id = stream.id();
    match state.registry.acquire_remote(platform.as_ref(), stream).await {
        Ok(surface) => emitter.emit(SessionEvent::RemoteVideoStarted {
            participant_id: participant_id.to_string(),
            stream_id,
            surface,
        }),
        // A failed remote render never takes down the call.
        Err(e) => tracing::warn!("renderer failed for remote stream {stream_id}: {e}"),
    }
}

fn release_remote_stream(state: &mut CoordinatorState, emitter: &EventEmitter, stream_id: i32) {
    if state.registry.remote_surface(stream_id).is_some() {
        state.registry.release_remote(stream_id);
        emitter.emit(SessionEvent::RemoteVideoStopped { stream_id });
    }
}

async fn event_loop(
    mut events: UnboundedReceiver<AgentEvent>,
    generation: u64,
    platform: Arc<dyn CallPlatform>,
    config: SessionConfig,
    emitter: EventEmitter,
    inner: Arc<Mutex<CoordinatorState>>,
) {
    while let Some(event) = events.recv().await {
        let mut state = inner.lock().await;
        if state.agent_generation != generation {
            tracing::debug!("agent superseded, event loop exiting");
            return;
        }

        match event {
            AgentEvent::IncomingCall(incoming) => {
                on_incoming_call(&mut state, &platform, &config, &emitter, incoming).await;
            }
            AgentEvent::StateChanged { call_id, state: new_state } => {
                on_state_changed(&mut state, &emitter, call_id, new_state);
            }
            AgentEvent::ParticipantsUpdated { call_id, added, removed } => {
                on_participants_updated(&mut state, &platform, &emitter, call_id, added, removed)
                    .await;
            }
            AgentEvent::VideoStreamsUpdated { call_id, participant_id, added, removed } => {
                on_video_streams_updated(
                    &mut state,
                    &platform,
                    &emitter,
                    call_id,
                    participant_id,
                    added,
                    removed,
                )
                .await;
            }
        }
    }
    tracing::info!("call event loop ended");
}

fn session_matches(state: &CoordinatorState, call_id: &str) -> bool {
    state.session.as_ref().is_some_and(|s| s.handle.id() == call_id)
}

fn on_state_changed(
    state: &mut CoordinatorState,
    emitter: &EventEmitter,
    call_id: String,
    new_state: CallState,
) {
    if !session_matches(state, &call_id) {
        tracing::debug!(%call_id, "discarding stale state change");
        return;
    }
    if let Some(session) = state.session.as_mut() {
        session.state = new_state;
    }
    emitter.emit(SessionEvent::CallStateChanged { call_id: call_id.clone(), state: new_state });

    if new_state.is_terminal() {
        tracing::info!(%call_id, "call disconnected, tearing down");
        teardown(state);
        emitter.emit(SessionEvent::CallEnded { call_id });
    }
}

async fn on_participants_updated(
    state: &mut CoordinatorState,
    platform: &Arc<dyn CallPlatform>,
    emitter: &EventEmitter,
    call_id: String,
    added: Vec<Arc<dyn RemoteParticipant>>,
    removed: Vec<Arc<dyn RemoteParticipant>>,
) {
    if !session_matches(state, &call_id) {
        tracing::debug!(%call_id, "discarding stale participants update");
        return;
    }

    for participant in added {
        let pid = participant.id();
        if let Some(session) = state.session.as_mut() {
            if !session.participants.contains(&pid) {
                session.participants.push(pid.clone());
            }
        }
        emitter.emit(SessionEvent::ParticipantJoined { participant_id: pid.clone() });
        for stream in participant.video_streams() {
            subscribe_remote_stream(state, platform, emitter, &pid, stream).await;
        }
    }

    for participant in removed {
        let pid = participant.id();
        for stream in participant.video_streams() {
            release_remote_stream(state, emitter, stream.id());
        }
        if let Some(session) = state.session.as_mut() {
            session.participants.retain(|p| p != &pid);
        }
        emitter.emit(SessionEvent::ParticipantLeft { participant_id: pid });
    }
}

async fn on_video_streams_updated(
    state: &mut CoordinatorState,
    platform: &Arc<dyn CallPlatform>,
    emitter: &EventEmitter,
    call_id: String,
    participant_id: String,
    added: Vec<Arc<dyn RemoteStream>>,
    removed: Vec<i32>,
) {
    if !session_matches(state, &call_id) {
        tracing::debug!(%call_id, "discarding stale video streams update");
        return;
    }

    for stream in added {
        subscribe_remote_stream(state, platform, emitter, &participant_id, stream).await;
    }
    for stream_id in removed {
        release_remote_stream(state, emitter, stream_id);
    }
}

async fn on_incoming_call(
    state: &mut CoordinatorState,
    platform: &Arc<dyn CallPlatform>,
    config: &SessionConfig,
    emitter: &EventEmitter,
    incoming: Arc<dyn IncomingCall>,
) {
    let call_id = incoming.id();
    emitter.emit(SessionEvent::IncomingCallReceived { call_id: call_id.clone() });
    state.incoming = Some(incoming);

    if !config.auto_accept_incoming {
        tracing::info!(%call_id, "incoming call held for host policy");
        return;
    }
    accept_incoming(state, platform, config, emitter).await;
}

/// Accept the pending incoming call: optional best-effort preview, then
/// attach the resulting session exactly like start/join.
async fn accept_incoming(
    state: &mut CoordinatorState,
    platform: &Arc<dyn CallPlatform>,
    config: &SessionConfig,
    emitter: &EventEmitter,
) {
    let Some(incoming) = state.incoming.take() else {
        return;
    };

    if state.session.is_some() {
        teardown(state);
    }

    let video = if config.preview_on_accept {
        match acquire_preview(state, platform, emitter).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!("preview unavailable for incoming call: {e}");
                None
            }
        }
    } else {
        None
    };

    let options = CallOptions { video };
    match incoming.accept(&options).await {
        Ok(handle) => {
            tracing::info!(call_id = %handle.id(), "incoming call accepted");
            attach_session(state, platform, emitter, handle).await;
        }
        Err(e) => tracing::warn!("incoming call accept failed: {e}"),
    }
}
