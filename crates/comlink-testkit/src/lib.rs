//! Scriptable fake platform implementations for tests.
//!
//! No network, no media: calls connect instantly, renderers are counters,
//! chat threads live in a HashMap. Failure injection is per operation and
//! stays armed until cleared, and every renderer/view carries shared
//! accounting so tests can assert acquire/dispose balance.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use uuid::Uuid;

use comlink_core::credential::TokenCredential;
use comlink_core::events::{CallState, SurfaceId};
use comlink_core::platform::{
    AgentEvent, CallAgent, CallHandle, CallOptions, CallPlatform, CameraDevice, ChatClient,
    ChatMessageItem, ChatPlatform, ChatThreadClient, IncomingCall, LocalStream, PlatformError,
    RemoteParticipant, RemoteStream, StreamSource, ThreadInfo, VideoRenderer, VideoSurface,
};

/// Shared renderer/view accounting.
#[derive(Default)]
struct RenderStats {
    renderers_created: AtomicUsize,
    renderers_disposed: AtomicUsize,
    views_unmounted: AtomicUsize,
    next_surface: AtomicU64,
}

#[derive(Default)]
struct CallScript {
    cameras: Vec<CameraDevice>,
    seed_participants: Vec<Arc<FakeRemoteParticipant>>,
    fail_create_agent: Option<String>,
    fail_list_cameras: Option<String>,
    fail_create_stream: Option<String>,
    fail_local_renderer: Option<String>,
    fail_renderer_streams: HashSet<i32>,
    fail_start_call: Option<String>,
    fail_join_call: Option<String>,
    fail_hang_up: Option<String>,
    fail_mute: Option<String>,
    fail_unmute: Option<String>,
    fail_start_video: Option<String>,
    fail_stop_video: Option<String>,
    fail_switch_source: Option<String>,
    events: Option<UnboundedSender<AgentEvent>>,
    switch_history: Vec<String>,
    start_attempts: usize,
    join_attempts: usize,
}

/// Fake calling platform.
pub struct FakeCallPlatform {
    script: Arc<Mutex<CallScript>>,
    stats: Arc<RenderStats>,
}

impl FakeCallPlatform {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(CallScript::default())),
            stats: Arc::new(RenderStats::default()),
        }
    }

    pub fn set_cameras(&self, cameras: Vec<CameraDevice>) {
        self.script.lock().unwrap().cameras = cameras;
    }

    /// Participant present on the next started/joined/accepted call.
    pub fn seed_participant(&self, participant: Arc<FakeRemoteParticipant>) {
        self.script.lock().unwrap().seed_participants.push(participant);
    }

    /// Push a platform event at the coordinator. Panics if no agent exists.
    pub fn emit(&self, event: AgentEvent) {
        let script = self.script.lock().unwrap();
        let sender = script.events.as_ref().expect("no agent created yet");
        sender.send(event).expect("event loop receiver dropped");
    }

    pub fn fail_create_agent(&self, message: &str) {
        self.script.lock().unwrap().fail_create_agent = Some(message.into());
    }

    pub fn fail_list_cameras(&self, message: &str) {
        self.script.lock().unwrap().fail_list_cameras = Some(message.into());
    }

    pub fn fail_create_stream(&self, message: &str) {
        self.script.lock().unwrap().fail_create_stream = Some(message.into());
    }

    pub fn fail_local_renderer(&self, message: &str) {
        self.script.lock().unwrap().fail_local_renderer = Some(message.into());
    }

    /// Renderer construction fails for this remote stream id.
    pub fn fail_renderer_for(&self, stream_id: i32) {
        self.script.lock().unwrap().fail_renderer_streams.insert(stream_id);
    }

    pub fn fail_start_call(&self, message: &str) {
        self.script.lock().unwrap().fail_start_call = Some(message.into());
    }

    pub fn fail_join_call(&self, message: &str) {
        self.script.lock().unwrap().fail_join_call = Some(message.into());
    }

    pub fn fail_hang_up(&self, message: &str) {
        self.script.lock().unwrap().fail_hang_up = Some(message.into());
    }

    pub fn clear_fail_hang_up(&self) {
        self.script.lock().unwrap().fail_hang_up = None;
    }

    pub fn fail_mute(&self, message: &str) {
        self.script.lock().unwrap().fail_mute = Some(message.into());
    }

    pub fn fail_unmute(&self, message: &str) {
        self.script.lock().unwrap().fail_unmute = Some(message.into());
    }

    pub fn fail_start_video(&self, message: &str) {
        self.script.lock().unwrap().fail_start_video = Some(message.into());
    }

    pub fn fail_stop_video(&self, message: &str) {
        self.script.lock().unwrap().fail_stop_video = Some(message.into());
    }

    pub fn fail_switch_source(&self, message: &str) {
        self.script.lock().unwrap().fail_switch_source = Some(message.into());
    }

    /// Camera ids in the order switch_source selected them.
    pub fn switch_history(&self) -> Vec<String> {
        self.script.lock().unwrap().switch_history.clone()
    }

    pub fn start_attempts(&self) -> usize {
        self.script.lock().unwrap().start_attempts
    }

    pub fn join_attempts(&self) -> usize {
        self.script.lock().unwrap().join_attempts
    }

    pub fn renderers_created(&self) -> usize {
        self.stats.renderers_created.load(Ordering::SeqCst)
    }

    pub fn renderers_disposed(&self) -> usize {
        self.stats.renderers_disposed.load(Ordering::SeqCst)
    }

    pub fn views_unmounted(&self) -> usize {
        self.stats.views_unmounted.load(Ordering::SeqCst)
    }

    /// An incoming call that, when accepted, connects like start/join.
    pub fn make_incoming(&self, call_id: &str) -> Arc<FakeIncomingCall> {
        Arc::new(FakeIncomingCall {
            id: call_id.to_string(),
            script: self.script.clone(),
        })
    }
}

impl Default for FakeCallPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CallPlatform for FakeCallPlatform {
    async fn create_agent(
        &self,
        _credential: &TokenCredential,
    ) -> Result<(Arc<dyn CallAgent>, UnboundedReceiver<AgentEvent>), PlatformError> {
        let mut script = self.script.lock().unwrap();
        if let Some(message) = &script.fail_create_agent {
            return Err(PlatformError::new(message));
        }
        let (sender, receiver) = unbounded_channel();
        script.events = Some(sender);
        let agent = Arc::new(FakeCallAgent { script: self.script.clone() });
        Ok((agent, receiver))
    }

    async fn list_cameras(&self) -> Result<Vec<CameraDevice>, PlatformError> {
        let script = self.script.lock().unwrap();
        if let Some(message) = &script.fail_list_cameras {
            return Err(PlatformError::new(message));
        }
        Ok(script.cameras.clone())
    }

    async fn create_local_stream(
        &self,
        camera: &CameraDevice,
    ) -> Result<Arc<dyn LocalStream>, PlatformError> {
        let script = self.script.lock().unwrap();
        if let Some(message) = &script.fail_create_stream {
            return Err(PlatformError::new(message));
        }
        Ok(Arc::new(FakeLocalStream {
            camera: Mutex::new(camera.clone()),
            script: self.script.clone(),
        }))
    }

    async fn create_renderer(
        &self,
        source: &StreamSource,
    ) -> Result<Box<dyn VideoRenderer>, PlatformError> {
        let script = self.script.lock().unwrap();
        match source {
            StreamSource::Local(_) => {
                if let Some(message) = &script.fail_local_renderer {
                    return Err(PlatformError::new(message));
                }
            }
            StreamSource::Remote(stream) => {
                if script.fail_renderer_streams.contains(&stream.id()) {
                    return Err(PlatformError::new("renderer construction failed"));
                }
            }
        }
        self.stats.renderers_created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeRenderer {
            stats: self.stats.clone(),
            disposed: AtomicBool::new(false),
        }))
    }
}

struct FakeCallAgent {
    script: Arc<Mutex<CallScript>>,
}

impl FakeCallAgent {
    fn connect(&self) -> Arc<dyn CallHandle> {
        let mut script = self.script.lock().unwrap();
        let participants: Vec<Arc<dyn RemoteParticipant>> = script
            .seed_participants
            .drain(..)
            .map(|p| p as Arc<dyn RemoteParticipant>)
            .collect();
        Arc::new(FakeCallHandle {
            id: Uuid::new_v4().to_string(),
            state: Mutex::new(CallState::Connecting),
            participants: Mutex::new(participants),
            script: self.script.clone(),
        })
    }
}

#[async_trait]
impl CallAgent for FakeCallAgent {
    async fn start_call(
        &self,
        _participants: &[String],
        _options: &CallOptions,
    ) -> Result<Arc<dyn CallHandle>, PlatformError> {
        {
            let mut script = self.script.lock().unwrap();
            script.start_attempts += 1;
            if let Some(message) = &script.fail_start_call {
                return Err(PlatformError::new(message));
            }
        }
        Ok(self.connect())
    }

    async fn join_call(
        &self,
        _group_call_id: Uuid,
        _options: &CallOptions,
    ) -> Result<Arc<dyn CallHandle>, PlatformError> {
        {
            let mut script = self.script.lock().unwrap();
            script.join_attempts += 1;
            if let Some(message) = &script.fail_join_call {
                return Err(PlatformError::new(message));
            }
        }
        Ok(self.connect())
    }
}

pub struct FakeCallHandle {
    id: String,
    state: Mutex<CallState>,
    participants: Mutex<Vec<Arc<dyn RemoteParticipant>>>,
    script: Arc<Mutex<CallScript>>,
}

impl FakeCallHandle {
    fn fail(&self, pick: fn(&CallScript) -> &Option<String>) -> Result<(), PlatformError> {
        let script = self.script.lock().unwrap();
        match pick(&script) {
            Some(message) => Err(PlatformError::new(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CallHandle for FakeCallHandle {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn state(&self) -> CallState {
        *self.state.lock().unwrap()
    }

    fn remote_participants(&self) -> Vec<Arc<dyn RemoteParticipant>> {
        self.participants.lock().unwrap().clone()
    }

    async fn hang_up(&self) -> Result<(), PlatformError> {
        self.fail(|s| &s.fail_hang_up)?;
        *self.state.lock().unwrap() = CallState::Disconnected;
        Ok(())
    }

    async fn mute_outgoing_audio(&self) -> Result<(), PlatformError> {
        self.fail(|s| &s.fail_mute)
    }

    async fn unmute_outgoing_audio(&self) -> Result<(), PlatformError> {
        self.fail(|s| &s.fail_unmute)
    }

    async fn start_video(&self, _stream: &Arc<dyn LocalStream>) -> Result<(), PlatformError> {
        self.fail(|s| &s.fail_start_video)
    }

    async fn stop_video(&self, _stream: &Arc<dyn LocalStream>) -> Result<(), PlatformError> {
        self.fail(|s| &s.fail_stop_video)
    }
}

pub struct FakeIncomingCall {
    id: String,
    script: Arc<Mutex<CallScript>>,
}

#[async_trait]
impl IncomingCall for FakeIncomingCall {
    fn id(&self) -> String {
        self.id.clone()
    }

    async fn accept(&self, _options: &CallOptions) -> Result<Arc<dyn CallHandle>, PlatformError> {
        let agent = FakeCallAgent { script: self.script.clone() };
        Ok(agent.connect())
    }
}

pub struct FakeRemoteParticipant {
    id: String,
    streams: Mutex<Vec<Arc<dyn RemoteStream>>>,
}

impl RemoteParticipant for FakeRemoteParticipant {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn video_streams(&self) -> Vec<Arc<dyn RemoteStream>> {
        self.streams.lock().unwrap().clone()
    }
}

struct FakeRemoteStream {
    id: i32,
}

impl RemoteStream for FakeRemoteStream {
    fn id(&self) -> i32 {
        self.id
    }
}

pub struct FakeLocalStream {
    camera: Mutex<CameraDevice>,
    script: Arc<Mutex<CallScript>>,
}

#[async_trait]
impl LocalStream for FakeLocalStream {
    fn camera(&self) -> CameraDevice {
        self.camera.lock().unwrap().clone()
    }

    async fn switch_source(&self, camera: &CameraDevice) -> Result<(), PlatformError> {
        let mut script = self.script.lock().unwrap();
        if let Some(message) = &script.fail_switch_source {
            return Err(PlatformError::new(message));
        }
        script.switch_history.push(camera.id.clone());
        drop(script);
        *self.camera.lock().unwrap() = camera.clone();
        Ok(())
    }
}

struct FakeRenderer {
    stats: Arc<RenderStats>,
    disposed: AtomicBool,
}

impl VideoRenderer for FakeRenderer {
    fn create_view(&self) -> Result<Box<dyn VideoSurface>, PlatformError> {
        let id = self.stats.next_surface.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Box::new(FakeSurface {
            id,
            stats: self.stats.clone(),
            unmounted: AtomicBool::new(false),
        }))
    }

    fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::SeqCst) {
            self.stats.renderers_disposed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

struct FakeSurface {
    id: SurfaceId,
    stats: Arc<RenderStats>,
    unmounted: AtomicBool,
}

impl VideoSurface for FakeSurface {
    fn surface_id(&self) -> SurfaceId {
        self.id
    }

    fn unmount(&self) {
        if !self.unmounted.swap(true, Ordering::SeqCst) {
            self.stats.views_unmounted.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Camera with a readable name derived from its id.
pub fn camera(id: &str) -> CameraDevice {
    CameraDevice { id: id.to_string(), name: format!("Camera {id}") }
}

/// Remote participant publishing the given stream ids.
pub fn participant(id: &str, stream_ids: &[i32]) -> Arc<FakeRemoteParticipant> {
    let streams = stream_ids
        .iter()
        .map(|&id| Arc::new(FakeRemoteStream { id }) as Arc<dyn RemoteStream>)
        .collect();
    Arc::new(FakeRemoteParticipant {
        id: id.to_string(),
        streams: Mutex::new(streams),
    })
}

/// A bare remote stream, for pushing VideoStreamsUpdated events.
pub fn remote_stream(id: i32) -> Arc<dyn RemoteStream> {
    Arc::new(FakeRemoteStream { id })
}

// ── Chat ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct ChatScript {
    fail_create_client: Option<String>,
    fail_create_thread: Option<String>,
    fail_thread_client: Option<String>,
    fail_send: Option<String>,
    fail_list: Option<String>,
    fail_typing: Option<String>,
    threads: HashMap<String, ThreadRecord>,
    typing_signals: usize,
}

struct ThreadRecord {
    topic: String,
    messages: Vec<ChatMessageItem>,
}

/// Fake chat platform. Threads and messages live in memory.
pub struct FakeChatPlatform {
    script: Arc<Mutex<ChatScript>>,
}

impl FakeChatPlatform {
    pub fn new() -> Self {
        Self { script: Arc::new(Mutex::new(ChatScript::default())) }
    }

    pub fn fail_create_client(&self, message: &str) {
        self.script.lock().unwrap().fail_create_client = Some(message.into());
    }

    pub fn fail_create_thread(&self, message: &str) {
        self.script.lock().unwrap().fail_create_thread = Some(message.into());
    }

    pub fn fail_thread_client(&self, message: &str) {
        self.script.lock().unwrap().fail_thread_client = Some(message.into());
    }

    pub fn fail_send(&self, message: &str) {
        self.script.lock().unwrap().fail_send = Some(message.into());
    }

    pub fn fail_list(&self, message: &str) {
        self.script.lock().unwrap().fail_list = Some(message.into());
    }

    pub fn fail_typing(&self, message: &str) {
        self.script.lock().unwrap().fail_typing = Some(message.into());
    }

    pub fn typing_signals(&self) -> usize {
        self.script.lock().unwrap().typing_signals
    }

    pub fn thread_topic(&self, thread_id: &str) -> Option<String> {
        self.script
            .lock()
            .unwrap()
            .threads
            .get(thread_id)
            .map(|t| t.topic.clone())
    }

    pub fn message_count(&self, thread_id: &str) -> usize {
        self.script
            .lock()
            .unwrap()
            .threads
            .get(thread_id)
            .map(|t| t.messages.len())
            .unwrap_or(0)
    }
}

impl Default for FakeChatPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatPlatform for FakeChatPlatform {
    async fn create_client(
        &self,
        _endpoint: &str,
        _credential: &TokenCredential,
    ) -> Result<Arc<dyn ChatClient>, PlatformError> {
        let script = self.script.lock().unwrap();
        if let Some(message) = &script.fail_create_client {
            return Err(PlatformError::new(message));
        }
        Ok(Arc::new(FakeChatClient { script: self.script.clone() }))
    }
}

struct FakeChatClient {
    script: Arc<Mutex<ChatScript>>,
}

#[async_trait]
impl ChatClient for FakeChatClient {
    async fn create_thread(
        &self,
        topic: &str,
        _participants: &[String],
    ) -> Result<ThreadInfo, PlatformError> {
        let mut script = self.script.lock().unwrap();
        if let Some(message) = &script.fail_create_thread {
            return Err(PlatformError::new(message));
        }
        let id = format!("19:{}@thread.v2", Uuid::new_v4().simple());
        script.threads.insert(
            id.clone(),
            ThreadRecord { topic: topic.to_string(), messages: Vec::new() },
        );
        Ok(ThreadInfo { id, topic: topic.to_string() })
    }

    fn thread_client(&self, thread_id: &str) -> Result<Arc<dyn ChatThreadClient>, PlatformError> {
        let script = self.script.lock().unwrap();
        if let Some(message) = &script.fail_thread_client {
            return Err(PlatformError::new(message));
        }
        Ok(Arc::new(FakeThreadClient {
            thread_id: thread_id.to_string(),
            script: self.script.clone(),
        }))
    }
}

struct FakeThreadClient {
    thread_id: String,
    script: Arc<Mutex<ChatScript>>,
}

#[async_trait]
impl ChatThreadClient for FakeThreadClient {
    fn thread_id(&self) -> String {
        self.thread_id.clone()
    }

    async fn send_message(&self, content: &str) -> Result<String, PlatformError> {
        let mut script = self.script.lock().unwrap();
        if let Some(message) = &script.fail_send {
            return Err(PlatformError::new(message));
        }
        let item = ChatMessageItem {
            id: Uuid::new_v4().to_string(),
            content: content.to_string(),
            sender_id: "8:acs:local-user".to_string(),
            sent_on: Utc::now(),
        };
        let id = item.id.clone();
        script
            .threads
            .entry(self.thread_id.clone())
            .or_insert_with(|| ThreadRecord { topic: String::new(), messages: Vec::new() })
            .messages
            .push(item);
        Ok(id)
    }

    async fn list_messages(&self, max_messages: u32) -> Result<Vec<ChatMessageItem>, PlatformError> {
        let script = self.script.lock().unwrap();
        if let Some(message) = &script.fail_list {
            return Err(PlatformError::new(message));
        }
        let messages = script
            .threads
            .get(&self.thread_id)
            .map(|t| {
                t.messages
                    .iter()
                    .rev()
                    .take(max_messages as usize)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(messages)
    }

    async fn send_typing(&self) -> Result<(), PlatformError> {
        let mut script = self.script.lock().unwrap();
        if let Some(message) = &script.fail_typing {
            return Err(PlatformError::new(message));
        }
        script.typing_signals += 1;
        Ok(())
    }
}
