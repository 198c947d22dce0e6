use std::sync::Arc;

/// Handle identifying a mountable rendering surface owned by the registry.
pub type SurfaceId = u64;

/// Lifecycle state of the active call session.
///
/// Mirrors the platform's call state. States the platform reports that have
/// no mapping here surface as `Unknown`; callers must treat `Unknown` as
/// non-actionable rather than as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    None,
    Connecting,
    Ringing,
    Connected,
    LocalHold,
    RemoteHold,
    Disconnecting,
    Disconnected,
    EarlyMedia,
    Unknown,
}

impl CallState {
    /// The state vocabulary surfaced to hosts.
    pub fn as_str(self) -> &'static str {
        match self {
            CallState::None => "none",
            CallState::Connecting => "connecting",
            CallState::Ringing => "ringing",
            CallState::Connected => "connected",
            CallState::LocalHold => "onHold",
            CallState::RemoteHold => "remoteHold",
            CallState::Disconnecting => "disconnecting",
            CallState::Disconnected => "disconnected",
            CallState::EarlyMedia => "earlyMedia",
            CallState::Unknown => "unknown",
        }
    }

    /// A terminal state triggers full session teardown.
    pub fn is_terminal(self) -> bool {
        matches!(self, CallState::Disconnected)
    }
}

/// Events emitted by the core to host listeners.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    CallStateChanged { call_id: String, state: CallState },
    ParticipantJoined { participant_id: String },
    ParticipantLeft { participant_id: String },
    RemoteVideoStarted { participant_id: String, stream_id: i32, surface: SurfaceId },
    RemoteVideoStopped { stream_id: i32 },
    LocalVideoStarted { surface: SurfaceId },
    LocalVideoStopped,
    IncomingCallReceived { call_id: String },
    CallEnded { call_id: String },
}

/// Trait for receiving events from the core.
/// Implementations must be Send + Sync (called from tokio tasks).
pub trait SessionEventListener: Send + Sync {
    fn on_event(&self, event: SessionEvent);
}

/// Internal event emitter that dispatches to registered listeners.
#[derive(Clone)]
pub struct EventEmitter {
    listeners: Arc<std::sync::RwLock<Vec<Arc<dyn SessionEventListener>>>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(std::sync::RwLock::new(Vec::new())),
        }
    }

    pub fn add_listener(&self, listener: Arc<dyn SessionEventListener>) {
        self.listeners.write().unwrap().push(listener);
    }

    pub fn emit(&self, event: SessionEvent) {
        let listeners = self.listeners.read().unwrap();
        for listener in listeners.iter() {
            listener.on_event(event.clone());
        }
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingListener {
        count: Arc<AtomicUsize>,
    }

    impl SessionEventListener for CountingListener {
        fn on_event(&self, _event: SessionEvent) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn emitter_dispatches_to_all_listeners() {
        let emitter = EventEmitter::new();
        let count1 = Arc::new(AtomicUsize::new(0));
        let count2 = Arc::new(AtomicUsize::new(0));

        emitter.add_listener(Arc::new(CountingListener { count: count1.clone() }));
        emitter.add_listener(Arc::new(CountingListener { count: count2.clone() }));

        emitter.emit(SessionEvent::LocalVideoStopped);

        assert_eq!(count1.load(Ordering::SeqCst), 1);
        assert_eq!(count2.load(Ordering::SeqCst), 1);
    }

    struct EventCapture {
        events: Arc<std::sync::Mutex<Vec<SessionEvent>>>,
    }

    impl SessionEventListener for EventCapture {
        fn on_event(&self, event: SessionEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[test]
    fn emitter_delivers_event_payloads() {
        let emitter = EventEmitter::new();
        let events = Arc::new(std::sync::Mutex::new(Vec::new()));
        emitter.add_listener(Arc::new(EventCapture { events: events.clone() }));

        emitter.emit(SessionEvent::ParticipantLeft { participant_id: "user:1".into() });

        let captured = events.lock().unwrap();
        assert_eq!(captured.len(), 1);
        match &captured[0] {
            SessionEvent::ParticipantLeft { participant_id } => {
                assert_eq!(participant_id, "user:1");
            }
            other => panic!("expected ParticipantLeft, got {other:?}"),
        }
    }

    #[test]
    fn state_strings_match_host_vocabulary() {
        let expected = [
            (CallState::None, "none"),
            (CallState::Connecting, "connecting"),
            (CallState::Ringing, "ringing"),
            (CallState::Connected, "connected"),
            (CallState::LocalHold, "onHold"),
            (CallState::RemoteHold, "remoteHold"),
            (CallState::Disconnecting, "disconnecting"),
            (CallState::Disconnected, "disconnected"),
            (CallState::EarlyMedia, "earlyMedia"),
            (CallState::Unknown, "unknown"),
        ];
        for (state, s) in expected {
            assert_eq!(state.as_str(), s);
        }
    }

    #[test]
    fn only_disconnected_is_terminal() {
        assert!(CallState::Disconnected.is_terminal());
        assert!(!CallState::Disconnecting.is_terminal());
        assert!(!CallState::Connected.is_terminal());
        assert!(!CallState::Unknown.is_terminal());
    }
}
