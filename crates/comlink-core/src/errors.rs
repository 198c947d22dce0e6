use thiserror::Error;

/// Errors surfaced by the call session coordinator.
///
/// Precondition variants (`NotInitialized`, `NoActiveCall`, `InvalidArgument`)
/// are detected before any platform call is issued. The remaining variants
/// carry the platform's failure message verbatim and are never retried here.
#[derive(Debug, Clone, Error)]
pub enum CallError {
    #[error("call agent not initialized")]
    NotInitialized,
    #[error("no active call")]
    NoActiveCall,
    #[error("{0}")]
    InvalidArgument(String),
    #[error("initialization failed: {0}")]
    Initialization(String),
    #[error("call start failed: {0}")]
    CallStart(String),
    #[error("call join failed: {0}")]
    CallJoin(String),
    #[error("hang up failed: {0}")]
    Hangup(String),
    #[error("mute failed: {0}")]
    Mute(String),
    #[error("unmute failed: {0}")]
    Unmute(String),
    #[error("video unavailable: {0}")]
    VideoUnavailable(String),
    #[error("video start failed: {0}")]
    VideoStart(String),
    #[error("video stop failed: {0}")]
    VideoStop(String),
    #[error("switch camera failed: {0}")]
    SwitchCamera(String),
}

/// Errors surfaced by the messaging session manager.
#[derive(Debug, Clone, Error)]
pub enum ChatError {
    #[error("chat client not initialized")]
    NotInitialized,
    #[error("{0}")]
    InvalidArgument(String),
    #[error("initialization failed: {0}")]
    Initialization(String),
    #[error("create thread failed: {0}")]
    CreateThread(String),
    #[error("join thread failed: {0}")]
    JoinThread(String),
    #[error("send message failed: {0}")]
    SendMessage(String),
    #[error("get messages failed: {0}")]
    GetMessages(String),
    #[error("typing notification failed: {0}")]
    Typing(String),
}
