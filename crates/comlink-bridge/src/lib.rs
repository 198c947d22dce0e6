//! Host command boundary for the comlink core.
//!
//! Wraps the call coordinator and chat manager into a single dispatch
//! surface: string method + JSON arguments in, flat JSON value or a
//! structured `(code, message)` error out. Argument presence and types are
//! validated here, synchronously, before anything reaches a manager.

use std::sync::Arc;

use chrono::SecondsFormat;
use serde_json::{Value, json};
use thiserror::Error;

use comlink_core::platform::{CallPlatform, ChatPlatform};
use comlink_core::{CallCoordinator, CallError, ChatError, ChatManager, SessionConfig};

/// Error codes surfaced to hosts.
pub mod codes {
    pub const INVALID_ARGUMENT: &str = "INVALID_ARGUMENT";
    pub const NOT_INITIALIZED: &str = "NOT_INITIALIZED";
    pub const NOT_IMPLEMENTED: &str = "NOT_IMPLEMENTED";
    pub const INITIALIZATION_ERROR: &str = "INITIALIZATION_ERROR";
    pub const NO_ACTIVE_CALL: &str = "NO_ACTIVE_CALL";
    pub const CALL_START_FAILED: &str = "CALL_START_FAILED";
    pub const CALL_JOIN_FAILED: &str = "CALL_JOIN_FAILED";
    pub const HANGUP_FAILED: &str = "HANGUP_FAILED";
    pub const MUTE_FAILED: &str = "MUTE_FAILED";
    pub const UNMUTE_FAILED: &str = "UNMUTE_FAILED";
    pub const VIDEO_UNAVAILABLE: &str = "VIDEO_UNAVAILABLE";
    pub const VIDEO_START_FAILED: &str = "VIDEO_START_FAILED";
    pub const VIDEO_STOP_FAILED: &str = "VIDEO_STOP_FAILED";
    pub const SWITCH_CAMERA_FAILED: &str = "SWITCH_CAMERA_FAILED";
    pub const CREATE_THREAD_FAILED: &str = "CREATE_THREAD_FAILED";
    pub const JOIN_THREAD_FAILED: &str = "JOIN_THREAD_FAILED";
    pub const SEND_MESSAGE_FAILED: &str = "SEND_MESSAGE_FAILED";
    pub const GET_MESSAGES_FAILED: &str = "GET_MESSAGES_FAILED";
    pub const TYPING_NOTIFICATION_FAILED: &str = "TYPING_NOTIFICATION_FAILED";
}

/// Structured command failure: a stable code plus a human-readable message.
/// Platform failure text passes through verbatim.
#[derive(Debug, Clone, Error)]
#[error("{code}: {message}")]
pub struct CommandError {
    pub code: &'static str,
    pub message: String,
}

impl CommandError {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

/// Initialize tracing. Call once from the host before dispatching commands.
pub fn init_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "comlink_core=info,comlink_bridge=info".parse().unwrap()),
            )
            .with_ansi(false)
            .init();
    });
}

/// Dispatches host commands onto the call coordinator and chat manager.
pub struct CommandBridge {
    calling: CallCoordinator,
    chat: ChatManager,
}

impl CommandBridge {
    pub fn new(
        call_platform: Arc<dyn CallPlatform>,
        chat_platform: Arc<dyn ChatPlatform>,
        config: SessionConfig,
    ) -> Self {
        Self {
            calling: CallCoordinator::new(call_platform, config.clone()),
            chat: ChatManager::new(chat_platform, config),
        }
    }

    /// The coordinator, for host event listener registration and queries.
    pub fn calling(&self) -> &CallCoordinator {
        &self.calling
    }

    pub fn chat(&self) -> &ChatManager {
        &self.chat
    }

    pub async fn dispatch(&self, method: &str, args: &Value) -> Result<Value, CommandError> {
        tracing::debug!(%method, "dispatching command");
        match method {
            "getPlatformVersion" => Ok(json!(format!("comlink {}", env!("CARGO_PKG_VERSION")))),

            "initializeIdentity" => {
                required_str(args, "connectionString", "Connection string")?;
                // Identity operations run server-side; acknowledge only.
                Ok(json!({"status": "initialized"}))
            }
            "createUser" | "getToken" | "revokeToken" => Err(CommandError::new(
                codes::NOT_IMPLEMENTED,
                "Identity management should be implemented on your backend.",
            )),

            "initializeCalling" => {
                let token = required_str(args, "accessToken", "Access token")?;
                self.calling.initialize(token).await.map_err(call_error)?;
                Ok(json!({"status": "initialized"}))
            }
            "startCall" => {
                let participants = required_str_list(args, "participants", "Participants list")?;
                let with_video = optional_bool(args, "withVideo");
                let info = self
                    .calling
                    .start_call(&participants, with_video)
                    .await
                    .map_err(call_error)?;
                Ok(json!({"id": info.id, "state": info.state.as_str()}))
            }
            "joinCall" => {
                let group_call_id = required_str(args, "groupCallId", "Group call ID")?;
                let with_video = optional_bool(args, "withVideo");
                let info = self
                    .calling
                    .join_call(group_call_id, with_video)
                    .await
                    .map_err(call_error)?;
                Ok(json!({"id": info.id, "state": info.state.as_str()}))
            }
            "endCall" => {
                self.calling.end_call().await.map_err(call_error)?;
                Ok(Value::Null)
            }
            "muteAudio" => {
                self.calling.set_muted(true).await.map_err(call_error)?;
                Ok(Value::Null)
            }
            "unmuteAudio" => {
                self.calling.set_muted(false).await.map_err(call_error)?;
                Ok(Value::Null)
            }
            "startVideo" => {
                self.calling.start_video().await.map_err(call_error)?;
                Ok(Value::Null)
            }
            "stopVideo" => {
                self.calling.stop_video().await.map_err(call_error)?;
                Ok(Value::Null)
            }
            "switchCamera" => {
                self.calling.switch_camera().await.map_err(call_error)?;
                Ok(Value::Null)
            }
            "getCallState" => Ok(json!(self.calling.current_state().await.as_str())),

            "initializeChat" => {
                let token = non_empty_str(args, "accessToken");
                let endpoint = non_empty_str(args, "endpoint");
                let (Some(token), Some(endpoint)) = (token, endpoint) else {
                    return Err(CommandError::new(
                        codes::INVALID_ARGUMENT,
                        "Access token and endpoint are required",
                    ));
                };
                self.chat.initialize(token, endpoint).await.map_err(chat_error)?;
                Ok(json!({"status": "initialized"}))
            }
            "createChatThread" => {
                let topic = required_str(args, "topic", "Topic")?;
                let participants = optional_str_list(args, "participants")?;
                let thread = self
                    .chat
                    .create_thread(topic, &participants)
                    .await
                    .map_err(chat_error)?;
                Ok(json!({"threadId": thread.id, "topic": thread.topic}))
            }
            "joinChatThread" => {
                let thread_id = required_str(args, "threadId", "Thread ID")?;
                self.chat.join_thread(thread_id).await.map_err(chat_error)?;
                Ok(json!({"id": thread_id, "status": "joined"}))
            }
            "sendMessage" => {
                let thread_id = non_empty_str(args, "threadId");
                let content = non_empty_str(args, "content");
                let (Some(thread_id), Some(content)) = (thread_id, content) else {
                    return Err(CommandError::new(
                        codes::INVALID_ARGUMENT,
                        "Thread ID and content are required",
                    ));
                };
                let message_id =
                    self.chat.send_message(thread_id, content).await.map_err(chat_error)?;
                Ok(Value::String(message_id))
            }
            "getMessages" => {
                let thread_id = required_str(args, "threadId", "Thread ID")?;
                let max_messages = args.get("maxMessages").and_then(Value::as_u64).map(|n| n as u32);
                let items = self
                    .chat
                    .list_messages(thread_id, max_messages)
                    .await
                    .map_err(chat_error)?;
                let messages: Vec<Value> = items
                    .iter()
                    .map(|m| {
                        json!({
                            "id": m.id,
                            "content": m.content,
                            "senderId": m.sender_id,
                            "sentOn": m.sent_on.to_rfc3339_opts(SecondsFormat::Millis, true),
                        })
                    })
                    .collect();
                Ok(Value::Array(messages))
            }
            "sendTypingNotification" => match self.chat.send_typing().await {
                Ok(()) => Ok(Value::Null),
                Err(ChatError::NotInitialized) => Err(CommandError::new(
                    codes::NOT_INITIALIZED,
                    "Chat thread client not initialized. Join a thread first.",
                )),
                Err(e) => Err(chat_error(e)),
            },

            other => Err(CommandError::new(
                codes::NOT_IMPLEMENTED,
                format!("no handler for method '{other}'"),
            )),
        }
    }
}

fn non_empty_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn required_str<'a>(args: &'a Value, key: &str, what: &str) -> Result<&'a str, CommandError> {
    non_empty_str(args, key)
        .ok_or_else(|| CommandError::new(codes::INVALID_ARGUMENT, format!("{what} is required")))
}

fn required_str_list(args: &Value, key: &str, what: &str) -> Result<Vec<String>, CommandError> {
    let Some(list) = args.get(key).and_then(Value::as_array) else {
        return Err(CommandError::new(codes::INVALID_ARGUMENT, format!("{what} is required")));
    };
    list.iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| {
            CommandError::new(codes::INVALID_ARGUMENT, format!("{what} must contain strings"))
        })
}

fn optional_str_list(args: &Value, key: &str) -> Result<Vec<String>, CommandError> {
    if args.get(key).is_none() || args.get(key) == Some(&Value::Null) {
        return Ok(Vec::new());
    }
    required_str_list(args, key, key)
}

fn optional_bool(args: &Value, key: &str) -> bool {
    args.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn call_error(err: CallError) -> CommandError {
    let (code, message) = match err {
        CallError::NotInitialized => (
            codes::NOT_INITIALIZED,
            "Call agent not initialized. Call initializeCalling first.".to_string(),
        ),
        CallError::NoActiveCall => (codes::NO_ACTIVE_CALL, "No active call".to_string()),
        CallError::InvalidArgument(m) => (codes::INVALID_ARGUMENT, m),
        CallError::Initialization(m) => (codes::INITIALIZATION_ERROR, m),
        CallError::CallStart(m) => (codes::CALL_START_FAILED, m),
        CallError::CallJoin(m) => (codes::CALL_JOIN_FAILED, m),
        CallError::Hangup(m) => (codes::HANGUP_FAILED, m),
        CallError::Mute(m) => (codes::MUTE_FAILED, m),
        CallError::Unmute(m) => (codes::UNMUTE_FAILED, m),
        CallError::VideoUnavailable(m) => (codes::VIDEO_UNAVAILABLE, m),
        CallError::VideoStart(m) => (codes::VIDEO_START_FAILED, m),
        CallError::VideoStop(m) => (codes::VIDEO_STOP_FAILED, m),
        CallError::SwitchCamera(m) => (codes::SWITCH_CAMERA_FAILED, m),
    };
    CommandError::new(code, message)
}

fn chat_error(err: ChatError) -> CommandError {
    let (code, message) = match err {
        ChatError::NotInitialized => (
            codes::NOT_INITIALIZED,
            "Chat client not initialized. Call initializeChat first.".to_string(),
        ),
        ChatError::InvalidArgument(m) => (codes::INVALID_ARGUMENT, m),
        ChatError::Initialization(m) => (codes::INITIALIZATION_ERROR, m),
        ChatError::CreateThread(m) => (codes::CREATE_THREAD_FAILED, m),
        ChatError::JoinThread(m) => (codes::JOIN_THREAD_FAILED, m),
        ChatError::SendMessage(m) => (codes::SEND_MESSAGE_FAILED, m),
        ChatError::GetMessages(m) => (codes::GET_MESSAGES_FAILED, m),
        ChatError::Typing(m) => (codes::TYPING_NOTIFICATION_FAILED, m),
    };
    CommandError::new(code, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_failure_text_passes_through_verbatim() {
        let err = call_error(CallError::Hangup("peer vanished".into()));
        assert_eq!(err.code, codes::HANGUP_FAILED);
        assert_eq!(err.message, "peer vanished");
    }

    #[test]
    fn precondition_errors_have_guidance_messages() {
        let err = call_error(CallError::NotInitialized);
        assert_eq!(err.code, codes::NOT_INITIALIZED);
        assert!(err.message.contains("initializeCalling"));

        let err = chat_error(ChatError::NotInitialized);
        assert_eq!(err.code, codes::NOT_INITIALIZED);
        assert!(err.message.contains("initializeChat"));
    }

    #[test]
    fn missing_required_argument_is_invalid_argument() {
        let err = required_str(&json!({}), "accessToken", "Access token").unwrap_err();
        assert_eq!(err.code, codes::INVALID_ARGUMENT);
        assert_eq!(err.message, "Access token is required");
    }

    #[test]
    fn str_list_rejects_mixed_types() {
        let args = json!({"participants": ["user:1", 7]});
        let err = required_str_list(&args, "participants", "Participants list").unwrap_err();
        assert_eq!(err.code, codes::INVALID_ARGUMENT);
    }
}
