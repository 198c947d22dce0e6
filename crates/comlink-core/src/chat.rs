use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::SessionConfig;
use crate::credential::TokenCredential;
use crate::errors::ChatError;
use crate::platform::{ChatClient, ChatMessageItem, ChatPlatform, ChatThreadClient, ThreadInfo};

/// The joined thread. Distinct from the ad hoc per-thread clients used by
/// send/list: only the typing signal requires this binding.
struct ThreadBinding {
    thread_id: String,
    client: Arc<dyn ChatThreadClient>,
}

#[derive(Default)]
struct ChatState {
    credential: Option<TokenCredential>,
    client: Option<Arc<dyn ChatClient>>,
    joined: Option<ThreadBinding>,
}

/// Owns at most one chat-thread binding and issues thread-scoped operations.
pub struct ChatManager {
    platform: Arc<dyn ChatPlatform>,
    config: SessionConfig,
    inner: Arc<Mutex<ChatState>>,
}

impl ChatManager {
    pub fn new(platform: Arc<dyn ChatPlatform>, config: SessionConfig) -> Self {
        Self {
            platform,
            config,
            inner: Arc::new(Mutex::new(ChatState::default())),
        }
    }

    /// Build the credential and a chat client bound to the endpoint.
    /// Re-initialization replaces both; any thread binding is dropped.
    pub async fn initialize(&self, access_token: &str, endpoint: &str) -> Result<(), ChatError> {
        if endpoint.is_empty() {
            return Err(ChatError::InvalidArgument("endpoint is required".into()));
        }
        let credential = TokenCredential::new(access_token)
            .map_err(|e| ChatError::Initialization(e.to_string()))?;
        let client = self
            .platform
            .create_client(endpoint, &credential)
            .await
            .map_err(|e| ChatError::Initialization(e.to_string()))?;

        let mut state = self.inner.lock().await;
        state.credential = Some(credential);
        state.client = Some(client);
        state.joined = None;
        tracing::info!(%endpoint, "chat client initialized");
        Ok(())
    }

    /// Create a thread. Does not bind it as the joined session.
    pub async fn create_thread(
        &self,
        topic: &str,
        participants: &[String],
    ) -> Result<ThreadInfo, ChatError> {
        if topic.is_empty() {
            return Err(ChatError::InvalidArgument("topic is required".into()));
        }
        let client = self.client().await?;
        let thread = client
            .create_thread(topic, participants)
            .await
            .map_err(|e| ChatError::CreateThread(e.to_string()))?;
        tracing::info!(thread_id = %thread.id, "chat thread created");
        Ok(thread)
    }

    /// Bind a thread as the joined session, replacing any previous binding.
    /// Binding is client construction only; no network call is involved.
    pub async fn join_thread(&self, thread_id: &str) -> Result<(), ChatError> {
        if thread_id.is_empty() {
            return Err(ChatError::InvalidArgument("thread id is required".into()));
        }
        let client = self.client().await?;
        let thread_client = client
            .thread_client(thread_id)
            .map_err(|e| ChatError::JoinThread(e.to_string()))?;

        let mut state = self.inner.lock().await;
        state.joined = Some(ThreadBinding {
            thread_id: thread_id.to_string(),
            client: thread_client,
        });
        tracing::info!(%thread_id, "chat thread joined");
        Ok(())
    }

    /// Send a message on a freshly scoped thread client, independent of the
    /// joined binding. Returns the platform-assigned message id.
    pub async fn send_message(&self, thread_id: &str, content: &str) -> Result<String, ChatError> {
        if thread_id.is_empty() || content.is_empty() {
            return Err(ChatError::InvalidArgument("thread id and content are required".into()));
        }
        let client = self.client().await?;
        let thread_client = client
            .thread_client(thread_id)
            .map_err(|e| ChatError::SendMessage(e.to_string()))?;
        thread_client
            .send_message(content)
            .await
            .map_err(|e| ChatError::SendMessage(e.to_string()))
    }

    /// List the newest messages of a thread, newest-page semantics as the
    /// platform returns them.
    pub async fn list_messages(
        &self,
        thread_id: &str,
        max_messages: Option<u32>,
    ) -> Result<Vec<ChatMessageItem>, ChatError> {
        if thread_id.is_empty() {
            return Err(ChatError::InvalidArgument("thread id is required".into()));
        }
        let client = self.client().await?;
        let thread_client = client
            .thread_client(thread_id)
            .map_err(|e| ChatError::GetMessages(e.to_string()))?;
        thread_client
            .list_messages(max_messages.unwrap_or(self.config.chat_page_size))
            .await
            .map_err(|e| ChatError::GetMessages(e.to_string()))
    }

    /// Signal typing on the joined thread. Unlike send/list this requires
    /// the binding; without one the call is rejected, never a silent no-op.
    pub async fn send_typing(&self) -> Result<(), ChatError> {
        let thread_client = {
            let state = self.inner.lock().await;
            let binding = state.joined.as_ref().ok_or(ChatError::NotInitialized)?;
            binding.client.clone()
        };
        thread_client
            .send_typing()
            .await
            .map_err(|e| ChatError::Typing(e.to_string()))
    }

    /// Whether a credential and chat client are held.
    pub async fn is_initialized(&self) -> bool {
        let state = self.inner.lock().await;
        state.credential.is_some() && state.client.is_some()
    }

    /// Id of the joined thread, if any.
    pub async fn joined_thread_id(&self) -> Option<String> {
        let state = self.inner.lock().await;
        state.joined.as_ref().map(|b| b.thread_id.clone())
    }

    async fn client(&self) -> Result<Arc<dyn ChatClient>, ChatError> {
        let state = self.inner.lock().await;
        state.client.clone().ok_or(ChatError::NotInitialized)
    }
}
