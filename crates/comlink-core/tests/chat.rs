//! Chat manager binding and thread-scoped operation semantics.

use std::sync::Arc;

use comlink_core::errors::ChatError;
use comlink_core::{ChatManager, SessionConfig};
use comlink_testkit::FakeChatPlatform;

fn manager(platform: &Arc<FakeChatPlatform>) -> ChatManager {
    ChatManager::new(platform.clone(), SessionConfig::default())
}

#[tokio::test]
async fn operations_require_initialization() {
    let platform = Arc::new(FakeChatPlatform::new());
    let chat = manager(&platform);

    assert!(!chat.is_initialized().await);
    assert!(matches!(
        chat.create_thread("standup", &[]).await.unwrap_err(),
        ChatError::NotInitialized
    ));
    assert!(matches!(
        chat.send_message("19:x@thread.v2", "hello").await.unwrap_err(),
        ChatError::NotInitialized
    ));
    assert!(matches!(
        chat.list_messages("19:x@thread.v2", None).await.unwrap_err(),
        ChatError::NotInitialized
    ));
}

#[tokio::test]
async fn create_thread_does_not_bind_it() {
    let platform = Arc::new(FakeChatPlatform::new());
    let chat = manager(&platform);
    chat.initialize("token", "https://comms.example.com").await.unwrap();

    let thread = chat.create_thread("standup", &["user:1".into()]).await.unwrap();
    assert_eq!(thread.topic, "standup");
    assert_eq!(platform.thread_topic(&thread.id).as_deref(), Some("standup"));
    assert!(chat.joined_thread_id().await.is_none());
}

#[tokio::test]
async fn typing_requires_the_joined_binding() {
    let platform = Arc::new(FakeChatPlatform::new());
    let chat = manager(&platform);
    chat.initialize("token", "https://comms.example.com").await.unwrap();

    // Creating and even messaging a thread through ad hoc scoped clients
    // does not establish the binding the typing signal needs.
    let thread = chat.create_thread("standup", &[]).await.unwrap();
    chat.send_message(&thread.id, "hello").await.unwrap();
    assert!(matches!(chat.send_typing().await.unwrap_err(), ChatError::NotInitialized));

    chat.join_thread(&thread.id).await.unwrap();
    chat.send_typing().await.unwrap();
    assert_eq!(platform.typing_signals(), 1);
}

#[tokio::test]
async fn join_replaces_the_previous_binding() {
    let platform = Arc::new(FakeChatPlatform::new());
    let chat = manager(&platform);
    chat.initialize("token", "https://comms.example.com").await.unwrap();

    let first = chat.create_thread("one", &[]).await.unwrap();
    let second = chat.create_thread("two", &[]).await.unwrap();

    chat.join_thread(&first.id).await.unwrap();
    chat.join_thread(&second.id).await.unwrap();
    assert_eq!(chat.joined_thread_id().await.as_deref(), Some(second.id.as_str()));
}

#[tokio::test]
async fn send_and_list_work_on_any_thread_without_joining() {
    let platform = Arc::new(FakeChatPlatform::new());
    let chat = manager(&platform);
    chat.initialize("token", "https://comms.example.com").await.unwrap();

    let thread = chat.create_thread("standup", &[]).await.unwrap();
    let message_id = chat.send_message(&thread.id, "first").await.unwrap();
    assert!(!message_id.is_empty());

    let messages = chat.list_messages(&thread.id, None).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "first");
    assert!(!messages[0].sender_id.is_empty());
}

#[tokio::test]
async fn list_uses_the_configured_default_page_size() {
    let platform = Arc::new(FakeChatPlatform::new());
    let config = SessionConfig { chat_page_size: 3, ..SessionConfig::default() };
    let chat = ChatManager::new(platform.clone(), config);
    chat.initialize("token", "https://comms.example.com").await.unwrap();

    let thread = chat.create_thread("standup", &[]).await.unwrap();
    for i in 0..5 {
        chat.send_message(&thread.id, &format!("message {i}")).await.unwrap();
    }

    assert_eq!(chat.list_messages(&thread.id, None).await.unwrap().len(), 3);
    assert_eq!(chat.list_messages(&thread.id, Some(50)).await.unwrap().len(), 5);
}

#[tokio::test]
async fn empty_arguments_are_rejected_locally() {
    let platform = Arc::new(FakeChatPlatform::new());
    let chat = manager(&platform);
    chat.initialize("token", "https://comms.example.com").await.unwrap();

    assert!(matches!(
        chat.create_thread("", &[]).await.unwrap_err(),
        ChatError::InvalidArgument(_)
    ));
    assert!(matches!(
        chat.send_message("19:x@thread.v2", "").await.unwrap_err(),
        ChatError::InvalidArgument(_)
    ));
    assert!(matches!(chat.join_thread("").await.unwrap_err(), ChatError::InvalidArgument(_)));
}

#[tokio::test]
async fn platform_failures_surface_verbatim() {
    let platform = Arc::new(FakeChatPlatform::new());
    let chat = manager(&platform);
    chat.initialize("token", "https://comms.example.com").await.unwrap();

    platform.fail_create_thread("quota exceeded");
    match chat.create_thread("standup", &[]).await.unwrap_err() {
        ChatError::CreateThread(message) => assert_eq!(message, "quota exceeded"),
        other => panic!("expected CreateThread, got {other:?}"),
    }

    platform.fail_create_client("endpoint unreachable");
    match chat.initialize("token", "https://bad.example.com").await.unwrap_err() {
        ChatError::Initialization(message) => assert_eq!(message, "endpoint unreachable"),
        other => panic!("expected Initialization, got {other:?}"),
    }
}
