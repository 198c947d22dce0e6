//! Acquire/release discipline of the video resource registry.

use std::sync::Arc;

use comlink_core::platform::CallPlatform;
use comlink_core::video::VideoRegistry;
use comlink_testkit::{FakeCallPlatform, camera, remote_stream};

async fn local_stream(
    platform: &FakeCallPlatform,
) -> Arc<dyn comlink_core::platform::LocalStream> {
    platform.create_local_stream(&camera("front")).await.unwrap()
}

#[tokio::test]
async fn acquire_is_idempotent_per_stream() {
    let platform = FakeCallPlatform::new();
    let mut registry = VideoRegistry::new();

    let first = registry.acquire_remote(&platform, remote_stream(5)).await.unwrap();
    let second = registry.acquire_remote(&platform, remote_stream(5)).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(platform.renderers_created(), 1);
}

#[tokio::test]
async fn release_is_idempotent_and_tolerates_unknown_ids() {
    let platform = FakeCallPlatform::new();
    let mut registry = VideoRegistry::new();

    registry.acquire_remote(&platform, remote_stream(5)).await.unwrap();
    registry.release_remote(5);
    registry.release_remote(5);
    registry.release_remote(99);

    assert!(registry.is_empty());
    assert_eq!(platform.renderers_disposed(), 1);
    assert_eq!(platform.views_unmounted(), 1);
}

#[tokio::test]
async fn every_acquire_is_balanced_by_clear() {
    let platform = FakeCallPlatform::new();
    let mut registry = VideoRegistry::new();

    for id in [1, 2, 3] {
        registry.acquire_remote(&platform, remote_stream(id)).await.unwrap();
    }
    registry.acquire_local(&platform, local_stream(&platform).await).await.unwrap();
    assert_eq!(platform.renderers_created(), 4);

    registry.clear();
    assert!(registry.is_empty());
    assert_eq!(platform.renderers_disposed(), 4);
    assert_eq!(platform.views_unmounted(), 4);

    // A second clear has nothing left to touch.
    registry.clear();
    assert_eq!(platform.renderers_disposed(), 4);
}

#[tokio::test]
async fn local_slot_is_independent_of_remote_entries() {
    let platform = FakeCallPlatform::new();
    let mut registry = VideoRegistry::new();

    let local = registry.acquire_local(&platform, local_stream(&platform).await).await.unwrap();
    registry.acquire_remote(&platform, remote_stream(1)).await.unwrap();

    registry.release_remote(1);
    assert_eq!(registry.local_surface(), Some(local));

    registry.release_local();
    registry.release_local();
    assert!(registry.is_empty());
}

#[tokio::test]
async fn failed_acquire_leaves_no_entry() {
    let platform = FakeCallPlatform::new();
    platform.fail_renderer_for(7);
    let mut registry = VideoRegistry::new();

    assert!(registry.acquire_remote(&platform, remote_stream(7)).await.is_err());
    assert!(registry.remote_surface(7).is_none());
    assert!(registry.is_empty());
    assert_eq!(platform.renderers_created(), 0);
}
