//! Comlink session orchestration core.
//!
//! Pure orchestration crate with no platform SDK dependencies: the call
//! lifecycle state machine, the video resource registry, and the chat
//! session manager, all driving a platform binding through the capability
//! traits in [`platform`]. Hosts consume this through `comlink-bridge`.

pub mod calling;
pub mod chat;
pub mod config;
pub mod credential;
pub mod errors;
pub mod events;
pub mod platform;
pub mod video;

pub use calling::{CallCoordinator, CallInfo};
pub use chat::ChatManager;
pub use config::SessionConfig;
pub use credential::TokenCredential;
pub use errors::{CallError, ChatError};
pub use events::{CallState, EventEmitter, SessionEvent, SessionEventListener, SurfaceId};
