//! Core client contract shared between the runtime and front ends.
//!
//! This crate defines the command/event protocol, the lifecycle model, the
//! persisted session, and the local projections of match requests and
//! conversations.

/// Async command/event channel primitives.
pub mod channel;
/// Conversation summaries with unread counters.
pub mod conversations;
/// Discovery candidate deck.
pub mod discovery;
/// Stable client error types and HTTP classification helpers.
pub mod error;
/// Event normalization helpers (send acknowledgements, action failures).
pub mod normalization;
/// Remote API boundary.
pub mod ports;
/// Received connection requests and their lifecycle.
pub mod requests;
/// Persisted session container.
pub mod session;
/// Client lifecycle state machine.
pub mod state_machine;
/// Message buffer for the open conversation.
pub mod timeline;
/// Frontend-facing protocol types (commands, events, payloads).
pub mod types;
/// Signup and login form checks.
pub mod validation;
/// Startup session verification.
pub mod verifier;

pub use channel::{ChannelError, ClientChannels, EventStream};
pub use conversations::ConversationList;
pub use discovery::{DiscoveryDeck, Swipe};
pub use error::{ClientError, ClientErrorCategory, ClientResult, classify_http_status};
pub use normalization::{normalize_action_failure, normalize_send_outcome};
pub use ports::DatingApi;
pub use requests::{RequestTracker, RequestTransitionError};
pub use session::{Session, SessionStore};
pub use state_machine::ClientStateMachine;
pub use timeline::{DELETED_PLACEHOLDER, MessageTimeline, TimelineError};
pub use types::{
    ActionKind, ClientCommand, ClientEvent, ClientLifecycleState, ConnectionRequest,
    Conversation, DashboardSummary, LoginCredentials, Message, PhotoUpload, ProfileUpdate,
    RequestStatus, ReviewDecision, SendAck, SignupForm, UpdateStrategy, User, UserRef,
    VerificationOutcome,
};
pub use validation::{INTERESTS, MAX_PHOTOS, ValidationError, validate_login, validate_signup};
pub use verifier::{AuthVerifier, NetworkFailurePolicy};
