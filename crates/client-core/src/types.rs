use std::{collections::HashMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// High-level client lifecycle state reported to front ends.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ClientLifecycleState {
    /// Runtime started; persisted session not yet examined.
    Cold,
    /// A rehydrated session is being confirmed against the API.
    Verifying,
    /// A login or signup request is in flight.
    Authenticating,
    /// A session is active and data commands are accepted.
    Authenticated,
    /// No session is active.
    LoggedOut,
}

/// How local state is reconciled with the outcome of a remote call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UpdateStrategy {
    /// Local state moves before the request and is not rolled back on failure.
    Optimistic,
    /// Local state moves only after the API reports success.
    Confirmed,
}

/// A user profile as returned by the API.
///
/// Fields the client does not model are kept in `extra` and written back
/// unchanged when the record is persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "emailId")]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl User {
    /// Best display label: the name, falling back to the id.
    pub fn display_name(&self) -> &str {
        let name = self.name.trim();
        if name.is_empty() { &self.id } else { name }
    }

    /// Merge the present fields of `update` into this user.
    pub fn merge(&mut self, update: &ProfileUpdate) {
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(age) = update.age {
            self.age = Some(age);
        }
        if let Some(location) = &update.location {
            self.location = Some(location.clone());
        }
        if let Some(bio) = &update.bio {
            self.bio = Some(bio.clone());
        }
        if let Some(interests) = &update.interests {
            self.interests = interests.clone();
        }
        if let Some(photos) = &update.photos {
            self.photos = photos.clone();
        }
    }
}

/// Partial profile edit. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interests: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photos: Option<Vec<String>>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// A reference to a user that the API may send either as a bare id or as a
/// populated profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum UserRef {
    Id(String),
    Profile(Box<User>),
}

impl UserRef {
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Profile(user) => &user.id,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Profile(user) => user.display_name(),
        }
    }
}

/// Status of a connection request. Transitions only leave `Interested`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Interested,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Interested)
    }

    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (Self::Interested, Self::Accepted) | (Self::Interested, Self::Rejected)
        )
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Interested => "interested",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        })
    }
}

/// Receiver's answer to a pending request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReviewDecision {
    Accept,
    Reject,
}

impl ReviewDecision {
    pub fn status(self) -> RequestStatus {
        match self {
            Self::Accept => RequestStatus::Accepted,
            Self::Reject => RequestStatus::Rejected,
        }
    }

    /// Path segment used by the review endpoint.
    pub fn as_path_segment(self) -> &'static str {
        match self {
            Self::Accept => "accepted",
            Self::Reject => "rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRequest {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(alias = "fromUserId")]
    pub from_user: UserRef,
    #[serde(alias = "toUserId")]
    pub to_user: UserRef,
    pub status: RequestStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub participants: Vec<UserRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_time: Option<DateTime<Utc>>,
    #[serde(default, alias = "unreadCount")]
    pub unread_counts: HashMap<String, u32>,
}

impl Conversation {
    /// The participant that is not `own_user_id`.
    pub fn other_participant(&self, own_user_id: &str) -> Option<&UserRef> {
        self.participants
            .iter()
            .find(|participant| participant.id() != own_user_id)
    }

    pub fn unread_for(&self, user_id: &str) -> u32 {
        self.unread_counts.get(user_id).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(alias = "conversation")]
    pub conversation_id: String,
    #[serde(alias = "senderId", alias = "fromUserId")]
    pub from_user: String,
    #[serde(alias = "receiverId", alias = "toUserId")]
    pub to_user: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardSummary {
    pub total_matches: u64,
    pub pending_requests: u64,
    pub unread_messages: u64,
    pub recent_matches: Vec<User>,
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A photo attached to a signup request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PhotoUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub age: String,
    pub location: String,
    pub password: String,
    pub confirm_password: String,
    pub bio: String,
    pub interests: Vec<String>,
    pub photos: Vec<PhotoUpload>,
}

impl fmt::Debug for SignupForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupForm")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("age", &self.age)
            .field("location", &self.location)
            .field("interests", &self.interests)
            .field("photo_count", &self.photos.len())
            .finish_non_exhaustive()
    }
}

/// Result of startup session verification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// No authenticated session was persisted; nothing was sent.
    NoSession,
    /// The API accepted the session.
    Confirmed,
    /// The API answered not-ok; the session was cleared.
    Rejected,
    /// The API could not be reached.
    Unreachable {
        /// Whether the session survived under the configured policy.
        session_kept: bool,
    },
}

/// Command channel input accepted by the client runtime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ClientCommand {
    /// Examine the rehydrated session and verify it remotely when present.
    RestoreSession,
    Login(LoginCredentials),
    Signup(SignupForm),
    /// Clear the local session.
    Logout,
    /// Fetch the own profile (`None`) or another user's profile.
    FetchProfile {
        user_id: Option<String>,
    },
    UpdateProfile(ProfileUpdate),
    FetchFeed,
    /// Send a like. Front ends advance their deck before issuing this.
    SendInterest {
        to_user_id: String,
    },
    ListReceivedRequests,
    ReviewRequest {
        request_id: String,
        decision: ReviewDecision,
    },
    InitiateConversation {
        other_user_id: String,
    },
    ListConversations,
    OpenConversation {
        conversation_id: String,
    },
    SendMessage {
        conversation_id: String,
        /// Front-end transaction id echoed in `SendAck`.
        client_txn_id: String,
        content: String,
    },
    /// Delete one message. Front ends must have collected user confirmation.
    DeleteMessage {
        conversation_id: String,
        message_id: String,
    },
    MarkRead {
        conversation_id: String,
    },
    FetchDashboard,
}

impl ClientCommand {
    pub fn action(&self) -> ActionKind {
        match self {
            Self::RestoreSession => ActionKind::VerifySession,
            Self::Login(_) => ActionKind::Login,
            Self::Signup(_) => ActionKind::Signup,
            Self::Logout => ActionKind::Logout,
            Self::FetchProfile { .. } => ActionKind::FetchProfile,
            Self::UpdateProfile(_) => ActionKind::UpdateProfile,
            Self::FetchFeed => ActionKind::FetchFeed,
            Self::SendInterest { .. } => ActionKind::SendInterest,
            Self::ListReceivedRequests => ActionKind::ListRequests,
            Self::ReviewRequest { .. } => ActionKind::ReviewRequest,
            Self::InitiateConversation { .. } => ActionKind::InitiateConversation,
            Self::ListConversations => ActionKind::ListConversations,
            Self::OpenConversation { .. } => ActionKind::OpenConversation,
            Self::SendMessage { .. } => ActionKind::SendMessage,
            Self::DeleteMessage { .. } => ActionKind::DeleteMessage,
            Self::MarkRead { .. } => ActionKind::MarkRead,
            Self::FetchDashboard => ActionKind::FetchDashboard,
        }
    }

    pub fn update_strategy(&self) -> UpdateStrategy {
        match self {
            Self::SendInterest { .. } => UpdateStrategy::Optimistic,
            _ => UpdateStrategy::Confirmed,
        }
    }
}

/// Which user action an outcome belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ActionKind {
    VerifySession,
    Login,
    Signup,
    Logout,
    FetchProfile,
    UpdateProfile,
    FetchFeed,
    SendInterest,
    ListRequests,
    ReviewRequest,
    InitiateConversation,
    ListConversations,
    OpenConversation,
    SendMessage,
    DeleteMessage,
    MarkRead,
    FetchDashboard,
}

impl ActionKind {
    /// Generic notice shown when no server message is available.
    pub fn fallback_notice(self) -> &'static str {
        match self {
            Self::VerifySession => "Could not verify your session.",
            Self::Login => "Login failed. Please try again.",
            Self::Signup => "Registration failed. Please try again.",
            Self::Logout => "Logout did not complete cleanly.",
            Self::FetchProfile => "Failed to load profile.",
            Self::UpdateProfile => "Failed to update profile.",
            Self::FetchFeed => "Failed to load new people.",
            Self::SendInterest => "Failed to send your like.",
            Self::ListRequests => "Failed to load requests.",
            Self::ReviewRequest => "Failed to respond to the request.",
            Self::InitiateConversation => "Failed to start the conversation.",
            Self::ListConversations => "Failed to load conversations.",
            Self::OpenConversation => "Failed to load messages.",
            Self::SendMessage => "Failed to send message.",
            Self::DeleteMessage => "Failed to delete message.",
            Self::MarkRead => "Failed to mark messages as read.",
            Self::FetchDashboard => "Failed to load dashboard.",
        }
    }
}

/// Acknowledgement for `SendMessage`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendAck {
    pub client_txn_id: String,
    pub conversation_id: String,
    /// Server-assigned message on success.
    pub message: Option<Message>,
    /// Stable error code on failure.
    pub error_code: Option<String>,
    /// User-facing notice on failure.
    pub notice: Option<String>,
}

/// Event channel output emitted by the client runtime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ClientEvent {
    StateChanged {
        state: ClientLifecycleState,
    },
    /// Result of login/signup.
    AuthResult {
        success: bool,
        user: Option<User>,
        error_code: Option<String>,
        notice: Option<String>,
    },
    SessionVerified {
        outcome: VerificationOutcome,
        user: Option<User>,
    },
    LoggedOut,
    ProfileLoaded {
        user: User,
        own: bool,
    },
    ProfileUpdated {
        user: User,
    },
    FeedLoaded {
        candidates: Vec<User>,
    },
    InterestSent {
        to_user_id: String,
        request: Option<ConnectionRequest>,
    },
    ReceivedRequestsLoaded {
        requests: Vec<ConnectionRequest>,
    },
    RequestReviewed {
        request_id: String,
        status: RequestStatus,
    },
    ConversationReady {
        conversation: Conversation,
    },
    ConversationsLoaded {
        conversations: Vec<Conversation>,
    },
    MessagesLoaded {
        conversation_id: String,
        messages: Vec<Message>,
    },
    MessageSendAck(SendAck),
    MessageDeleted {
        conversation_id: String,
        message_id: String,
    },
    MessagesRead {
        conversation_id: String,
    },
    DashboardLoaded {
        summary: DashboardSummary,
    },
    /// A remote call failed; local state was left unchanged.
    ActionFailed {
        action: ActionKind,
        code: String,
        notice: String,
    },
}
