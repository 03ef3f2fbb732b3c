//! Frontend-facing state reducer for `bondly-cli`.
//!
//! User actions go through the `begin_*` / [`AppState::apply_optimistic`]
//! methods, which check what can be checked locally and hand back the command
//! to send. Runtime events are folded in by [`AppState::apply_confirmed`].
//! A failure event never changes the projections; it only clears the loading
//! flag and raises a toast. Some events queue follow-up commands, collected
//! with [`AppState::drain_follow_ups`].

use std::collections::{HashMap, VecDeque};

use client_core::{
    ActionKind, ClientCommand, ClientEvent, ClientLifecycleState, ConversationList,
    DashboardSummary, DiscoveryDeck, MessageTimeline, RequestStatus, RequestTracker,
    RequestTransitionError, ReviewDecision, SendAck, Swipe, User, VerificationOutcome,
};
use thiserror::Error;
use tracing::{debug, trace, warn};
use uuid::Uuid;

const DEFAULT_STATUS: &str = "Starting";
const MAX_TOASTS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

/// Transient notification shown once and then dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub text: String,
}

/// Per-view loading indicators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadingFlags {
    pub profile: bool,
    pub feed: bool,
    pub requests: bool,
    pub conversations: bool,
    pub messages: bool,
    pub dashboard: bool,
}

impl LoadingFlags {
    fn set(&mut self, action: ActionKind, loading: bool) {
        let flag = match action {
            ActionKind::FetchProfile | ActionKind::UpdateProfile => &mut self.profile,
            ActionKind::FetchFeed => &mut self.feed,
            ActionKind::ListRequests => &mut self.requests,
            ActionKind::ListConversations => &mut self.conversations,
            ActionKind::OpenConversation => &mut self.messages,
            ActionKind::FetchDashboard => &mut self.dashboard,
            _ => return,
        };
        *flag = loading;
    }
}

/// A swipe already applied to the deck.
#[derive(Debug, Clone, PartialEq)]
pub struct Swiped {
    pub swipe: Swipe,
    pub user: User,
    /// Request to fire for a like. Passes stay local.
    pub command: Option<ClientCommand>,
}

/// A user action refused before any command was sent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("Please log in first")]
    NotLoggedIn,
    #[error("No more profiles to show. Try `feed` to load new people.")]
    DeckExhausted,
    #[error("Open a conversation first")]
    NoConversation,
    #[error("Message cannot be empty")]
    EmptyMessage,
    #[error("No message with id '{0}' in this conversation")]
    UnknownMessage(String),
    #[error("You can only delete your own messages")]
    NotOwnMessage,
    #[error("That message was already deleted")]
    AlreadyDeleted,
    #[error(transparent)]
    Request(#[from] RequestTransitionError),
}

/// Mutable app state that receives runtime events and user actions.
#[derive(Debug, Clone)]
pub struct AppState {
    lifecycle: ClientLifecycleState,
    user: Option<User>,
    viewed_profile: Option<User>,
    deck: DiscoveryDeck,
    requests: RequestTracker,
    conversations: ConversationList,
    timeline: MessageTimeline,
    dashboard: Option<DashboardSummary>,
    loading: LoadingFlags,
    status_text: String,
    error_text: Option<String>,
    toasts: VecDeque<Toast>,
    /// client txn id -> conversation id
    pending_sends: HashMap<String, String>,
    /// (conversation id, message id) awaiting y/N
    pending_delete: Option<(String, String)>,
    follow_ups: VecDeque<ClientCommand>,
}

impl AppState {
    /// Create a new reducer state.
    pub fn new() -> Self {
        Self {
            lifecycle: ClientLifecycleState::Cold,
            user: None,
            viewed_profile: None,
            deck: DiscoveryDeck::new(),
            requests: RequestTracker::new(),
            conversations: ConversationList::new(),
            timeline: MessageTimeline::new(),
            dashboard: None,
            loading: LoadingFlags::default(),
            status_text: DEFAULT_STATUS.to_owned(),
            error_text: None,
            toasts: VecDeque::new(),
            pending_sends: HashMap::new(),
            pending_delete: None,
            follow_ups: VecDeque::new(),
        }
    }

    pub fn lifecycle(&self) -> ClientLifecycleState {
        self.lifecycle
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn own_user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|user| user.id.as_str())
    }

    pub fn viewed_profile(&self) -> Option<&User> {
        self.viewed_profile.as_ref()
    }

    pub fn deck(&self) -> &DiscoveryDeck {
        &self.deck
    }

    pub fn requests(&self) -> &RequestTracker {
        &self.requests
    }

    pub fn conversations(&self) -> &ConversationList {
        &self.conversations
    }

    pub fn timeline(&self) -> &MessageTimeline {
        &self.timeline
    }

    pub fn dashboard(&self) -> Option<&DashboardSummary> {
        self.dashboard.as_ref()
    }

    pub fn loading(&self) -> LoadingFlags {
        self.loading
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn error_text(&self) -> Option<&str> {
        self.error_text.as_deref()
    }

    pub fn pending_send_count(&self) -> usize {
        self.pending_sends.len()
    }

    /// Message id awaiting delete confirmation.
    pub fn pending_delete(&self) -> Option<&str> {
        self.pending_delete
            .as_ref()
            .map(|(_, message_id)| message_id.as_str())
    }

    /// Record that `command` is about to be sent.
    pub fn mark_requested(&mut self, command: &ClientCommand) {
        self.error_text = None;
        self.loading.set(command.action(), true);
    }

    /// Advance the deck before the network is involved.
    ///
    /// A like yields a `SendInterest` command. The deck is not rolled back if
    /// that request later fails.
    pub fn apply_optimistic(&mut self, swipe: Swipe) -> Result<Swiped, ActionError> {
        self.require_user()?;
        let (swipe, user) = self
            .deck
            .advance_optimistic(swipe)
            .ok_or(ActionError::DeckExhausted)?;
        let command = match swipe {
            Swipe::Like => Some(ClientCommand::SendInterest {
                to_user_id: user.id.clone(),
            }),
            Swipe::Pass => None,
        };
        debug!(?swipe, user_id = %user.id, remaining = self.deck.remaining(), "applied swipe");
        Ok(Swiped {
            swipe,
            user,
            command,
        })
    }

    /// Step back to the previous candidate.
    pub fn rewind(&mut self) -> bool {
        self.deck.rewind()
    }

    /// Prepare a send for the open conversation.
    pub fn begin_send(&mut self, content: &str) -> Result<ClientCommand, ActionError> {
        self.require_user()?;
        let conversation_id = self.open_conversation_id()?;
        let content = content.trim();
        if content.is_empty() {
            return Err(ActionError::EmptyMessage);
        }

        let client_txn_id = Uuid::new_v4().to_string();
        self.pending_sends
            .insert(client_txn_id.clone(), conversation_id.clone());
        Ok(ClientCommand::SendMessage {
            conversation_id,
            client_txn_id,
            content: content.to_owned(),
        })
    }

    /// Prepare an accept/reject. Only pending requests can be reviewed.
    pub fn begin_review(
        &self,
        request_id: &str,
        decision: ReviewDecision,
    ) -> Result<ClientCommand, ActionError> {
        self.require_user()?;
        self.requests.check_review(request_id, decision)?;
        Ok(ClientCommand::ReviewRequest {
            request_id: request_id.to_owned(),
            decision,
        })
    }

    /// Stage a delete that must be confirmed with [`AppState::resolve_delete`].
    pub fn request_delete(&mut self, message_id: &str) -> Result<(), ActionError> {
        let own_user_id = self.require_user()?.id.clone();
        let conversation_id = self.open_conversation_id()?;
        let message = self
            .timeline
            .get(message_id)
            .ok_or_else(|| ActionError::UnknownMessage(message_id.to_owned()))?;
        if message.is_deleted {
            return Err(ActionError::AlreadyDeleted);
        }
        if message.from_user != own_user_id {
            return Err(ActionError::NotOwnMessage);
        }
        self.pending_delete = Some((conversation_id, message_id.to_owned()));
        Ok(())
    }

    /// Answer the staged delete. Only a confirmed delete produces a command.
    pub fn resolve_delete(&mut self, confirmed: bool) -> Option<ClientCommand> {
        let (conversation_id, message_id) = self.pending_delete.take()?;
        if !confirmed {
            debug!(%message_id, "delete cancelled");
            return None;
        }
        Some(ClientCommand::DeleteMessage {
            conversation_id,
            message_id,
        })
    }

    /// Show `conversation_id` in the timeline and return the commands that
    /// load its history and mark it read, in that order.
    pub fn begin_open(
        &mut self,
        conversation_id: &str,
    ) -> Result<[ClientCommand; 2], ActionError> {
        self.require_user()?;
        Ok(self.open_timeline(conversation_id))
    }

    pub fn begin_mark_read(&self) -> Result<ClientCommand, ActionError> {
        self.require_user()?;
        Ok(ClientCommand::MarkRead {
            conversation_id: self.open_conversation_id()?,
        })
    }

    /// Take every queued toast, oldest first.
    pub fn drain_toasts(&mut self) -> Vec<Toast> {
        self.toasts.drain(..).collect()
    }

    /// Take the commands queued by confirmed events, in dispatch order.
    pub fn drain_follow_ups(&mut self) -> Vec<ClientCommand> {
        self.follow_ups.drain(..).collect()
    }

    /// Fold a runtime event into the state.
    pub fn apply_confirmed(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::StateChanged { state } => {
                debug!(?state, "lifecycle state changed");
                self.lifecycle = state;
                self.status_text = lifecycle_label(state).to_owned();
            }
            ClientEvent::AuthResult {
                success,
                user,
                notice,
                ..
            } => match (success, user) {
                (true, Some(user)) => {
                    self.error_text = None;
                    self.push_toast(
                        ToastKind::Success,
                        format!("Signed in as {}", user.display_name()),
                    );
                    self.user = Some(user);
                }
                _ => {
                    let notice = notice.unwrap_or_else(|| "Authentication failed".to_owned());
                    self.error_text = Some(notice.clone());
                    self.push_toast(ToastKind::Error, notice);
                }
            },
            ClientEvent::SessionVerified { outcome, user } => {
                self.handle_verification(outcome, user)
            }
            ClientEvent::LoggedOut => {
                self.reset_session_data();
                self.push_toast(ToastKind::Success, "Logged out");
            }
            ClientEvent::ProfileLoaded { user, own } => {
                self.loading.profile = false;
                if own {
                    self.user = Some(user);
                } else {
                    self.viewed_profile = Some(user);
                }
            }
            ClientEvent::ProfileUpdated { user } => {
                self.loading.profile = false;
                self.user = Some(user);
                self.push_toast(ToastKind::Success, "Profile updated successfully!");
            }
            ClientEvent::FeedLoaded { candidates } => {
                self.loading.feed = false;
                trace!(count = candidates.len(), "received feed");
                self.deck.replace(candidates);
            }
            ClientEvent::InterestSent { to_user_id, request } => {
                debug!(%to_user_id, echoed = request.is_some(), "interest delivered");
            }
            ClientEvent::ReceivedRequestsLoaded { requests } => {
                self.loading.requests = false;
                self.requests.reconcile(requests);
            }
            ClientEvent::RequestReviewed { request_id, status } => {
                self.handle_request_reviewed(request_id, status)
            }
            ClientEvent::ConversationReady { conversation } => {
                let conversation_id = conversation.id.clone();
                self.conversations.upsert(conversation);
                let commands = self.open_timeline(&conversation_id);
                self.follow_ups.extend(commands);
            }
            ClientEvent::ConversationsLoaded { conversations } => {
                self.loading.conversations = false;
                self.conversations.replace(conversations);
            }
            ClientEvent::MessagesLoaded {
                conversation_id,
                messages,
            } => {
                self.loading.messages = false;
                if self
                    .timeline
                    .conversation_id()
                    .is_some_and(|open| open != conversation_id)
                {
                    debug!(%conversation_id, "history for a conversation no longer open");
                    return;
                }
                trace!(%conversation_id, count = messages.len(), "received messages");
                self.timeline.replace(conversation_id, messages);
            }
            ClientEvent::MessageSendAck(ack) => self.handle_send_ack(ack),
            ClientEvent::MessageDeleted {
                conversation_id,
                message_id,
            } => {
                if self.timeline.conversation_id() == Some(conversation_id.as_str()) {
                    if let Err(err) = self.timeline.tombstone(&message_id) {
                        warn!(error = %err, "deleted message is not in the open timeline");
                    }
                }
                self.push_toast(ToastKind::Success, "Message deleted");
            }
            ClientEvent::MessagesRead { conversation_id } => {
                let Some(own_user_id) = self.user.as_ref().map(|user| user.id.clone()) else {
                    return;
                };
                if self.timeline.conversation_id() == Some(conversation_id.as_str()) {
                    let changed = self.timeline.mark_read_for(&own_user_id);
                    trace!(%conversation_id, changed, "marked messages read");
                }
                self.conversations.mark_read(&conversation_id, &own_user_id);
            }
            ClientEvent::DashboardLoaded { summary } => {
                self.loading.dashboard = false;
                self.dashboard = Some(summary);
            }
            ClientEvent::ActionFailed {
                action,
                code,
                notice,
            } => {
                warn!(?action, %code, "action failed; state left unchanged");
                self.loading.set(action, false);
                self.error_text = Some(notice.clone());
                self.push_toast(ToastKind::Error, notice);
            }
        }
    }

    fn handle_verification(&mut self, outcome: VerificationOutcome, user: Option<User>) {
        match outcome {
            VerificationOutcome::NoSession => {}
            VerificationOutcome::Confirmed => {
                self.user = user;
            }
            VerificationOutcome::Unreachable { session_kept: true } => {
                self.user = user;
                self.push_toast(
                    ToastKind::Info,
                    "Could not reach Bondly. Continuing with your saved session.",
                );
            }
            VerificationOutcome::Rejected | VerificationOutcome::Unreachable { .. } => {
                self.reset_session_data();
                self.push_toast(
                    ToastKind::Info,
                    "Your session has expired. Please log in again.",
                );
            }
        }
    }

    fn handle_request_reviewed(&mut self, request_id: String, status: RequestStatus) {
        let decision = match status {
            RequestStatus::Accepted => ReviewDecision::Accept,
            RequestStatus::Rejected => ReviewDecision::Reject,
            RequestStatus::Interested => {
                warn!(%request_id, "review echoed a non-terminal status; ignoring");
                return;
            }
        };
        if let Err(err) = self.requests.apply_review(&request_id, decision) {
            warn!(error = %err, "could not apply confirmed review locally");
        }
        let text = match decision {
            ReviewDecision::Accept => "Request accepted! You can now chat.",
            ReviewDecision::Reject => "Request rejected",
        };
        self.push_toast(ToastKind::Success, text);
    }

    fn handle_send_ack(&mut self, ack: SendAck) {
        if self.pending_sends.remove(&ack.client_txn_id).is_none() {
            debug!(client_txn_id = %ack.client_txn_id, "ack for unknown send");
        }

        match ack.message {
            Some(message) => {
                self.conversations.record_message(&message);
                if self.timeline.conversation_id() == Some(ack.conversation_id.as_str()) {
                    self.timeline.append(message);
                }
            }
            None => {
                let notice = ack
                    .notice
                    .unwrap_or_else(|| "Failed to send message.".to_owned());
                warn!(
                    client_txn_id = %ack.client_txn_id,
                    error_code = ?ack.error_code,
                    "send failed"
                );
                self.error_text = Some(notice.clone());
                self.push_toast(ToastKind::Error, notice);
            }
        }
    }

    fn require_user(&self) -> Result<&User, ActionError> {
        self.user.as_ref().ok_or(ActionError::NotLoggedIn)
    }

    fn open_timeline(&mut self, conversation_id: &str) -> [ClientCommand; 2] {
        self.timeline.open(conversation_id);
        [
            ClientCommand::OpenConversation {
                conversation_id: conversation_id.to_owned(),
            },
            ClientCommand::MarkRead {
                conversation_id: conversation_id.to_owned(),
            },
        ]
    }

    fn open_conversation_id(&self) -> Result<String, ActionError> {
        self.timeline
            .conversation_id()
            .map(str::to_owned)
            .ok_or(ActionError::NoConversation)
    }

    fn push_toast(&mut self, kind: ToastKind, text: impl Into<String>) {
        if self.toasts.len() >= MAX_TOASTS {
            self.toasts.pop_front();
        }
        self.toasts.push_back(Toast {
            kind,
            text: text.into(),
        });
    }

    fn reset_session_data(&mut self) {
        self.user = None;
        self.viewed_profile = None;
        self.deck = DiscoveryDeck::new();
        self.requests.clear();
        self.conversations.clear();
        self.timeline.clear();
        self.dashboard = None;
        self.loading = LoadingFlags::default();
        self.pending_sends.clear();
        self.pending_delete = None;
        self.follow_ups.clear();
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

fn lifecycle_label(state: ClientLifecycleState) -> &'static str {
    match state {
        ClientLifecycleState::Cold => "Starting",
        ClientLifecycleState::Verifying => "Checking session",
        ClientLifecycleState::Authenticating => "Signing in",
        ClientLifecycleState::Authenticated => "Signed in",
        ClientLifecycleState::LoggedOut => "Logged out",
    }
}

#[cfg(test)]
mod tests {
    use client_core::{ConnectionRequest, Conversation, DELETED_PLACEHOLDER, Message};
    use serde_json::json;

    use super::*;

    fn user(id: &str, name: &str) -> User {
        serde_json::from_value(json!({ "_id": id, "name": name })).expect("user should parse")
    }

    fn message(id: &str, from: &str, to: &str, content: &str) -> Message {
        serde_json::from_value(json!({
            "_id": id,
            "conversationId": "c1",
            "senderId": from,
            "receiverId": to,
            "content": content,
            "createdAt": "2025-03-01T10:00:00Z"
        }))
        .expect("message should parse")
    }

    fn request(id: &str, from: &str, status: &str) -> ConnectionRequest {
        serde_json::from_value(json!({
            "_id": id,
            "fromUserId": { "_id": from, "name": "Sam" },
            "toUserId": "me",
            "status": status
        }))
        .expect("request should parse")
    }

    fn conversation(unread_for_me: u32) -> Conversation {
        serde_json::from_value(json!({
            "_id": "c1",
            "participants": ["me", "u2"],
            "unreadCount": { "me": unread_for_me, "u2": 0 }
        }))
        .expect("conversation should parse")
    }

    fn signed_in() -> AppState {
        let mut state = AppState::new();
        state.apply_confirmed(ClientEvent::AuthResult {
            success: true,
            user: Some(user("me", "Alex")),
            error_code: None,
            notice: None,
        });
        state.drain_toasts();
        state
    }

    fn with_open_chat() -> AppState {
        let mut state = signed_in();
        state.apply_confirmed(ClientEvent::ConversationsLoaded {
            conversations: vec![conversation(1)],
        });
        state.apply_confirmed(ClientEvent::MessagesLoaded {
            conversation_id: "c1".into(),
            messages: vec![
                message("m1", "u2", "me", "hi"),
                message("m2", "me", "u2", "hey"),
                message("m3", "u2", "me", "how are you?"),
            ],
        });
        state
    }

    fn contents(state: &AppState) -> Vec<&str> {
        state
            .timeline()
            .messages()
            .iter()
            .map(|message| message.content.as_str())
            .collect()
    }

    #[test]
    fn failed_actions_leave_projections_unchanged() {
        let mut state = with_open_chat();
        state.apply_confirmed(ClientEvent::ReceivedRequestsLoaded {
            requests: vec![request("r1", "u3", "interested")],
        });
        let before_messages = state.timeline().messages().to_vec();

        for action in [ActionKind::DeleteMessage, ActionKind::ReviewRequest] {
            state.apply_confirmed(ClientEvent::ActionFailed {
                action,
                code: "http_status".into(),
                notice: "Request not found".into(),
            });
        }

        assert_eq!(state.timeline().messages(), before_messages.as_slice());
        assert_eq!(state.requests().pending_count(), 1);
        assert_eq!(state.error_text(), Some("Request not found"));
        let toasts = state.drain_toasts();
        assert_eq!(toasts.len(), 2);
        assert!(toasts.iter().all(|toast| toast.kind == ToastKind::Error));
    }

    #[test]
    fn confirmed_send_appends_server_message_exactly_once() {
        let mut state = with_open_chat();
        let command = state.begin_send("  see you soon  ").expect("send should be allowed");
        let ClientCommand::SendMessage {
            client_txn_id,
            content,
            conversation_id,
        } = command
        else {
            panic!("expected SendMessage");
        };
        assert_eq!(content, "see you soon");
        assert_eq!(conversation_id, "c1");
        assert_eq!(state.pending_send_count(), 1);
        assert_eq!(state.timeline().messages().len(), 3);

        let ack = SendAck {
            client_txn_id,
            conversation_id: "c1".into(),
            message: Some(message("m4", "me", "u2", "see you soon")),
            error_code: None,
            notice: None,
        };
        state.apply_confirmed(ClientEvent::MessageSendAck(ack.clone()));
        state.apply_confirmed(ClientEvent::MessageSendAck(ack));

        assert_eq!(
            contents(&state),
            vec!["hi", "hey", "how are you?", "see you soon"]
        );
        assert_eq!(state.pending_send_count(), 0);
        assert_eq!(
            state
                .conversations()
                .get("c1")
                .and_then(|conversation| conversation.last_message.as_deref()),
            Some("see you soon")
        );
    }

    #[test]
    fn failed_send_keeps_timeline_and_surfaces_notice() {
        let mut state = with_open_chat();
        let Ok(ClientCommand::SendMessage { client_txn_id, .. }) = state.begin_send("hello")
        else {
            panic!("expected SendMessage");
        };

        state.apply_confirmed(ClientEvent::MessageSendAck(SendAck {
            client_txn_id,
            conversation_id: "c1".into(),
            message: None,
            error_code: Some("network_error".into()),
            notice: Some("Failed to send message.".into()),
        }));

        assert_eq!(state.timeline().messages().len(), 3);
        assert_eq!(state.pending_send_count(), 0);
        assert_eq!(state.drain_toasts()[0].text, "Failed to send message.");
    }

    #[test]
    fn empty_or_unanchored_sends_are_refused() {
        let mut state = signed_in();
        assert_eq!(state.begin_send("hi"), Err(ActionError::NoConversation));

        let mut state = with_open_chat();
        assert_eq!(state.begin_send("   "), Err(ActionError::EmptyMessage));
        assert_eq!(state.pending_send_count(), 0);
    }

    #[test]
    fn delete_needs_confirmation_and_tombstones_in_place() {
        let mut state = with_open_chat();
        assert_eq!(state.request_delete("m1"), Err(ActionError::NotOwnMessage));

        state.request_delete("m2").expect("own message can be deleted");
        assert_eq!(state.pending_delete(), Some("m2"));
        assert_eq!(state.resolve_delete(false), None);
        assert_eq!(state.pending_delete(), None);

        state.request_delete("m2").expect("own message can be deleted");
        let command = state.resolve_delete(true).expect("confirmed delete yields a command");
        assert_eq!(
            command,
            ClientCommand::DeleteMessage {
                conversation_id: "c1".into(),
                message_id: "m2".into(),
            }
        );

        state.apply_confirmed(ClientEvent::MessageDeleted {
            conversation_id: "c1".into(),
            message_id: "m2".into(),
        });
        assert_eq!(
            contents(&state),
            vec!["hi", DELETED_PLACEHOLDER, "how are you?"]
        );
        assert_eq!(state.request_delete("m2"), Err(ActionError::AlreadyDeleted));
    }

    #[test]
    fn swipes_advance_before_the_request_and_survive_its_failure() {
        let mut state = signed_in();
        state.apply_confirmed(ClientEvent::FeedLoaded {
            candidates: vec![user("u2", "Sam"), user("u3", "Kim"), user("u4", "Lee")],
        });

        let liked = state.apply_optimistic(Swipe::Like).expect("deck has candidates");
        assert_eq!(liked.user.id, "u2");
        assert_eq!(
            liked.command,
            Some(ClientCommand::SendInterest {
                to_user_id: "u2".into()
            })
        );
        assert_eq!(state.deck().current().map(|user| user.id.as_str()), Some("u3"));

        state.apply_confirmed(ClientEvent::ActionFailed {
            action: ActionKind::SendInterest,
            code: "network_error".into(),
            notice: "Failed to send your like.".into(),
        });
        assert_eq!(state.deck().current().map(|user| user.id.as_str()), Some("u3"));

        let passed = state.apply_optimistic(Swipe::Pass).expect("deck has candidates");
        assert_eq!(passed.command, None);
        assert!(state.rewind());
        assert_eq!(state.deck().current().map(|user| user.id.as_str()), Some("u3"));
    }

    #[test]
    fn reviews_apply_only_after_confirmation() {
        let mut state = signed_in();
        state.apply_confirmed(ClientEvent::ReceivedRequestsLoaded {
            requests: vec![
                request("r1", "u2", "interested"),
                request("r2", "u3", "interested"),
            ],
        });

        state
            .begin_review("r1", ReviewDecision::Accept)
            .expect("pending request can be accepted");
        assert_eq!(state.requests().pending_count(), 2);

        state.apply_confirmed(ClientEvent::RequestReviewed {
            request_id: "r1".into(),
            status: RequestStatus::Accepted,
        });
        state.apply_confirmed(ClientEvent::RequestReviewed {
            request_id: "r2".into(),
            status: RequestStatus::Rejected,
        });

        let received = state.requests().received();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].status, RequestStatus::Accepted);
        assert!(matches!(
            state.begin_review("r1", ReviewDecision::Reject),
            Err(ActionError::Request(RequestTransitionError::Forbidden { .. }))
        ));
    }

    #[test]
    fn mark_read_clears_own_counter_and_flags() {
        let mut state = with_open_chat();
        assert_eq!(state.conversations().total_unread("me"), 1);

        let command = state.begin_mark_read().expect("chat is open");
        state.mark_requested(&command);
        state.apply_confirmed(ClientEvent::MessagesRead {
            conversation_id: "c1".into(),
        });

        assert_eq!(state.conversations().total_unread("me"), 0);
        assert!(
            state
                .timeline()
                .messages()
                .iter()
                .filter(|message| message.to_user == "me")
                .all(|message| message.is_read)
        );
    }

    #[test]
    fn initiated_conversation_opens_and_queues_its_loads() {
        let mut state = with_open_chat();
        let mut ready = conversation(0);
        ready.id = "c9".into();

        state.apply_confirmed(ClientEvent::ConversationReady {
            conversation: ready,
        });

        assert_eq!(state.timeline().conversation_id(), Some("c9"));
        assert!(state.timeline().messages().is_empty());
        assert!(state.conversations().get("c9").is_some());
        assert_eq!(
            state.drain_follow_ups(),
            vec![
                ClientCommand::OpenConversation {
                    conversation_id: "c9".into()
                },
                ClientCommand::MarkRead {
                    conversation_id: "c9".into()
                },
            ]
        );
        assert!(state.drain_follow_ups().is_empty());
        assert_eq!(
            state.begin_send("hello").map(|command| command.action()),
            Ok(ActionKind::SendMessage)
        );
    }

    #[test]
    fn stale_history_does_not_replace_the_open_conversation() {
        let mut state = signed_in();
        let [open, _] = state.begin_open("c2").expect("signed in");
        assert_eq!(
            open,
            ClientCommand::OpenConversation {
                conversation_id: "c2".into()
            }
        );

        state.apply_confirmed(ClientEvent::MessagesLoaded {
            conversation_id: "c1".into(),
            messages: vec![message("m1", "u2", "me", "hi")],
        });
        assert_eq!(state.timeline().conversation_id(), Some("c2"));
        assert!(state.timeline().messages().is_empty());

        assert_eq!(
            AppState::new().begin_open("c2").map(|_| ()),
            Err(ActionError::NotLoggedIn)
        );
    }

    #[test]
    fn rejected_session_wipes_local_projections() {
        let mut state = with_open_chat();
        state.apply_confirmed(ClientEvent::SessionVerified {
            outcome: VerificationOutcome::Rejected,
            user: None,
        });

        assert!(state.user().is_none());
        assert!(state.timeline().messages().is_empty());
        assert!(state.conversations().conversations().is_empty());
        assert_eq!(state.drain_toasts()[0].kind, ToastKind::Info);
    }

    #[test]
    fn loading_flags_follow_request_and_outcome() {
        let mut state = signed_in();
        state.mark_requested(&ClientCommand::FetchDashboard);
        assert!(state.loading().dashboard);

        state.apply_confirmed(ClientEvent::DashboardLoaded {
            summary: DashboardSummary::default(),
        });
        assert!(!state.loading().dashboard);

        state.mark_requested(&ClientCommand::FetchFeed);
        state.apply_confirmed(ClientEvent::ActionFailed {
            action: ActionKind::FetchFeed,
            code: "network_error".into(),
            notice: "Failed to load new people.".into(),
        });
        assert!(!state.loading().feed);
    }
}
