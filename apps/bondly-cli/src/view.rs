//! Plain-text rendering of state for the terminal.

use client_core::{
    ClientEvent, ClientLifecycleState, ConnectionRequest, Conversation, DashboardSummary,
    Message, User, VerificationOutcome,
};

use crate::state::{AppState, Toast, ToastKind};

/// Lines to print after `event` was folded into `state`.
pub fn render_event(state: &AppState, event: &ClientEvent) -> Vec<String> {
    match event {
        ClientEvent::SessionVerified {
            outcome: VerificationOutcome::Confirmed,
            user: Some(user),
        } => vec![format!("Welcome back, {}.", user.display_name())],
        ClientEvent::ProfileLoaded { own: false, .. } => state
            .viewed_profile()
            .map(render_profile)
            .unwrap_or_default(),
        ClientEvent::ProfileLoaded { user, .. } | ClientEvent::ProfileUpdated { user } => {
            render_profile(user)
        }
        ClientEvent::FeedLoaded { .. } => render_deck(state),
        ClientEvent::ReceivedRequestsLoaded { .. } => render_requests(state.requests().received()),
        ClientEvent::ConversationReady { conversation } => {
            let other = conversation
                .other_participant(state.own_user_id().unwrap_or_default())
                .map(|participant| participant.display_name())
                .unwrap_or("your match");
            vec![format!("Opening conversation {} with {other}...", conversation.id)]
        }
        ClientEvent::ConversationsLoaded { .. } => {
            render_conversations(state.conversations().conversations(), state.own_user_id())
        }
        ClientEvent::MessagesLoaded { .. } => render_timeline(state),
        ClientEvent::MessageSendAck(ack) => ack
            .message
            .iter()
            .map(|message| render_message(message, state.own_user_id()))
            .collect(),
        ClientEvent::DashboardLoaded { summary } => render_dashboard(summary),
        _ => Vec::new(),
    }
}

/// Session summary for the `status` command.
pub fn render_status(state: &AppState) -> Vec<String> {
    let mut lines = vec![format!("Status: {}", state.status_text())];
    if let Some(user) = state.user() {
        lines.push(format!("Signed in as {} [{}]", user.display_name(), user.id));
    }
    if state.lifecycle() == ClientLifecycleState::Authenticated {
        let own_user_id = state.own_user_id().unwrap_or_default();
        lines.push(format!(
            "Pending requests: {}  Unread messages: {}",
            state.requests().pending_count(),
            state.conversations().total_unread(own_user_id)
        ));
        if let Some(summary) = state.dashboard() {
            lines.push(format!("Matches: {}", summary.total_matches));
        }
    }

    let loading = state.loading();
    let active: Vec<&str> = [
        ("profile", loading.profile),
        ("feed", loading.feed),
        ("requests", loading.requests),
        ("conversations", loading.conversations),
        ("messages", loading.messages),
        ("dashboard", loading.dashboard),
    ]
    .into_iter()
    .filter_map(|(name, active)| active.then_some(name))
    .collect();
    if !active.is_empty() {
        lines.push(format!("Loading: {}", active.join(", ")));
    }
    if state.pending_send_count() > 0 {
        lines.push(format!("Sending: {} message(s)", state.pending_send_count()));
    }
    if let Some(message_id) = state.pending_delete() {
        lines.push(format!("Awaiting delete confirmation for {message_id}"));
    }
    if let Some(error) = state.error_text() {
        lines.push(format!("Last error: {error}"));
    }
    lines
}

pub fn render_toast(toast: &Toast) -> String {
    let tag = match toast.kind {
        ToastKind::Success => "ok",
        ToastKind::Error => "error",
        ToastKind::Info => "info",
    };
    format!("[{tag}] {}", toast.text)
}

/// The current discovery candidate, or the empty-deck notice.
pub fn render_deck(state: &AppState) -> Vec<String> {
    match state.deck().current() {
        Some(user) => {
            let mut lines = render_profile(user);
            lines.push(format!(
                "({} left) like | pass | rewind",
                state.deck().remaining()
            ));
            lines
        }
        None => vec!["No more profiles to show. Check back later for new matches!".to_owned()],
    }
}

pub fn render_profile(user: &User) -> Vec<String> {
    let mut header = user.display_name().to_owned();
    if let Some(age) = user.age {
        header.push_str(&format!(", {age}"));
    }
    if let Some(location) = user.location.as_deref().filter(|value| !value.is_empty()) {
        header.push_str(&format!(" ({location})"));
    }

    let mut lines = vec![format!("{header}  [{}]", user.id)];
    if let Some(bio) = user.bio.as_deref().filter(|value| !value.is_empty()) {
        lines.push(format!("  {bio}"));
    }
    if !user.interests.is_empty() {
        lines.push(format!("  Interests: {}", user.interests.join(", ")));
    }
    if !user.photos.is_empty() {
        lines.push(format!("  Photos: {}", user.photos.len()));
    }
    lines
}

pub fn render_requests(requests: &[ConnectionRequest]) -> Vec<String> {
    if requests.is_empty() {
        return vec!["No pending requests".to_owned()];
    }
    requests
        .iter()
        .map(|request| {
            format!(
                "[{}] {} ({})",
                request.id,
                request.from_user.display_name(),
                request.status
            )
        })
        .collect()
}

pub fn render_conversations(
    conversations: &[Conversation],
    own_user_id: Option<&str>,
) -> Vec<String> {
    if conversations.is_empty() {
        return vec!["No conversations yet".to_owned()];
    }
    let own_user_id = own_user_id.unwrap_or_default();
    conversations
        .iter()
        .map(|conversation| {
            let other = conversation
                .other_participant(own_user_id)
                .map(|participant| participant.display_name())
                .unwrap_or("Unknown");
            let unread = conversation.unread_for(own_user_id);
            let last = conversation.last_message.as_deref().unwrap_or("");
            if unread > 0 {
                format!("[{}] {other} ({unread} new): {last}", conversation.id)
            } else {
                format!("[{}] {other}: {last}", conversation.id)
            }
        })
        .collect()
}

pub fn render_timeline(state: &AppState) -> Vec<String> {
    let messages = state.timeline().messages();
    if messages.is_empty() {
        return vec!["No messages yet. Say hello!".to_owned()];
    }
    messages
        .iter()
        .map(|message| render_message(message, state.own_user_id()))
        .collect()
}

pub fn render_message(message: &Message, own_user_id: Option<&str>) -> String {
    let sender = if Some(message.from_user.as_str()) == own_user_id {
        "you"
    } else {
        "them"
    };
    let read = if message.is_read { " (read)" } else { "" };
    format!(
        "[{}] {} {sender}: {}{read}",
        message.id,
        message.created_at.format("%Y-%m-%d %H:%M"),
        message.content
    )
}

pub fn render_dashboard(summary: &DashboardSummary) -> Vec<String> {
    let mut lines = vec![
        format!("Matches: {}", summary.total_matches),
        format!("Pending requests: {}", summary.pending_requests),
        format!("Unread messages: {}", summary.unread_messages),
    ];
    if !summary.recent_matches.is_empty() {
        let names: Vec<&str> = summary
            .recent_matches
            .iter()
            .map(User::display_name)
            .collect();
        lines.push(format!("Recent matches: {}", names.join(", ")));
    }
    lines
}
