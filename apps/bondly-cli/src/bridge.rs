//! Bridges the runtime's command/event channels to the terminal state.

use std::sync::{Arc, Mutex, MutexGuard};

use client_core::{ChannelError, ClientCommand, ClientEvent, EventStream};
use client_http::RuntimeHandle;
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
};
use tracing::{debug, trace, warn};

use crate::{
    state::AppState,
    view::{render_event, render_toast},
};

/// Front-end side of the runtime: sends commands and keeps [`AppState`] in
/// sync with the event stream.
pub struct CliBridge {
    handle: RuntimeHandle,
    state: Arc<Mutex<AppState>>,
    event_worker: JoinHandle<()>,
}

impl CliBridge {
    /// Subscribe to the runtime and start folding events into `state`.
    ///
    /// `output` receives the lines to print for each event, toasts included.
    /// Follow-up commands queued by an event are sent from the worker.
    pub fn start<F>(handle: RuntimeHandle, state: Arc<Mutex<AppState>>, output: F) -> Self
    where
        F: FnMut(Vec<String>) + Send + 'static,
    {
        let events = handle.subscribe();
        let event_worker = tokio::spawn(run_event_worker(
            events,
            handle.command_sender(),
            Arc::clone(&state),
            output,
        ));
        Self {
            handle,
            state,
            event_worker,
        }
    }

    pub fn state(&self) -> MutexGuard<'_, AppState> {
        self.state.lock().expect("app state lock poisoned")
    }

    /// Mark the matching view as loading and hand `command` to the runtime.
    pub async fn dispatch(&self, command: ClientCommand) -> Result<(), ChannelError> {
        debug!(command = command_kind(&command), "dispatching command");
        self.state().mark_requested(&command);
        self.handle.send(command).await
    }
}

impl Drop for CliBridge {
    fn drop(&mut self) {
        self.event_worker.abort();
    }
}

async fn run_event_worker<F>(
    mut events: EventStream,
    commands: mpsc::Sender<ClientCommand>,
    state: Arc<Mutex<AppState>>,
    mut output: F,
) where
    F: FnMut(Vec<String>),
{
    loop {
        let Ok(event) = recv_event(&mut events).await else {
            debug!("event stream closed; stopping event worker");
            break;
        };
        trace!(event = event_kind(&event), "received runtime event");

        let (lines, follow_ups) = {
            let mut state = state.lock().expect("app state lock poisoned");
            let rendered = event.clone();
            state.apply_confirmed(event);
            let mut lines = render_event(&state, &rendered);
            lines.extend(state.drain_toasts().iter().map(render_toast));
            let follow_ups = state.drain_follow_ups();
            for command in &follow_ups {
                state.mark_requested(command);
            }
            (lines, follow_ups)
        };
        if !lines.is_empty() {
            output(lines);
        }

        for command in follow_ups {
            debug!(command = command_kind(&command), "dispatching follow-up command");
            if commands.send(command).await.is_err() {
                warn!("runtime stopped; dropping follow-up commands");
                break;
            }
        }
    }
}

async fn recv_event(events: &mut EventStream) -> Result<ClientEvent, ()> {
    loop {
        match events.recv().await {
            Ok(event) => return Ok(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "event stream lagged");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => return Err(()),
        }
    }
}

fn command_kind(command: &ClientCommand) -> &'static str {
    match command {
        ClientCommand::RestoreSession => "RestoreSession",
        ClientCommand::Login(_) => "Login",
        ClientCommand::Signup(_) => "Signup",
        ClientCommand::Logout => "Logout",
        ClientCommand::FetchProfile { .. } => "FetchProfile",
        ClientCommand::UpdateProfile(_) => "UpdateProfile",
        ClientCommand::FetchFeed => "FetchFeed",
        ClientCommand::SendInterest { .. } => "SendInterest",
        ClientCommand::ListReceivedRequests => "ListReceivedRequests",
        ClientCommand::ReviewRequest { .. } => "ReviewRequest",
        ClientCommand::InitiateConversation { .. } => "InitiateConversation",
        ClientCommand::ListConversations => "ListConversations",
        ClientCommand::OpenConversation { .. } => "OpenConversation",
        ClientCommand::SendMessage { .. } => "SendMessage",
        ClientCommand::DeleteMessage { .. } => "DeleteMessage",
        ClientCommand::MarkRead { .. } => "MarkRead",
        ClientCommand::FetchDashboard => "FetchDashboard",
    }
}

fn event_kind(event: &ClientEvent) -> &'static str {
    match event {
        ClientEvent::StateChanged { .. } => "StateChanged",
        ClientEvent::AuthResult { .. } => "AuthResult",
        ClientEvent::SessionVerified { .. } => "SessionVerified",
        ClientEvent::LoggedOut => "LoggedOut",
        ClientEvent::ProfileLoaded { .. } => "ProfileLoaded",
        ClientEvent::ProfileUpdated { .. } => "ProfileUpdated",
        ClientEvent::FeedLoaded { .. } => "FeedLoaded",
        ClientEvent::InterestSent { .. } => "InterestSent",
        ClientEvent::ReceivedRequestsLoaded { .. } => "ReceivedRequestsLoaded",
        ClientEvent::RequestReviewed { .. } => "RequestReviewed",
        ClientEvent::ConversationReady { .. } => "ConversationReady",
        ClientEvent::ConversationsLoaded { .. } => "ConversationsLoaded",
        ClientEvent::MessagesLoaded { .. } => "MessagesLoaded",
        ClientEvent::MessageSendAck(_) => "MessageSendAck",
        ClientEvent::MessageDeleted { .. } => "MessageDeleted",
        ClientEvent::MessagesRead { .. } => "MessagesRead",
        ClientEvent::DashboardLoaded { .. } => "DashboardLoaded",
        ClientEvent::ActionFailed { .. } => "ActionFailed",
    }
}
