use client_core::{
    ActionKind, AuthVerifier, ChannelError, ClientChannels, ClientCommand, ClientError,
    ClientEvent, ClientResult, ClientStateMachine, DatingApi, EventStream, LoginCredentials,
    NetworkFailurePolicy, ProfileUpdate, ReviewDecision, SessionStore, SignupForm, User,
    VerificationOutcome, normalize_action_failure, normalize_send_outcome, validate_login,
    validate_signup,
};
use client_platform::DurableStore;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    pub network_policy: NetworkFailurePolicy,
    pub command_buffer: usize,
    pub event_buffer: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            network_policy: NetworkFailurePolicy::FailOpen,
            command_buffer: 128,
            event_buffer: 512,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RuntimeHandle {
    channels: ClientChannels,
}

impl RuntimeHandle {
    pub async fn send(&self, command: ClientCommand) -> Result<(), ChannelError> {
        self.channels.send_command(command).await
    }

    pub fn subscribe(&self) -> EventStream {
        self.channels.subscribe()
    }

    /// Sender for tasks that queue commands without holding the handle.
    pub fn command_sender(&self) -> mpsc::Sender<ClientCommand> {
        self.channels.command_sender()
    }
}

/// Start the command loop on the current tokio runtime.
///
/// The session store is opened here, so any persisted session is rehydrated
/// before the first command runs. Send `RestoreSession` to verify it.
pub fn spawn_runtime<A, S>(api: A, store: S, config: RuntimeConfig) -> RuntimeHandle
where
    A: DatingApi + 'static,
    S: DurableStore + 'static,
{
    let (channels, command_rx) = ClientChannels::new(config.command_buffer, config.event_buffer);
    let runtime = ClientRuntime {
        channels: channels.clone(),
        command_rx,
        state_machine: ClientStateMachine::default(),
        session: SessionStore::open(store),
        verifier: AuthVerifier::new(config.network_policy),
        api,
    };
    tokio::spawn(async move {
        runtime.run().await;
    });

    RuntimeHandle { channels }
}

struct ClientRuntime<A, S: DurableStore> {
    channels: ClientChannels,
    command_rx: mpsc::Receiver<ClientCommand>,
    state_machine: ClientStateMachine,
    session: SessionStore<S>,
    verifier: AuthVerifier,
    api: A,
}

impl<A: DatingApi, S: DurableStore> ClientRuntime<A, S> {
    async fn run(mut self) {
        while let Some(command) = self.command_rx.recv().await {
            let action = command.action();
            debug!(?action, "handling command");
            if let Err(err) = self.handle_command(command).await {
                warn!(?action, error = %err, "command failed");
                self.channels.emit(normalize_action_failure(action, &err));
            }
        }
        debug!("command channel closed; runtime stopped");
    }

    async fn handle_command(&mut self, command: ClientCommand) -> ClientResult<()> {
        match command {
            ClientCommand::RestoreSession => {
                self.handle_restore_session().await;
                Ok(())
            }
            ClientCommand::Login(credentials) => {
                self.handle_login(credentials).await;
                Ok(())
            }
            ClientCommand::Signup(form) => {
                self.handle_signup(form).await;
                Ok(())
            }
            ClientCommand::Logout => self.handle_logout(),
            ClientCommand::SendMessage {
                conversation_id,
                client_txn_id,
                content,
            } => {
                self.handle_send_message(conversation_id, client_txn_id, content)
                    .await;
                Ok(())
            }
            data_command => {
                self.validate_data_command(&data_command)?;
                self.handle_data_command(data_command).await
            }
        }
    }

    async fn handle_restore_session(&mut self) {
        let (candidate, events) = match self.validate_transition(&ClientCommand::RestoreSession) {
            Ok(transition) => transition,
            Err(err) => {
                self.channels
                    .emit(normalize_action_failure(ActionKind::VerifySession, &err));
                return;
            }
        };
        self.commit_transition(candidate, events);

        let outcome = match self.verifier.verify(&mut self.session, &self.api).await {
            Ok(outcome) => outcome,
            Err(err) => {
                self.channels
                    .emit(normalize_action_failure(ActionKind::VerifySession, &err));
                VerificationOutcome::Rejected
            }
        };
        info!(?outcome, "session verification finished");

        if let Ok(state_event) = self.state_machine.on_verification(outcome) {
            self.channels.emit(state_event);
        }
        self.channels.emit(ClientEvent::SessionVerified {
            outcome,
            user: self.session.user().cloned(),
        });
    }

    async fn handle_login(&mut self, credentials: LoginCredentials) {
        if let Err(err) = validate_login(&credentials) {
            self.emit_auth_failure(ActionKind::Login, err.into());
            return;
        }

        let (candidate, events) = match self.begin_auth_transition() {
            Ok(transition) => transition,
            Err(err) => {
                self.emit_auth_failure(ActionKind::Login, err);
                return;
            }
        };
        self.commit_transition(candidate, events);

        let result = self.api.login(&credentials).await;
        self.finish_auth(ActionKind::Login, result);
    }

    async fn handle_signup(&mut self, form: SignupForm) {
        if let Err(err) = validate_signup(&form) {
            self.emit_auth_failure(ActionKind::Signup, err.into());
            return;
        }

        let (candidate, events) = match self.begin_auth_transition() {
            Ok(transition) => transition,
            Err(err) => {
                self.emit_auth_failure(ActionKind::Signup, err);
                return;
            }
        };
        self.commit_transition(candidate, events);

        let result = self.api.signup(&form).await;
        self.finish_auth(ActionKind::Signup, result);
    }

    fn handle_logout(&mut self) -> ClientResult<()> {
        let (candidate, events) = self.validate_transition(&ClientCommand::Logout)?;
        self.session.logout()?;
        self.commit_transition(candidate, events);
        self.channels.emit(ClientEvent::LoggedOut);
        info!("logged out");
        Ok(())
    }

    async fn handle_send_message(
        &mut self,
        conversation_id: String,
        client_txn_id: String,
        content: String,
    ) {
        let outcome = match self.state_machine.require_authenticated() {
            Ok(()) if content.trim().is_empty() => {
                Err(ClientError::validation("Message cannot be empty"))
            }
            Ok(()) => self.api.send_message(&conversation_id, content.trim()).await,
            Err(err) => Err(err),
        };

        if let Err(err) = &outcome {
            warn!(%conversation_id, error = %err, "send message failed");
        }
        self.channels.emit(normalize_send_outcome(
            client_txn_id,
            conversation_id,
            outcome,
        ));
    }

    async fn handle_data_command(&mut self, command: ClientCommand) -> ClientResult<()> {
        let event = match command {
            ClientCommand::FetchProfile { user_id } => {
                let user = self.api.fetch_profile(user_id.as_deref()).await?;
                ClientEvent::ProfileLoaded {
                    user,
                    own: user_id.is_none(),
                }
            }
            ClientCommand::UpdateProfile(update) => self.update_profile(update).await?,
            ClientCommand::FetchFeed => ClientEvent::FeedLoaded {
                candidates: self.api.fetch_feed().await?,
            },
            ClientCommand::SendInterest { to_user_id } => {
                let request = self.api.send_interest(&to_user_id).await?;
                ClientEvent::InterestSent {
                    to_user_id,
                    request,
                }
            }
            ClientCommand::ListReceivedRequests => ClientEvent::ReceivedRequestsLoaded {
                requests: self.api.received_requests().await?,
            },
            ClientCommand::ReviewRequest {
                request_id,
                decision,
            } => self.review_request(request_id, decision).await?,
            ClientCommand::InitiateConversation { other_user_id } => {
                ClientEvent::ConversationReady {
                    conversation: self.api.initiate_conversation(&other_user_id).await?,
                }
            }
            ClientCommand::ListConversations => ClientEvent::ConversationsLoaded {
                conversations: self.api.list_conversations().await?,
            },
            ClientCommand::OpenConversation { conversation_id } => {
                let messages = self.api.list_messages(&conversation_id).await?;
                ClientEvent::MessagesLoaded {
                    conversation_id,
                    messages,
                }
            }
            ClientCommand::DeleteMessage {
                conversation_id,
                message_id,
            } => {
                self.api.delete_message(&message_id).await?;
                ClientEvent::MessageDeleted {
                    conversation_id,
                    message_id,
                }
            }
            ClientCommand::MarkRead { conversation_id } => {
                self.api.mark_read(&conversation_id).await?;
                ClientEvent::MessagesRead { conversation_id }
            }
            ClientCommand::FetchDashboard => ClientEvent::DashboardLoaded {
                summary: self.api.dashboard().await?,
            },
            other => {
                return Err(ClientError::invalid_state(
                    self.state_machine.state(),
                    format!("{:?}", other.action()),
                ));
            }
        };

        self.channels.emit(event);
        Ok(())
    }

    async fn update_profile(&mut self, update: ProfileUpdate) -> ClientResult<ClientEvent> {
        if update.is_empty() {
            return Err(ClientError::validation("Nothing to update"));
        }
        self.api.update_profile(&update).await?;
        let user = self.session.update_user(&update)?.clone();
        Ok(ClientEvent::ProfileUpdated { user })
    }

    async fn review_request(
        &mut self,
        request_id: String,
        decision: ReviewDecision,
    ) -> ClientResult<ClientEvent> {
        let echoed = self.api.review_request(&request_id, decision).await?;
        let status = echoed
            .map(|request| request.status)
            .unwrap_or_else(|| decision.status());
        if status != decision.status() {
            warn!(%request_id, %status, "api echoed an unexpected review status");
        }
        Ok(ClientEvent::RequestReviewed { request_id, status })
    }

    fn validate_transition(
        &self,
        command: &ClientCommand,
    ) -> ClientResult<(ClientStateMachine, Vec<ClientEvent>)> {
        let mut candidate = self.state_machine.clone();
        let events = candidate.apply(command)?;
        Ok((candidate, events))
    }

    fn begin_auth_transition(&self) -> ClientResult<(ClientStateMachine, Vec<ClientEvent>)> {
        let mut candidate = self.state_machine.clone();
        let events = candidate.begin_auth()?;
        Ok((candidate, events))
    }

    fn validate_data_command(&self, command: &ClientCommand) -> ClientResult<()> {
        self.validate_transition(command).map(drop)
    }

    fn commit_transition(&mut self, candidate: ClientStateMachine, events: Vec<ClientEvent>) {
        self.state_machine = candidate;
        for event in events {
            self.channels.emit(event);
        }
    }

    fn finish_auth(&mut self, action: ActionKind, result: ClientResult<User>) {
        let persisted = result.and_then(|user| {
            self.session.login(user.clone())?;
            Ok(user)
        });

        if let Ok(state_event) = self.state_machine.on_auth_result(persisted.is_ok()) {
            self.channels.emit(state_event);
        }

        match persisted {
            Ok(user) => {
                info!(user_id = %user.id, ?action, "authenticated");
                self.channels.emit(ClientEvent::AuthResult {
                    success: true,
                    user: Some(user),
                    error_code: None,
                    notice: None,
                });
            }
            Err(err) => self.emit_auth_failure(action, err),
        }
    }

    fn emit_auth_failure(&self, action: ActionKind, error: ClientError) {
        warn!(?action, error = %error, "authentication failed");
        self.channels.emit(ClientEvent::AuthResult {
            success: false,
            user: None,
            notice: Some(error.user_notice(action.fallback_notice())),
            error_code: Some(error.code),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use async_trait::async_trait;
    use axum::{
        Json, Router,
        routing::{get, post},
    };
    use chrono::Utc;
    use client_core::{
        ClientLifecycleState, ConnectionRequest, Conversation, DashboardSummary, Message,
        RequestStatus, UserRef,
    };
    use client_platform::{InMemoryDurableStore, StoreError, StoreOp};
    use serde_json::json;
    use tokio::time::timeout;

    use super::*;
    use crate::HttpApi;

    fn user(id: &str) -> User {
        serde_json::from_value(serde_json::json!({ "id": id, "name": "Alex" }))
            .expect("user should parse")
    }

    fn message(id: &str, content: &str) -> Message {
        Message {
            id: id.to_owned(),
            conversation_id: "c1".to_owned(),
            from_user: "u1".to_owned(),
            to_user: "u2".to_owned(),
            content: content.to_owned(),
            created_at: Utc::now(),
            is_read: false,
            is_deleted: false,
        }
    }

    /// API double: succeeds with canned payloads unless `failure` is set.
    #[derive(Default)]
    struct FakeApi {
        verify: Mutex<Option<ClientResult<()>>>,
        failure: Mutex<Option<ClientError>>,
        calls: Mutex<Vec<&'static str>>,
    }

    impl FakeApi {
        fn failing_with(error: ClientError) -> Self {
            let api = Self::default();
            *api.failure.lock().expect("lock") = Some(error);
            api
        }

        fn with_verify(self, result: ClientResult<()>) -> Self {
            *self.verify.lock().expect("lock") = Some(result);
            self
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().expect("lock").clone()
        }

        fn answer<T>(&self, call: &'static str, ok: impl FnOnce() -> T) -> ClientResult<T> {
            self.calls.lock().expect("lock").push(call);
            match self.failure.lock().expect("lock").clone() {
                Some(err) => Err(err),
                None => Ok(ok()),
            }
        }
    }

    #[async_trait]
    impl DatingApi for FakeApi {
        async fn verify_session(&self) -> ClientResult<()> {
            self.calls.lock().expect("lock").push("verify");
            self.verify.lock().expect("lock").clone().unwrap_or(Ok(()))
        }

        async fn login(&self, credentials: &LoginCredentials) -> ClientResult<User> {
            let id = credentials.email.clone();
            self.answer("login", || user(&id))
        }

        async fn signup(&self, form: &SignupForm) -> ClientResult<User> {
            let id = form.email.clone();
            self.answer("signup", || user(&id))
        }

        async fn fetch_profile(&self, user_id: Option<&str>) -> ClientResult<User> {
            let id = user_id.unwrap_or("me").to_owned();
            self.answer("profile", || user(&id))
        }

        async fn update_profile(&self, _update: &ProfileUpdate) -> ClientResult<User> {
            self.answer("update_profile", || user("me"))
        }

        async fn fetch_feed(&self) -> ClientResult<Vec<User>> {
            self.answer("feed", || vec![user("c1"), user("c2")])
        }

        async fn send_interest(&self, _to: &str) -> ClientResult<Option<ConnectionRequest>> {
            self.answer("send_interest", || None)
        }

        async fn received_requests(&self) -> ClientResult<Vec<ConnectionRequest>> {
            self.answer("received", || {
                vec![ConnectionRequest {
                    id: "r1".into(),
                    from_user: UserRef::Id("u2".into()),
                    to_user: UserRef::Id("u1".into()),
                    status: RequestStatus::Interested,
                }]
            })
        }

        async fn review_request(
            &self,
            _request_id: &str,
            _decision: ReviewDecision,
        ) -> ClientResult<Option<ConnectionRequest>> {
            self.answer("review", || None)
        }

        async fn initiate_conversation(&self, other: &str) -> ClientResult<Conversation> {
            let other = other.to_owned();
            self.answer("initiate", || Conversation {
                id: format!("conv-{other}"),
                participants: vec![UserRef::Id("u1".into()), UserRef::Id(other)],
                last_message: None,
                last_message_time: None,
                unread_counts: Default::default(),
            })
        }

        async fn list_conversations(&self) -> ClientResult<Vec<Conversation>> {
            self.answer("conversations", Vec::new)
        }

        async fn list_messages(&self, _conversation_id: &str) -> ClientResult<Vec<Message>> {
            self.answer("messages", || vec![message("m1", "hi")])
        }

        async fn send_message(&self, _conversation_id: &str, content: &str) -> ClientResult<Message> {
            let content = content.to_owned();
            self.answer("send_message", || message("m-server", &content))
        }

        async fn delete_message(&self, _message_id: &str) -> ClientResult<Option<Message>> {
            self.answer("delete_message", || None)
        }

        async fn mark_read(&self, _conversation_id: &str) -> ClientResult<()> {
            self.answer("mark_read", || ())
        }

        async fn dashboard(&self) -> ClientResult<DashboardSummary> {
            self.answer("dashboard", DashboardSummary::default)
        }
    }

    async fn next_matching(
        events: &mut EventStream,
        mut predicate: impl FnMut(&ClientEvent) -> bool,
    ) -> ClientEvent {
        loop {
            let event = timeout(Duration::from_secs(2), events.recv())
                .await
                .expect("event timeout")
                .expect("event receive");
            if predicate(&event) {
                return event;
            }
        }
    }

    fn credentials(email: &str) -> LoginCredentials {
        LoginCredentials {
            email: email.into(),
            password: "pw".into(),
        }
    }

    async fn logged_in(api: Arc<FakeApi>, store: InMemoryDurableStore) -> (RuntimeHandle, EventStream) {
        let handle = spawn_runtime(api, store, RuntimeConfig::default());
        let mut events = handle.subscribe();
        handle
            .send(ClientCommand::Login(credentials("u1")))
            .await
            .expect("command should enqueue");
        next_matching(&mut events, |event| {
            matches!(event, ClientEvent::AuthResult { success: true, .. })
        })
        .await;
        (handle, events)
    }

    #[tokio::test]
    async fn login_persists_session_and_authenticates() {
        let store = InMemoryDurableStore::default();
        let handle = spawn_runtime(Arc::new(FakeApi::default()), store.clone(), RuntimeConfig::default());
        let mut events = handle.subscribe();

        handle
            .send(ClientCommand::Login(credentials("u1")))
            .await
            .expect("command should enqueue");

        let state = next_matching(&mut events, |event| {
            matches!(
                event,
                ClientEvent::StateChanged {
                    state: ClientLifecycleState::Authenticated
                }
            )
        })
        .await;
        assert!(matches!(state, ClientEvent::StateChanged { .. }));
        assert_eq!(
            store.get("bondly_isAuthenticated").expect("get").as_deref(),
            Some("true")
        );
    }

    #[tokio::test]
    async fn rejected_login_reports_server_message_and_persists_nothing() {
        let store = InMemoryDurableStore::default();
        let api = FakeApi::failing_with(ClientError::from_status(
            400,
            Some("Invalid credentials".into()),
        ));
        let handle = spawn_runtime(Arc::new(api), store.clone(), RuntimeConfig::default());
        let mut events = handle.subscribe();

        handle
            .send(ClientCommand::Login(credentials("u1")))
            .await
            .expect("command should enqueue");

        let event = next_matching(&mut events, |event| {
            matches!(event, ClientEvent::AuthResult { .. })
        })
        .await;
        match event {
            ClientEvent::AuthResult {
                success, notice, ..
            } => {
                assert!(!success);
                assert_eq!(notice.as_deref(), Some("Invalid credentials"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn invalid_signup_never_reaches_the_api() {
        let api = Arc::new(FakeApi::default());
        let handle = spawn_runtime(api.clone(), InMemoryDurableStore::default(), RuntimeConfig::default());
        let mut events = handle.subscribe();

        handle
            .send(ClientCommand::Signup(SignupForm {
                name: "Alex".into(),
                email: "alex@example.org".into(),
                age: "29".into(),
                location: "Brooklyn".into(),
                password: "one".into(),
                confirm_password: "two".into(),
                ..SignupForm::default()
            }))
            .await
            .expect("command should enqueue");

        let event = next_matching(&mut events, |event| {
            matches!(event, ClientEvent::AuthResult { .. })
        })
        .await;
        match event {
            ClientEvent::AuthResult { success, notice, .. } => {
                assert!(!success);
                assert_eq!(notice.as_deref(), Some("Passwords don't match"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn restore_with_rejected_token_logs_out() {
        let store = InMemoryDurableStore::default();
        SessionStore::open(store.clone())
            .login(user("u1"))
            .expect("seed session");

        let api = FakeApi::default().with_verify(Err(ClientError::from_status(401, None)));
        let handle = spawn_runtime(Arc::new(api), store.clone(), RuntimeConfig::default());
        let mut events = handle.subscribe();
        handle
            .send(ClientCommand::RestoreSession)
            .await
            .expect("command should enqueue");

        let event = next_matching(&mut events, |event| {
            matches!(event, ClientEvent::SessionVerified { .. })
        })
        .await;
        assert_eq!(
            event,
            ClientEvent::SessionVerified {
                outcome: VerificationOutcome::Rejected,
                user: None,
            }
        );
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn restore_survives_unreachable_api() {
        let store = InMemoryDurableStore::default();
        SessionStore::open(store.clone())
            .login(user("u1"))
            .expect("seed session");

        let api = Arc::new(
            FakeApi::default().with_verify(Err(ClientError::network("connection refused"))),
        );
        let handle = spawn_runtime(api.clone(), store.clone(), RuntimeConfig::default());
        let mut events = handle.subscribe();
        handle
            .send(ClientCommand::RestoreSession)
            .await
            .expect("command should enqueue");

        let event = next_matching(&mut events, |event| {
            matches!(event, ClientEvent::SessionVerified { .. })
        })
        .await;
        match event {
            ClientEvent::SessionVerified { outcome, user } => {
                assert_eq!(outcome, VerificationOutcome::Unreachable { session_kept: true });
                assert_eq!(user.map(|u| u.id), Some("u1".to_owned()));
            }
            other => panic!("unexpected event: {other:?}"),
        }

        handle
            .send(ClientCommand::FetchFeed)
            .await
            .expect("command should enqueue");
        next_matching(&mut events, |event| {
            matches!(event, ClientEvent::FeedLoaded { .. })
        })
        .await;
        assert_eq!(api.calls(), ["verify", "feed"]);
    }

    #[tokio::test]
    async fn restore_without_session_skips_verification() {
        let api = Arc::new(FakeApi::default());
        let handle = spawn_runtime(api.clone(), InMemoryDurableStore::default(), RuntimeConfig::default());
        let mut events = handle.subscribe();
        handle
            .send(ClientCommand::RestoreSession)
            .await
            .expect("command should enqueue");

        next_matching(&mut events, |event| {
            matches!(
                event,
                ClientEvent::StateChanged {
                    state: ClientLifecycleState::LoggedOut
                }
            )
        })
        .await;
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn data_commands_before_login_fail_without_calls() {
        let api = Arc::new(FakeApi::default());
        let handle = spawn_runtime(api.clone(), InMemoryDurableStore::default(), RuntimeConfig::default());
        let mut events = handle.subscribe();

        handle
            .send(ClientCommand::FetchDashboard)
            .await
            .expect("command should enqueue");
        let event = next_matching(&mut events, |_| true).await;
        match event {
            ClientEvent::ActionFailed { action, code, .. } => {
                assert_eq!(action, ActionKind::FetchDashboard);
                assert_eq!(code, "invalid_state_transition");
            }
            other => panic!("unexpected event: {other:?}"),
        }

        handle
            .send(ClientCommand::SendMessage {
                conversation_id: "c1".into(),
                client_txn_id: "tx-1".into(),
                content: "hello".into(),
            })
            .await
            .expect("command should enqueue");
        match next_matching(&mut events, |_| true).await {
            ClientEvent::MessageSendAck(ack) => {
                assert_eq!(ack.client_txn_id, "tx-1");
                assert_eq!(ack.message, None);
                assert_eq!(ack.error_code.as_deref(), Some("invalid_state_transition"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn send_message_acks_with_server_message() {
        let api = Arc::new(FakeApi::default());
        let (handle, mut events) = logged_in(api, InMemoryDurableStore::default()).await;

        handle
            .send(ClientCommand::SendMessage {
                conversation_id: "c1".into(),
                client_txn_id: "tx-2".into(),
                content: "  hello  ".into(),
            })
            .await
            .expect("command should enqueue");

        match next_matching(&mut events, |event| {
            matches!(event, ClientEvent::MessageSendAck(_))
        })
        .await
        {
            ClientEvent::MessageSendAck(ack) => {
                let message = ack.message.expect("server message");
                assert_eq!(message.id, "m-server");
                assert_eq!(message.content, "hello");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn review_and_delete_emit_confirmed_events() {
        let api = Arc::new(FakeApi::default());
        let (handle, mut events) = logged_in(api, InMemoryDurableStore::default()).await;

        handle
            .send(ClientCommand::ReviewRequest {
                request_id: "r1".into(),
                decision: ReviewDecision::Reject,
            })
            .await
            .expect("command should enqueue");
        let event = next_matching(&mut events, |event| {
            matches!(event, ClientEvent::RequestReviewed { .. })
        })
        .await;
        assert_eq!(
            event,
            ClientEvent::RequestReviewed {
                request_id: "r1".into(),
                status: RequestStatus::Rejected,
            }
        );

        handle
            .send(ClientCommand::DeleteMessage {
                conversation_id: "c1".into(),
                message_id: "m1".into(),
            })
            .await
            .expect("command should enqueue");
        let event = next_matching(&mut events, |event| {
            matches!(event, ClientEvent::MessageDeleted { .. })
        })
        .await;
        assert_eq!(
            event,
            ClientEvent::MessageDeleted {
                conversation_id: "c1".into(),
                message_id: "m1".into(),
            }
        );
    }

    #[tokio::test]
    async fn update_profile_merges_into_persisted_session() {
        let store = InMemoryDurableStore::default();
        let (handle, mut events) = logged_in(Arc::new(FakeApi::default()), store.clone()).await;

        handle
            .send(ClientCommand::UpdateProfile(ProfileUpdate {
                bio: Some("new bio".into()),
                ..ProfileUpdate::default()
            }))
            .await
            .expect("command should enqueue");

        match next_matching(&mut events, |event| {
            matches!(event, ClientEvent::ProfileUpdated { .. })
        })
        .await
        {
            ClientEvent::ProfileUpdated { user } => {
                assert_eq!(user.id, "u1");
                assert_eq!(user.bio.as_deref(), Some("new bio"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        let persisted = store
            .get("bondly_user")
            .expect("get")
            .expect("user persisted");
        assert!(persisted.contains("new bio"));
    }

    #[tokio::test]
    async fn logout_clears_store_and_blocks_data_commands() {
        let store = InMemoryDurableStore::default();
        let (handle, mut events) = logged_in(Arc::new(FakeApi::default()), store.clone()).await;

        handle
            .send(ClientCommand::Logout)
            .await
            .expect("command should enqueue");
        next_matching(&mut events, |event| matches!(event, ClientEvent::LoggedOut)).await;
        assert!(store.is_empty());

        handle
            .send(ClientCommand::FetchFeed)
            .await
            .expect("command should enqueue");
        let event = next_matching(&mut events, |event| {
            matches!(event, ClientEvent::ActionFailed { .. })
        })
        .await;
        assert!(matches!(
            event,
            ClientEvent::ActionFailed {
                action: ActionKind::FetchFeed,
                ..
            }
        ));
    }

    /// Accepts writes but refuses deletes.
    #[derive(Clone, Default)]
    struct NoRemoveStore {
        inner: InMemoryDurableStore,
    }

    impl DurableStore for NoRemoveStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get(key)
        }

        fn apply(&self, batch: &[StoreOp]) -> Result<(), StoreError> {
            if batch.iter().any(|op| matches!(op, StoreOp::Remove { .. })) {
                return Err(StoreError::Unavailable("remove refused".into()));
            }
            self.inner.apply(batch)
        }
    }

    #[tokio::test]
    async fn failed_logout_keeps_session_active() {
        let store = NoRemoveStore::default();
        let api = Arc::new(FakeApi::default());
        let handle = spawn_runtime(api, store.clone(), RuntimeConfig::default());
        let mut events = handle.subscribe();
        handle
            .send(ClientCommand::Login(credentials("u1")))
            .await
            .expect("command should enqueue");
        next_matching(&mut events, |event| {
            matches!(event, ClientEvent::AuthResult { success: true, .. })
        })
        .await;

        handle
            .send(ClientCommand::Logout)
            .await
            .expect("command should enqueue");
        let event = next_matching(&mut events, |_| true).await;
        assert_eq!(
            event,
            ClientEvent::ActionFailed {
                action: ActionKind::Logout,
                code: "store_unavailable".into(),
                notice: ActionKind::Logout.fallback_notice().into(),
            }
        );
        assert_eq!(
            store.get("bondly_isAuthenticated").expect("get").as_deref(),
            Some("true")
        );

        handle
            .send(ClientCommand::FetchFeed)
            .await
            .expect("command should enqueue");
        let event = next_matching(&mut events, |_| true).await;
        assert!(
            matches!(event, ClientEvent::FeedLoaded { .. }),
            "still authenticated, got {event:?}"
        );
    }

    #[tokio::test]
    async fn malformed_answer_fails_action_with_generic_notice() {
        let app = Router::new()
            .route(
                "/login",
                post(|| async { Json(json!({ "user": { "_id": "u1", "name": "Alex" } })) }),
            )
            .route(
                "/feed",
                get(|| async { Json(json!({ "data": { "unexpected": true } })) }),
            )
            .route(
                "/chat/conversations",
                get(|| async { Json(json!({ "data": [] })) }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub server");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("stub server");
        });

        let api = HttpApi::new(&format!("http://{addr}")).expect("api should build");
        let handle = spawn_runtime(api, InMemoryDurableStore::default(), RuntimeConfig::default());
        let mut events = handle.subscribe();
        handle
            .send(ClientCommand::Login(credentials("alex@example.org")))
            .await
            .expect("command should enqueue");
        next_matching(&mut events, |event| {
            matches!(event, ClientEvent::AuthResult { success: true, .. })
        })
        .await;

        handle
            .send(ClientCommand::FetchFeed)
            .await
            .expect("command should enqueue");
        let event = next_matching(&mut events, |_| true).await;
        assert_eq!(
            event,
            ClientEvent::ActionFailed {
                action: ActionKind::FetchFeed,
                code: "malformed_response".into(),
                notice: "Failed to load new people.".into(),
            }
        );

        handle
            .send(ClientCommand::ListConversations)
            .await
            .expect("command should enqueue");
        let event = next_matching(&mut events, |_| true).await;
        assert_eq!(
            event,
            ClientEvent::ConversationsLoaded {
                conversations: Vec::new()
            },
            "the failed fetch must not change lifecycle state"
        );
    }
}
