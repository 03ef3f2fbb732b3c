use crate::{
    error::ClientError,
    types::{ClientCommand, ClientEvent, ClientLifecycleState, VerificationOutcome},
};

#[derive(Debug, Clone)]
pub struct ClientStateMachine {
    state: ClientLifecycleState,
}

impl Default for ClientStateMachine {
    fn default() -> Self {
        Self {
            state: ClientLifecycleState::Cold,
        }
    }
}

impl ClientStateMachine {
    pub fn state(&self) -> ClientLifecycleState {
        self.state
    }

    pub fn apply(&mut self, command: &ClientCommand) -> Result<Vec<ClientEvent>, ClientError> {
        use ClientCommand::*;

        match command {
            RestoreSession => self.transition_from_state(
                ClientLifecycleState::Cold,
                ClientLifecycleState::Verifying,
                "restore_session",
            ),
            Login(_) | Signup(_) => self.begin_auth(),
            Logout => self.transition_from_any_of(
                &[
                    ClientLifecycleState::Verifying,
                    ClientLifecycleState::Authenticating,
                    ClientLifecycleState::Authenticated,
                ],
                ClientLifecycleState::LoggedOut,
                "logout",
            ),
            FetchProfile { .. }
            | UpdateProfile(_)
            | FetchFeed
            | SendInterest { .. }
            | ListReceivedRequests
            | ReviewRequest { .. }
            | InitiateConversation { .. }
            | ListConversations
            | OpenConversation { .. }
            | SendMessage { .. }
            | DeleteMessage { .. }
            | MarkRead { .. }
            | FetchDashboard => self.require_authenticated().map(|()| Vec::new()),
        }
    }

    /// Enter `Authenticating` for a login or signup attempt.
    pub fn begin_auth(&mut self) -> Result<Vec<ClientEvent>, ClientError> {
        self.transition_from_any_of(
            &[ClientLifecycleState::Cold, ClientLifecycleState::LoggedOut],
            ClientLifecycleState::Authenticating,
            "login_or_signup",
        )
    }

    pub fn require_authenticated(&self) -> Result<(), ClientError> {
        if self.state == ClientLifecycleState::Authenticated {
            Ok(())
        } else {
            Err(ClientError::invalid_state(self.state, "authenticated command"))
        }
    }

    pub fn on_auth_result(&mut self, success: bool) -> Result<ClientEvent, ClientError> {
        if self.state != ClientLifecycleState::Authenticating {
            return Err(ClientError::invalid_state(self.state, "on_auth_result"));
        }

        let next = if success {
            ClientLifecycleState::Authenticated
        } else {
            ClientLifecycleState::LoggedOut
        };

        self.state = next;
        Ok(ClientEvent::StateChanged { state: next })
    }

    pub fn on_verification(
        &mut self,
        outcome: VerificationOutcome,
    ) -> Result<ClientEvent, ClientError> {
        if self.state != ClientLifecycleState::Verifying {
            return Err(ClientError::invalid_state(self.state, "on_verification"));
        }

        let next = match outcome {
            VerificationOutcome::Confirmed
            | VerificationOutcome::Unreachable { session_kept: true } => {
                ClientLifecycleState::Authenticated
            }
            VerificationOutcome::NoSession
            | VerificationOutcome::Rejected
            | VerificationOutcome::Unreachable {
                session_kept: false,
            } => ClientLifecycleState::LoggedOut,
        };

        self.state = next;
        Ok(ClientEvent::StateChanged { state: next })
    }

    fn transition_from_state(
        &mut self,
        expected: ClientLifecycleState,
        next: ClientLifecycleState,
        action: &str,
    ) -> Result<Vec<ClientEvent>, ClientError> {
        if self.state != expected {
            return Err(ClientError::invalid_state(self.state, action));
        }
        self.state = next;
        Ok(vec![ClientEvent::StateChanged { state: next }])
    }

    fn transition_from_any_of(
        &mut self,
        expected: &[ClientLifecycleState],
        next: ClientLifecycleState,
        action: &str,
    ) -> Result<Vec<ClientEvent>, ClientError> {
        if !expected.contains(&self.state) {
            return Err(ClientError::invalid_state(self.state, action));
        }
        self.state = next;
        Ok(vec![ClientEvent::StateChanged { state: next }])
    }
}
