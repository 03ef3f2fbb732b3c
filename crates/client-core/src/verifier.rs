use std::{fmt, str::FromStr};

use client_platform::DurableStore;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    error::ClientResult, ports::DatingApi, session::SessionStore, types::VerificationOutcome,
};

/// What to do with a rehydrated session when the API cannot be reached.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum NetworkFailurePolicy {
    /// Keep the session; a transient outage must not log the user out.
    #[default]
    FailOpen,
    /// Clear the session as if the API had rejected it.
    FailClosed,
}

impl FromStr for NetworkFailurePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fail-open" | "open" => Ok(Self::FailOpen),
            "fail-closed" | "closed" => Ok(Self::FailClosed),
            other => Err(format!(
                "unknown policy '{other}' (expected fail-open or fail-closed)"
            )),
        }
    }
}

impl fmt::Display for NetworkFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FailOpen => "fail-open",
            Self::FailClosed => "fail-closed",
        })
    }
}

/// Confirms a rehydrated session against the API at startup.
///
/// An explicit not-ok answer always clears the session. A transport failure
/// is handled by the [`NetworkFailurePolicy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthVerifier {
    policy: NetworkFailurePolicy,
}

impl AuthVerifier {
    pub fn new(policy: NetworkFailurePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> NetworkFailurePolicy {
        self.policy
    }

    /// Issue at most one verification call.
    ///
    /// Returns an error only when clearing a rejected session failed to reach
    /// durable storage; the session then stays active in memory as on disk.
    pub async fn verify<S, A>(
        &self,
        session: &mut SessionStore<S>,
        api: &A,
    ) -> ClientResult<VerificationOutcome>
    where
        S: DurableStore,
        A: DatingApi + ?Sized,
    {
        let Some(user) = session.user().cloned() else {
            return Ok(VerificationOutcome::NoSession);
        };

        match api.verify_session().await {
            Ok(()) => {
                info!(user_id = %user.id, "persisted session confirmed");
                session.restore(user);
                Ok(VerificationOutcome::Confirmed)
            }
            Err(err) if err.is_transport_failure() => match self.policy {
                NetworkFailurePolicy::FailOpen => {
                    warn!(error = %err, "session verification unreachable; keeping session");
                    Ok(VerificationOutcome::Unreachable { session_kept: true })
                }
                NetworkFailurePolicy::FailClosed => {
                    warn!(error = %err, "session verification unreachable; clearing session");
                    session.logout()?;
                    Ok(VerificationOutcome::Unreachable {
                        session_kept: false,
                    })
                }
            },
            Err(err) => {
                warn!(error = %err, "session rejected by api; clearing session");
                session.logout()?;
                Ok(VerificationOutcome::Rejected)
            }
        }
    }
}
