//! Owned session container persisted to a [`DurableStore`].
//!
//! The durable record is two keys under the `bondly` namespace: the JSON user
//! and an `"true"` authentication flag. A session is rehydrated only when both
//! are present and the user parses.

use client_platform::{DurableStore, ScopedDurableStore, StoreOp};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    error::{ClientError, ClientErrorCategory, ClientResult},
    types::{ProfileUpdate, User},
};

pub const SESSION_NAMESPACE: &str = "bondly";
pub const USER_KEY: &str = "user";
pub const AUTH_FLAG_KEY: &str = "isAuthenticated";

/// Snapshot of the active session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub user: User,
    pub is_authenticated: bool,
}

#[derive(Debug)]
pub struct SessionStore<S: DurableStore> {
    storage: ScopedDurableStore<S>,
    user: Option<User>,
}

impl<S: DurableStore> SessionStore<S> {
    /// Open the store and rehydrate any persisted session.
    ///
    /// Unreadable or partial records start the store logged out; they are not
    /// deleted here.
    pub fn open(store: S) -> Self {
        let storage = ScopedDurableStore::new(store, SESSION_NAMESPACE);
        let user = rehydrate(&storage);
        debug!(rehydrated = user.is_some(), "session store opened");
        Self { storage, user }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn session(&self) -> Option<Session> {
        self.user.clone().map(|user| Session {
            user,
            is_authenticated: true,
        })
    }

    pub fn storage(&self) -> &S {
        self.storage.inner()
    }

    /// Activate a session and persist it.
    pub fn login(&mut self, user: User) -> ClientResult<()> {
        let encoded = encode_user(&user)?;
        self.storage.apply(&[
            StoreOp::set(USER_KEY, encoded),
            StoreOp::set(AUTH_FLAG_KEY, "true"),
        ])?;
        debug!(user_id = %user.id, "session persisted");
        self.user = Some(user);
        Ok(())
    }

    /// Clear the persisted session, then the in-memory one.
    ///
    /// When the durable delete fails the session stays active and the storage
    /// error is returned.
    pub fn logout(&mut self) -> ClientResult<()> {
        self.storage
            .apply(&[StoreOp::remove(USER_KEY), StoreOp::remove(AUTH_FLAG_KEY)])
            .map_err(|err| {
                warn!(error = %err, "failed clearing persisted session");
                ClientError::from(err)
            })?;
        self.user = None;
        Ok(())
    }

    /// Activate a session without writing it; used once the API confirmed it.
    pub fn restore(&mut self, user: User) {
        self.user = Some(user);
    }

    /// Merge `update` into the current user and persist the result.
    pub fn update_user(&mut self, update: &ProfileUpdate) -> ClientResult<&User> {
        let Some(current) = &self.user else {
            return Err(ClientError::new(
                ClientErrorCategory::Config,
                "no_active_session",
                "cannot update user without an active session",
            ));
        };

        let mut merged = current.clone();
        merged.merge(update);
        self.storage.set(USER_KEY, &encode_user(&merged)?)?;
        Ok(&*self.user.insert(merged))
    }
}

fn encode_user(user: &User) -> ClientResult<String> {
    serde_json::to_string(user).map_err(|err| {
        ClientError::new(
            ClientErrorCategory::Internal,
            "session_serialize_error",
            err.to_string(),
        )
    })
}

fn rehydrate<S: DurableStore>(storage: &ScopedDurableStore<S>) -> Option<User> {
    let flag = match storage.get(AUTH_FLAG_KEY) {
        Ok(flag) => flag,
        Err(err) => {
            warn!(error = %err, "failed reading persisted auth flag");
            return None;
        }
    };
    if flag.as_deref() != Some("true") {
        return None;
    }

    let raw = match storage.get(USER_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(err) => {
            warn!(error = %err, "failed reading persisted user");
            return None;
        }
    };

    match serde_json::from_str::<User>(&raw) {
        Ok(user) => Some(user),
        Err(err) => {
            warn!(error = %err, "failed parsing persisted user; starting logged out");
            None
        }
    }
}
