//! Boundary between the client runtime and the Bondly REST API.
//!
//! Implementations map transport failures to [`ClientError::network`], non-2xx
//! answers to [`ClientError::from_status`], and undecodable bodies to
//! [`ClientError::malformed`]. Nothing here retries.
//!
//! [`ClientError::network`]: crate::error::ClientError::network
//! [`ClientError::from_status`]: crate::error::ClientError::from_status
//! [`ClientError::malformed`]: crate::error::ClientError::malformed

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::ClientResult,
    types::{
        ConnectionRequest, Conversation, DashboardSummary, LoginCredentials, Message,
        ProfileUpdate, ReviewDecision, SignupForm, User,
    },
};

#[async_trait]
pub trait DatingApi: Send + Sync {
    // --- Auth ---
    /// Ask the API whether the ambient session credential is still valid.
    async fn verify_session(&self) -> ClientResult<()>;

    async fn login(&self, credentials: &LoginCredentials) -> ClientResult<User>;

    async fn signup(&self, form: &SignupForm) -> ClientResult<User>;

    // --- Profiles ---
    /// `None` loads the signed-in user's own profile.
    async fn fetch_profile(&self, user_id: Option<&str>) -> ClientResult<User>;

    async fn update_profile(&self, update: &ProfileUpdate) -> ClientResult<User>;

    // --- Discovery and requests ---
    async fn fetch_feed(&self) -> ClientResult<Vec<User>>;

    /// The API may answer with the created request or with only a message.
    async fn send_interest(&self, to_user_id: &str) -> ClientResult<Option<ConnectionRequest>>;

    async fn received_requests(&self) -> ClientResult<Vec<ConnectionRequest>>;

    async fn review_request(
        &self,
        request_id: &str,
        decision: ReviewDecision,
    ) -> ClientResult<Option<ConnectionRequest>>;

    // --- Chat ---
    /// Idempotent: returns the existing conversation when one exists.
    async fn initiate_conversation(&self, other_user_id: &str) -> ClientResult<Conversation>;

    async fn list_conversations(&self) -> ClientResult<Vec<Conversation>>;

    async fn list_messages(&self, conversation_id: &str) -> ClientResult<Vec<Message>>;

    async fn send_message(&self, conversation_id: &str, content: &str) -> ClientResult<Message>;

    async fn delete_message(&self, message_id: &str) -> ClientResult<Option<Message>>;

    async fn mark_read(&self, conversation_id: &str) -> ClientResult<()>;

    async fn dashboard(&self) -> ClientResult<DashboardSummary>;
}

#[async_trait]
impl<T: DatingApi + ?Sized> DatingApi for Arc<T> {
    async fn verify_session(&self) -> ClientResult<()> {
        (**self).verify_session().await
    }

    async fn login(&self, credentials: &LoginCredentials) -> ClientResult<User> {
        (**self).login(credentials).await
    }

    async fn signup(&self, form: &SignupForm) -> ClientResult<User> {
        (**self).signup(form).await
    }

    async fn fetch_profile(&self, user_id: Option<&str>) -> ClientResult<User> {
        (**self).fetch_profile(user_id).await
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> ClientResult<User> {
        (**self).update_profile(update).await
    }

    async fn fetch_feed(&self) -> ClientResult<Vec<User>> {
        (**self).fetch_feed().await
    }

    async fn send_interest(&self, to_user_id: &str) -> ClientResult<Option<ConnectionRequest>> {
        (**self).send_interest(to_user_id).await
    }

    async fn received_requests(&self) -> ClientResult<Vec<ConnectionRequest>> {
        (**self).received_requests().await
    }

    async fn review_request(
        &self,
        request_id: &str,
        decision: ReviewDecision,
    ) -> ClientResult<Option<ConnectionRequest>> {
        (**self).review_request(request_id, decision).await
    }

    async fn initiate_conversation(&self, other_user_id: &str) -> ClientResult<Conversation> {
        (**self).initiate_conversation(other_user_id).await
    }

    async fn list_conversations(&self) -> ClientResult<Vec<Conversation>> {
        (**self).list_conversations().await
    }

    async fn list_messages(&self, conversation_id: &str) -> ClientResult<Vec<Message>> {
        (**self).list_messages(conversation_id).await
    }

    async fn send_message(&self, conversation_id: &str, content: &str) -> ClientResult<Message> {
        (**self).send_message(conversation_id, content).await
    }

    async fn delete_message(&self, message_id: &str) -> ClientResult<Option<Message>> {
        (**self).delete_message(message_id).await
    }

    async fn mark_read(&self, conversation_id: &str) -> ClientResult<()> {
        (**self).mark_read(conversation_id).await
    }

    async fn dashboard(&self) -> ClientResult<DashboardSummary> {
        (**self).dashboard().await
    }
}
