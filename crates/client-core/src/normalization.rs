use crate::{
    error::ClientError,
    types::{ActionKind, ClientEvent, Message, SendAck},
};

/// Convert a send-message result to a stable `ClientEvent::MessageSendAck`.
pub fn normalize_send_outcome(
    client_txn_id: impl Into<String>,
    conversation_id: impl Into<String>,
    outcome: Result<Message, ClientError>,
) -> ClientEvent {
    let client_txn_id = client_txn_id.into();
    let conversation_id = conversation_id.into();
    match outcome {
        Ok(message) => ClientEvent::MessageSendAck(SendAck {
            client_txn_id,
            conversation_id,
            message: Some(message),
            error_code: None,
            notice: None,
        }),
        Err(error) => ClientEvent::MessageSendAck(SendAck {
            client_txn_id,
            conversation_id,
            message: None,
            notice: Some(error.user_notice(ActionKind::SendMessage.fallback_notice())),
            error_code: Some(error.code),
        }),
    }
}

/// Convert a failed remote call into the user-facing failure event.
pub fn normalize_action_failure(action: ActionKind, error: &ClientError) -> ClientEvent {
    ClientEvent::ActionFailed {
        action,
        code: error.code.clone(),
        notice: error.user_notice(action.fallback_notice()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn maps_success_to_send_ack_with_server_message() {
        let message = Message {
            id: "m1".into(),
            conversation_id: "c1".into(),
            from_user: "me".into(),
            to_user: "them".into(),
            content: "hi".into(),
            created_at: Utc::now(),
            is_read: false,
            is_deleted: false,
        };
        match normalize_send_outcome("txn-1", "c1", Ok(message.clone())) {
            ClientEvent::MessageSendAck(ack) => {
                assert_eq!(ack.client_txn_id, "txn-1");
                assert_eq!(ack.message, Some(message));
                assert_eq!(ack.error_code, None);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn maps_failure_to_send_ack_with_stable_error_code() {
        let event = normalize_send_outcome(
            "txn-2",
            "c1",
            Err(ClientError::from_status(429, None)),
        );
        match event {
            ClientEvent::MessageSendAck(ack) => {
                assert_eq!(ack.message, None);
                assert_eq!(ack.error_code.as_deref(), Some("http_status"));
                assert_eq!(ack.notice.as_deref(), Some("Failed to send message."));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn action_failure_prefers_server_message() {
        let event = normalize_action_failure(
            ActionKind::Login,
            &ClientError::from_status(400, Some("Invalid credentials".into())),
        );
        assert_eq!(
            event,
            ClientEvent::ActionFailed {
                action: ActionKind::Login,
                code: "http_status".into(),
                notice: "Invalid credentials".into(),
            }
        );

        let event = normalize_action_failure(
            ActionKind::FetchFeed,
            &ClientError::network("connection reset"),
        );
        assert_eq!(
            event,
            ClientEvent::ActionFailed {
                action: ActionKind::FetchFeed,
                code: "network_error".into(),
                notice: "Failed to load new people.".into(),
            }
        );
    }
}
