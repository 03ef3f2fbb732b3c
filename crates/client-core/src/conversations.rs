use std::cmp::Reverse;

use crate::types::{Conversation, Message};

/// Conversation summaries for the chat list, most recent activity first.
#[derive(Debug, Clone, Default)]
pub struct ConversationList {
    conversations: Vec<Conversation>,
}

impl ConversationList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn get(&self, conversation_id: &str) -> Option<&Conversation> {
        self.conversations
            .iter()
            .find(|conversation| conversation.id == conversation_id)
    }

    pub fn replace(&mut self, conversations: Vec<Conversation>) {
        self.conversations = conversations;
        self.sort();
    }

    /// Insert or refresh one conversation. Initiating a chat twice lands here
    /// with the same id and leaves a single entry.
    pub fn upsert(&mut self, conversation: Conversation) {
        match self
            .conversations
            .iter_mut()
            .find(|existing| existing.id == conversation.id)
        {
            Some(existing) => *existing = conversation,
            None => self.conversations.push(conversation),
        }
        self.sort();
    }

    /// Reflect a sent or received message in the summary.
    pub fn record_message(&mut self, message: &Message) {
        let Some(conversation) = self
            .conversations
            .iter_mut()
            .find(|conversation| conversation.id == message.conversation_id)
        else {
            return;
        };
        conversation.last_message = Some(message.content.clone());
        conversation.last_message_time = Some(message.created_at);
        self.sort();
    }

    /// Reset `reader`'s unread counter.
    pub fn mark_read(&mut self, conversation_id: &str, reader: &str) {
        if let Some(conversation) = self
            .conversations
            .iter_mut()
            .find(|conversation| conversation.id == conversation_id)
        {
            conversation.unread_counts.insert(reader.to_owned(), 0);
        }
    }

    pub fn total_unread(&self, user_id: &str) -> u32 {
        self.conversations
            .iter()
            .map(|conversation| conversation.unread_for(user_id))
            .sum()
    }

    pub fn clear(&mut self) {
        self.conversations.clear();
    }

    fn sort(&mut self) {
        self.conversations
            .sort_by_key(|conversation| Reverse(conversation.last_message_time));
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::{DateTime, TimeZone, Utc};

    use super::*;
    use crate::types::UserRef;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().expect("valid timestamp")
    }

    fn conversation(id: &str, last: Option<i64>, unread_me: u32) -> Conversation {
        Conversation {
            id: id.to_owned(),
            participants: vec![UserRef::Id("me".into()), UserRef::Id(format!("p-{id}"))],
            last_message: last.map(|_| "hey".to_owned()),
            last_message_time: last.map(at),
            unread_counts: HashMap::from([("me".to_owned(), unread_me)]),
        }
    }

    #[test]
    fn upsert_is_idempotent_per_id() {
        let mut list = ConversationList::new();
        list.upsert(conversation("c1", None, 0));
        list.upsert(conversation("c1", None, 0));
        assert_eq!(list.conversations().len(), 1);
    }

    #[test]
    fn orders_by_latest_activity() {
        let mut list = ConversationList::new();
        list.replace(vec![
            conversation("old", Some(100), 0),
            conversation("new", Some(200), 0),
            conversation("empty", None, 0),
        ]);
        let ids: Vec<_> = list.conversations().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["new", "old", "empty"]);

        list.record_message(&Message {
            id: "m1".into(),
            conversation_id: "old".into(),
            from_user: "me".into(),
            to_user: "p-old".into(),
            content: "back again".into(),
            created_at: at(300),
            is_read: false,
            is_deleted: false,
        });
        assert_eq!(list.conversations()[0].id, "old");
        assert_eq!(
            list.conversations()[0].last_message.as_deref(),
            Some("back again")
        );
    }

    #[test]
    fn mark_read_resets_reader_counter() {
        let mut list = ConversationList::new();
        list.replace(vec![
            conversation("c1", Some(1), 3),
            conversation("c2", Some(2), 2),
        ]);
        assert_eq!(list.total_unread("me"), 5);

        list.mark_read("c1", "me");
        assert_eq!(list.total_unread("me"), 2);
        assert_eq!(list.get("c1").map(|c| c.unread_for("me")), Some(0));
    }
}
