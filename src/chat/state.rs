//! Chat view state and its merge rules. No I/O happens here.

use std::collections::HashSet;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::models::{parse_timestamp, ChatUser, Message, User};
use crate::pagination::{append_unique, Pager};

/// Identifies one opened conversation. Responses carrying a stale ticket
/// are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
    pub partner_id: i64,
}

#[derive(Debug, Clone)]
pub struct ChatState {
    users: Vec<ChatUser>,
    users_pager: Pager,
    search: String,

    selected: Option<ChatUser>,
    generation: u64,
    messages: Vec<Message>,
    messages_pager: Pager,
    /// Temporary ids of optimistic messages not yet seen from the server.
    pending: HashSet<i64>,
}

impl ChatState {
    #[must_use]
    pub fn new(page_size: u32) -> Self {
        Self {
            users: Vec::new(),
            users_pager: Pager::new(page_size),
            search: String::new(),
            selected: None,
            generation: 0,
            messages: Vec::new(),
            messages_pager: Pager::new(page_size),
            pending: HashSet::new(),
        }
    }

    // Partner list

    #[must_use]
    pub fn users(&self) -> &[ChatUser] {
        &self.users
    }

    #[must_use]
    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, query: &str) {
        query.trim().clone_into(&mut self.search);
    }

    #[must_use]
    pub fn users_pager(&self) -> Pager {
        self.users_pager
    }

    /// Replace the whole list with a fresh first page.
    pub fn replace_users(&mut self, users: Vec<ChatUser>) {
        self.users_pager.advance(0, users.len());
        self.users = users;
        self.refresh_selected();
    }

    /// Append a "load more" page fetched at `offset`.
    pub fn append_users(&mut self, offset: u32, users: Vec<ChatUser>) -> usize {
        self.users_pager.advance(offset, users.len());
        let added = append_unique(&mut self.users, users);
        self.refresh_selected();
        added
    }

    /// Pick up presence and unread changes for the open conversation.
    fn refresh_selected(&mut self) {
        if let Some(selected) = &mut self.selected {
            if let Some(fresh) = self.users.iter().find(|u| u.id == selected.id) {
                selected.clone_from(fresh);
            }
        }
    }

    // Conversation

    #[must_use]
    pub fn selected(&self) -> Option<&ChatUser> {
        self.selected.as_ref()
    }

    /// Ticket for the open conversation, if any.
    #[must_use]
    pub fn ticket(&self) -> Option<Ticket> {
        self.selected.as_ref().map(|partner| Ticket {
            generation: self.generation,
            partner_id: partner.id,
        })
    }

    #[must_use]
    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.ticket() == Some(ticket)
    }

    /// Open a conversation; the message list starts empty until loaded.
    pub fn select(&mut self, partner: ChatUser) -> Ticket {
        self.generation += 1;
        let partner_id = partner.id;
        self.selected = Some(partner);
        self.clear_conversation();
        Ticket {
            generation: self.generation,
            partner_id,
        }
    }

    pub fn deselect(&mut self) {
        self.generation += 1;
        self.selected = None;
        self.clear_conversation();
    }

    fn clear_conversation(&mut self) {
        self.messages.clear();
        self.pending.clear();
        self.messages_pager.reset();
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn messages_pager(&self) -> Pager {
        self.messages_pager
    }

    #[must_use]
    pub fn is_pending(&self, id: i64) -> bool {
        self.pending.contains(&id)
    }

    /// Replace the conversation with its latest page.
    pub fn replace_messages(&mut self, messages: Vec<Message>) {
        self.messages_pager.advance(0, messages.len());
        self.messages = messages;
        self.pending.clear();
    }

    /// Append an older page fetched at `offset`.
    pub fn append_messages(&mut self, offset: u32, messages: Vec<Message>) -> usize {
        self.messages_pager.advance(offset, messages.len());
        append_unique(&mut self.messages, messages)
    }

    /// Timestamp to poll from: the newest message the server has confirmed.
    ///
    /// Optimistic messages carry a client clock and are skipped so the
    /// server's copy of them is still fetched. Older pages are appended after
    /// newer ones, so the newest is picked by timestamp, not by position.
    #[must_use]
    pub fn since_cursor(&self) -> Option<&str> {
        self.messages
            .iter()
            .filter(|m| !self.pending.contains(&m.id) && !m.created_at.is_empty())
            .max_by_key(|m| parse_timestamp(&m.created_at))
            .map(|m| m.created_at.as_str())
    }

    /// Merge a poll result. Returns the number of messages added.
    ///
    /// A message is dropped if its id is known or if it is not strictly newer
    /// than the cursor. A server copy of one of our optimistic messages
    /// replaces it in place instead of being added.
    pub fn merge_new(&mut self, incoming: Vec<Message>) -> usize {
        let cursor = self.since_cursor().and_then(parse_timestamp);
        let mut known: HashSet<i64> = self.messages.iter().map(|m| m.id).collect();
        let mut added = 0;

        for message in incoming {
            if known.contains(&message.id) {
                continue;
            }
            if let (Some(cursor), Some(at)) = (cursor, parse_timestamp(&message.created_at)) {
                if at <= cursor {
                    continue;
                }
            }
            known.insert(message.id);

            if let Some(pos) = self.messages.iter().position(|m| {
                self.pending.contains(&m.id)
                    && m.sender_id == message.sender_id
                    && m.receiver_id == message.receiver_id
                    && m.message == message.message
            }) {
                self.pending.remove(&self.messages[pos].id);
                self.messages[pos] = message;
                continue;
            }

            self.messages.push(message);
            added += 1;
        }
        added
    }

    /// Append a just-sent message before the server has echoed it. Its id is
    /// the send time in unix milliseconds.
    pub fn push_optimistic(&mut self, me: &User, text: &str, now: DateTime<Utc>) -> Option<i64> {
        let receiver_id = self.selected.as_ref()?.id;
        let mut id = now.timestamp_millis();
        // Two sends in the same millisecond still need distinct ids.
        while self.messages.iter().any(|m| m.id == id) {
            id += 1;
        }

        self.messages.push(Message {
            id,
            sender_id: me.id,
            receiver_id,
            message: text.to_string(),
            created_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            sender_username: me.username.clone(),
            sender_avatar: me.avatar.clone(),
        });
        self.pending.insert(id);
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn me() -> User {
        User {
            id: 1,
            username: "me".to_string(),
            email: String::new(),
            avatar: String::new(),
            is_admin: false,
        }
    }

    fn partner(id: i64) -> ChatUser {
        ChatUser {
            id,
            username: format!("user{id}"),
            avatar: String::new(),
            last_message: None,
            last_message_time: None,
            unread_count: 0,
            is_online: false,
            last_seen: None,
        }
    }

    fn msg(id: i64, from: i64, to: i64, text: &str, at: &str) -> Message {
        Message {
            id,
            sender_id: from,
            receiver_id: to,
            message: text.to_string(),
            created_at: at.to_string(),
            sender_username: String::new(),
            sender_avatar: String::new(),
        }
    }

    #[test]
    fn test_merge_only_strictly_newer_and_unknown() {
        let mut state = ChatState::new(30);
        state.select(partner(2));
        state.replace_messages(vec![
            msg(10, 2, 1, "a", "2024-05-01 10:00:00"),
            msg(11, 1, 2, "b", "2024-05-01 10:00:05"),
        ]);
        assert_eq!(state.since_cursor(), Some("2024-05-01 10:00:05"));

        let added = state.merge_new(vec![
            msg(9, 2, 1, "old", "2024-05-01 09:59:00"),
            msg(11, 1, 2, "b", "2024-05-01 10:00:05"),
            msg(12, 2, 1, "c", "2024-05-01 10:00:05"),
            msg(13, 2, 1, "d", "2024-05-01 10:00:09"),
            msg(13, 2, 1, "d", "2024-05-01 10:00:09"),
        ]);

        assert_eq!(added, 1);
        let ids: Vec<i64> = state.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![10, 11, 13]);
    }

    #[test]
    fn test_merge_without_cursor_dedups_by_id() {
        let mut state = ChatState::new(30);
        state.select(partner(2));
        let added = state.merge_new(vec![
            msg(1, 2, 1, "x", "garbage"),
            msg(1, 2, 1, "x", "garbage"),
            msg(2, 2, 1, "y", ""),
        ]);
        assert_eq!(added, 2);
    }

    #[test]
    fn test_optimistic_message_is_reconciled() {
        let mut state = ChatState::new(30);
        state.select(partner(2));
        state.replace_messages(vec![msg(10, 2, 1, "salom", "2024-05-01 10:00:00")]);

        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 30).unwrap();
        let temp_id = state.push_optimistic(&me(), "qalaysan?", now).unwrap();
        assert_eq!(temp_id, now.timestamp_millis());
        assert!(state.is_pending(temp_id));
        assert_eq!(state.messages().last().unwrap().message, "qalaysan?");
        // The cursor ignores the client-stamped message.
        assert_eq!(state.since_cursor(), Some("2024-05-01 10:00:00"));

        let added = state.merge_new(vec![
            msg(11, 1, 2, "qalaysan?", "2024-05-01 10:00:29"),
            msg(12, 2, 1, "yaxshi", "2024-05-01 10:00:40"),
        ]);

        assert_eq!(added, 1);
        let ids: Vec<i64> = state.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![10, 11, 12]);
        assert!(!state.is_pending(temp_id));
    }

    #[test]
    fn test_optimistic_requires_selection() {
        let mut state = ChatState::new(30);
        assert_eq!(state.push_optimistic(&me(), "hi", Utc::now()), None);
    }

    #[test]
    fn test_same_millisecond_sends_get_distinct_ids() {
        let mut state = ChatState::new(30);
        state.select(partner(2));
        let now = Utc::now();
        let a = state.push_optimistic(&me(), "one", now).unwrap();
        let b = state.push_optimistic(&me(), "two", now).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_tickets_go_stale() {
        let mut state = ChatState::new(30);
        let first = state.select(partner(2));
        assert!(state.is_current(first));

        let second = state.select(partner(3));
        assert!(!state.is_current(first));
        assert!(state.is_current(second));

        state.deselect();
        assert!(!state.is_current(second));
        assert!(state.ticket().is_none());

        // Reselecting the same partner still invalidates older tickets.
        let third = state.select(partner(3));
        assert_ne!(second, third);
    }

    #[test]
    fn test_replace_users_refreshes_selected_presence() {
        let mut state = ChatState::new(30);
        state.select(partner(2));

        let mut online = partner(2);
        online.is_online = true;
        online.unread_count = 3;
        state.replace_users(vec![partner(5), online]);

        let selected = state.selected().unwrap();
        assert!(selected.is_online);
        assert_eq!(selected.unread_count, 3);
        assert_eq!(state.users().len(), 2);
        assert_eq!(state.users_pager().next_offset(), 30);
    }

    #[test]
    fn test_replace_users_is_not_a_merge() {
        let mut state = ChatState::new(30);
        state.replace_users(vec![partner(1), partner(2)]);
        state.replace_users(vec![partner(3)]);
        assert_eq!(state.users().iter().map(|u| u.id).collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn test_append_pages() {
        let mut state = ChatState::new(2);
        state.replace_users(vec![partner(1), partner(2)]);
        let added = state.append_users(2, vec![partner(2), partner(3)]);
        assert_eq!(added, 1);
        assert_eq!(state.users_pager().next_offset(), 4);

        state.select(partner(1));
        state.replace_messages(vec![msg(5, 1, 9, "n", "2024-01-01 00:00:05")]);
        let added = state.append_messages(2, vec![msg(4, 1, 9, "o", "2024-01-01 00:00:04")]);
        assert_eq!(added, 1);
        assert_eq!(state.messages().len(), 2);
    }

    #[test]
    fn test_cursor_survives_older_page() {
        let mut state = ChatState::new(2);
        state.select(partner(2));
        state.replace_messages(vec![
            msg(10, 2, 1, "a", "2024-05-01 10:00:00"),
            msg(11, 1, 2, "b", "2024-05-01 10:05:00"),
        ]);
        state.append_messages(2, vec![msg(5, 2, 1, "old", "2024-04-01 09:00:00")]);

        assert_eq!(state.messages().last().map(|m| m.id), Some(5));
        assert_eq!(state.since_cursor(), Some("2024-05-01 10:05:00"));

        // Nothing between the older page and the newest message is re-added.
        let added = state.merge_new(vec![msg(6, 2, 1, "mid", "2024-04-15 12:00:00")]);
        assert_eq!(added, 0);
        let added = state.merge_new(vec![msg(12, 2, 1, "new", "2024-05-01 10:06:00")]);
        assert_eq!(added, 1);
    }
}
