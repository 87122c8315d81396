//! Offset/limit paging shared by every list in the client.
//!
//! The API never reports a total, so [`Pager::has_more`] is only a guess from
//! the size of the last page. "Load more" stays usable regardless; a page past
//! the end simply appends nothing.

use std::collections::HashSet;

use crate::models::{ChatUser, Comment, Message, Post};

/// Records with a server id.
pub trait Identified {
    fn id(&self) -> i64;
}

impl Identified for Post {
    fn id(&self) -> i64 {
        self.id
    }
}

impl Identified for Comment {
    fn id(&self) -> i64 {
        self.id
    }
}

impl Identified for ChatUser {
    fn id(&self) -> i64 {
        self.id
    }
}

impl Identified for Message {
    fn id(&self) -> i64 {
        self.id
    }
}

/// Append `incoming` to `list`, skipping ids already present. Returns the
/// number of items added.
pub fn append_unique<T: Identified>(list: &mut Vec<T>, incoming: Vec<T>) -> usize {
    let mut seen: HashSet<i64> = list.iter().map(Identified::id).collect();
    let before = list.len();
    list.extend(incoming.into_iter().filter(|item| seen.insert(item.id())));
    list.len() - before
}

/// Client-held cursor for one list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    limit: u32,
    /// Offset the next "load more" will request.
    next_offset: u32,
    last_len: Option<usize>,
}

impl Pager {
    #[must_use]
    pub fn new(limit: u32) -> Self {
        Self {
            limit: limit.max(1),
            next_offset: 0,
            last_len: None,
        }
    }

    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit
    }

    #[must_use]
    pub fn next_offset(&self) -> u32 {
        self.next_offset
    }

    /// 1-based page number for `offset`, for endpoints that page by number.
    #[must_use]
    pub fn page_of(&self, offset: u32) -> u32 {
        offset / self.limit + 1
    }

    /// Record that the page at `offset` came back with `len` items.
    pub fn advance(&mut self, offset: u32, len: usize) {
        self.next_offset = offset.saturating_add(self.limit);
        self.last_len = Some(len);
    }

    pub fn reset(&mut self) {
        self.next_offset = 0;
        self.last_len = None;
    }

    /// Whether another page probably exists.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.last_len.map_or(true, |len| len >= self.limit as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(id: i64) -> Comment {
        Comment {
            id,
            content: format!("c{id}"),
            username: "u".to_string(),
            avatar: String::new(),
            created_at: String::new(),
        }
    }

    #[test]
    fn test_pager_advances_from_requested_offset() {
        let mut pager = Pager::new(30);
        assert_eq!(pager.next_offset(), 0);
        assert!(pager.has_more());

        pager.advance(0, 30);
        assert_eq!(pager.next_offset(), 30);
        assert!(pager.has_more());

        pager.advance(30, 4);
        assert_eq!(pager.next_offset(), 60);
        assert!(!pager.has_more());

        pager.reset();
        assert_eq!(pager.next_offset(), 0);
        assert!(pager.has_more());
    }

    #[test]
    fn test_page_numbers() {
        let pager = Pager::new(10);
        assert_eq!(pager.page_of(0), 1);
        assert_eq!(pager.page_of(10), 2);
        assert_eq!(pager.page_of(25), 3);
    }

    #[test]
    fn test_zero_limit_is_clamped() {
        assert_eq!(Pager::new(0).limit(), 1);
    }

    #[test]
    fn test_append_unique_skips_known_ids() {
        let mut list = vec![comment(1), comment(2)];
        let added = append_unique(&mut list, vec![comment(2), comment(3), comment(3)]);
        assert_eq!(added, 1);
        assert_eq!(list.iter().map(|c| c.id).collect::<Vec<_>>(), vec![1, 2, 3]);

        assert_eq!(append_unique(&mut list, Vec::new()), 0);
    }
}
