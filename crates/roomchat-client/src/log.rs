//! Ordered message log for one session.
//!
//! Append-only, except for a wholesale replace when the history batch
//! arrives. There is no eviction: every message is kept for the lifetime of
//! the session, and a re-join starts a new session with a new, empty log.

use std::sync::{Arc, OnceLock};

use crate::message::Message;

#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
    /// Shared copy handed to snapshots; dropped on every change.
    shared: OnceLock<Arc<[Message]>>,
}

impl PartialEq for MessageLog {
    fn eq(&self, other: &Self) -> bool {
        self.messages == other.messages
    }
}

impl Eq for MessageLog {}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message at the end.
    pub fn push(&mut self, msg: Message) {
        self.messages.push(msg);
        self.shared.take();
    }

    /// Replace the whole log with `batch`, keeping its order.
    pub fn replace(&mut self, batch: Vec<Message>) {
        self.messages = batch;
        self.shared.take();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    /// Messages appended at or after position `start`.
    pub fn since(&self, start: usize) -> &[Message] {
        self.messages.get(start..).unwrap_or(&[])
    }

    /// The log as a cheaply clonable slice. Copied at most once per change,
    /// so snapshots taken between changes share one allocation.
    pub fn shared(&self) -> Arc<[Message]> {
        self.shared
            .get_or_init(|| Arc::from(self.messages.as_slice()))
            .clone()
    }
}

impl<'a> IntoIterator for &'a MessageLog {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
