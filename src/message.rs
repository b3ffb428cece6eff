//! Fixed-capacity text payload moved across the transport

use std::borrow::Cow;

/// Payload capacity in bytes, including the NUL terminator
pub const MSG_CAPACITY: usize = 1024;

/// Reserved payload signalling end-of-stream to the consumer
pub const SENTINEL: &str = "EXIT";

/// One message: a NUL-terminated text payload of fixed capacity
///
/// Both transports move the whole backing array, so a message is always
/// self-delimiting regardless of what the slot held before.
#[derive(Clone)]
pub struct Message {
    text: [u8; MSG_CAPACITY],
}

impl Message {
    /// An all-zero message, ready to receive into
    pub fn empty() -> Self {
        Self {
            text: [0u8; MSG_CAPACITY],
        }
    }

    /// Build a message from a line of text, truncating to capacity and
    /// keeping the terminating NUL
    pub fn from_text(text: &str) -> Self {
        let mut msg = Self::empty();
        let len = text.len().min(MSG_CAPACITY - 1);
        msg.text[..len].copy_from_slice(&text.as_bytes()[..len]);
        msg
    }

    /// The end-of-stream marker
    pub fn sentinel() -> Self {
        Self::from_text(SENTINEL)
    }

    /// Whether this payload is the end-of-stream marker
    pub fn is_sentinel(&self) -> bool {
        self.text_bytes() == SENTINEL.as_bytes()
    }

    /// Payload text up to the terminator
    pub fn as_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.text_bytes())
    }

    fn text_bytes(&self) -> &[u8] {
        let end = self
            .text
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(MSG_CAPACITY);
        &self.text[..end]
    }

    pub(crate) fn raw(&self) -> &[u8; MSG_CAPACITY] {
        &self.text
    }

    pub(crate) fn raw_mut(&mut self) -> &mut [u8; MSG_CAPACITY] {
        &mut self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_round_trips() {
        let msg = Message::from_text("hello world");
        assert_eq!(msg.as_text(), "hello world");
        assert!(!msg.is_sentinel());
    }

    #[test]
    fn empty_message_is_empty_text() {
        let msg = Message::empty();
        assert_eq!(msg.as_text(), "");
    }

    #[test]
    fn oversized_text_keeps_terminator() {
        let long = "x".repeat(MSG_CAPACITY * 2);
        let msg = Message::from_text(&long);
        assert_eq!(msg.as_text().len(), MSG_CAPACITY - 1);
        assert_eq!(msg.raw()[MSG_CAPACITY - 1], 0);
    }

    #[test]
    fn sentinel_is_recognized() {
        assert!(Message::sentinel().is_sentinel());
        assert!(Message::from_text(SENTINEL).is_sentinel());
        assert!(!Message::from_text("EXITED").is_sentinel());
    }
}
