//! Chat surface state: the message log and the current quick replies.

use crate::protocol::QuickReply;

pub const GREETING: &str = "Hello! I'm your Creative Wand.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    Wand,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub speaker: Speaker,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLog {
    entries: Vec<ChatEntry>,
    quick_replies: Vec<QuickReply>,
}

impl Default for ChatLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatLog {
    /// A fresh log opening with the wand's greeting.
    pub fn new() -> Self {
        ChatLog {
            entries: vec![ChatEntry {
                speaker: Speaker::Wand,
                text: GREETING.to_string(),
            }],
            quick_replies: Vec::new(),
        }
    }

    pub fn push_wand(&mut self, text: impl Into<String>) {
        self.entries.push(ChatEntry {
            speaker: Speaker::Wand,
            text: text.into(),
        });
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.entries.push(ChatEntry {
            speaker: Speaker::User,
            text: text.into(),
        });
    }

    /// Replace the quick replies wholesale; `None` clears them.
    pub fn set_quick_replies(&mut self, options: Option<Vec<QuickReply>>) {
        self.quick_replies = options.unwrap_or_default();
    }

    pub fn clear_quick_replies(&mut self) {
        self.quick_replies.clear();
    }

    pub fn quick_replies(&self) -> &[QuickReply] {
        &self.quick_replies
    }

    /// Look up a quick reply by its 1-based position.
    pub fn quick_reply(&self, number: usize) -> Option<&QuickReply> {
        number.checked_sub(1).and_then(|i| self.quick_replies.get(i))
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&ChatEntry> {
        self.entries.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(label: &str, value: &str) -> QuickReply {
        QuickReply {
            label: label.into(),
            value: value.into(),
        }
    }

    #[test]
    fn test_new_log_starts_with_greeting() {
        let log = ChatLog::new();
        assert_eq!(log.entries().len(), 1);
        assert_eq!(log.entries()[0].speaker, Speaker::Wand);
        assert_eq!(log.entries()[0].text, GREETING);
    }

    #[test]
    fn test_set_quick_replies_replaces_not_merges() {
        let mut log = ChatLog::new();
        log.set_quick_replies(Some(vec![reply("a", "1"), reply("b", "2")]));
        log.set_quick_replies(Some(vec![reply("c", "3")]));
        assert_eq!(log.quick_replies(), &[reply("c", "3")]);
        log.set_quick_replies(None);
        assert!(log.quick_replies().is_empty());
    }

    #[test]
    fn test_quick_reply_is_one_based() {
        let mut log = ChatLog::new();
        log.set_quick_replies(Some(vec![reply("a", "1"), reply("b", "2")]));
        assert!(log.quick_reply(0).is_none());
        assert_eq!(log.quick_reply(1).map(|r| r.value.as_str()), Some("1"));
        assert_eq!(log.quick_reply(2).map(|r| r.value.as_str()), Some("2"));
        assert!(log.quick_reply(3).is_none());
    }

    #[test]
    fn test_push_user_and_last() {
        let mut log = ChatLog::new();
        log.push_user("write");
        assert_eq!(log.last().map(|e| e.speaker), Some(Speaker::User));
    }
}
