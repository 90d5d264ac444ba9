//! Conversation state and the tagged updates that advance it.
//!
//! The transcript is append-only except for two operations: extending the
//! trailing in-progress assistant reply in place, and the single
//! compensating pop performed when an exchange fails.

use crate::api::ChatMessage;
use crate::core::message::Message;

/// A state transition applied to the conversation. Streaming code never
/// inspects the message list directly; it describes what happened and lets
/// [`Conversation::apply`] keep the invariants.
#[derive(Debug, Clone)]
pub enum ConversationUpdate {
    /// Append a finished message (user turns, seeded history).
    Append(Message),
    /// Replace the content of the trailing assistant message with the full
    /// accumulated text so far, creating the message if the tail is not an
    /// assistant reply yet.
    AppendOrExtendAssistant { content: String },
    /// Remove the last entry, whichever role it has. This mirrors the
    /// recovery behavior of the original client: when a stream fails before
    /// any fragment arrived, it is the just-sent user message that goes.
    RollbackLast,
}

#[derive(Debug, Default, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, update: ConversationUpdate) {
        match update {
            ConversationUpdate::Append(message) => self.messages.push(message),
            ConversationUpdate::AppendOrExtendAssistant { content } => {
                match self.messages.last_mut() {
                    Some(last) if last.is_assistant() => last.content = content,
                    _ => self.messages.push(Message::assistant(content)),
                }
            }
            ConversationUpdate::RollbackLast => {
                self.messages.pop();
            }
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Snapshot in wire form, in transcript order.
    pub fn to_wire(&self) -> Vec<ChatMessage> {
        self.messages.iter().map(Message::to_wire).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::Role;

    fn conversation_with_user_turn() -> Conversation {
        let mut conversation = Conversation::new();
        conversation.apply(ConversationUpdate::Append(Message::user("hello")));
        conversation
    }

    #[test]
    fn extend_creates_assistant_tail_on_first_fragment() {
        let mut conversation = conversation_with_user_turn();
        conversation.apply(ConversationUpdate::AppendOrExtendAssistant {
            content: "Hel".to_string(),
        });

        assert_eq!(conversation.len(), 2);
        let tail = conversation.last().expect("tail");
        assert_eq!(tail.role, Role::Assistant);
        assert_eq!(tail.content, "Hel");
    }

    #[test]
    fn extend_replaces_rather_than_appends() {
        let mut conversation = conversation_with_user_turn();
        for prefix in ["Hel", "Hello", "Hello world"] {
            conversation.apply(ConversationUpdate::AppendOrExtendAssistant {
                content: prefix.to_string(),
            });
        }

        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation.last().expect("tail").content, "Hello world");
    }

    #[test]
    fn tail_passes_through_monotonic_prefixes() {
        let full = "The quick brown fox";
        let mut conversation = conversation_with_user_turn();
        let mut seen = Vec::new();

        let mut accumulated = String::new();
        for chunk in ["The ", "quick ", "brown ", "fox"] {
            accumulated.push_str(chunk);
            conversation.apply(ConversationUpdate::AppendOrExtendAssistant {
                content: accumulated.clone(),
            });
            seen.push(conversation.last().expect("tail").content.clone());
        }

        assert_eq!(seen.len(), 4);
        for window in seen.windows(2) {
            assert!(window[1].starts_with(&window[0]));
        }
        assert_eq!(seen.last().map(String::as_str), Some(full));
    }

    // Pins the observed recovery behavior: the pop targets the list tail,
    // which is the user's own message when no reply fragment arrived.
    #[test]
    fn rollback_removes_user_message_when_no_reply_arrived() {
        let mut conversation = conversation_with_user_turn();
        let before = conversation.len();

        conversation.apply(ConversationUpdate::RollbackLast);

        assert_eq!(conversation.len(), before - 1);
        assert!(conversation.is_empty());
    }

    #[test]
    fn rollback_removes_partial_assistant_message_after_fragments() {
        let mut conversation = conversation_with_user_turn();
        conversation.apply(ConversationUpdate::AppendOrExtendAssistant {
            content: "half a rep".to_string(),
        });

        conversation.apply(ConversationUpdate::RollbackLast);

        assert_eq!(conversation.len(), 1);
        assert_eq!(conversation.last().expect("tail").role, Role::User);
    }

    #[test]
    fn wire_snapshot_preserves_order() {
        let mut conversation = conversation_with_user_turn();
        conversation.apply(ConversationUpdate::AppendOrExtendAssistant {
            content: "hi there".to_string(),
        });
        let wire = conversation.to_wire();

        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0].role, "user");
        assert_eq!(wire[1].role, "assistant");
        assert_eq!(wire[1].content, "hi there");
    }
}
