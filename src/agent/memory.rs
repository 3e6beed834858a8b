//! Append-only conversation log owned by one agent.

use serde::{Deserialize, Serialize};

use crate::types::Message;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    messages: Vec<Message>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
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

    /// Number of earlier assistant turns whose content equals the most
    /// recent assistant turn. Zero when that turn is empty.
    pub fn repeated_assistant_responses(&self) -> usize {
        let Some(index) = self.messages.iter().rposition(Message::is_assistant) else {
            return 0;
        };
        let last = &self.messages[index].content;
        if last.is_empty() {
            return 0;
        }
        self.messages[..index]
            .iter()
            .rev()
            .filter(|message| message.is_assistant() && message.content == *last)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_only_prior_identical_assistant_turns() {
        let mut memory = Memory::new();
        memory.push(Message::user("same"));
        memory.push(Message::assistant("same"));
        assert_eq!(memory.repeated_assistant_responses(), 0);

        memory.push(Message::assistant("different"));
        memory.push(Message::assistant("same"));
        memory.push(Message::tool_result("call_1", "search", "same"));
        assert_eq!(memory.repeated_assistant_responses(), 1);
    }

    #[test]
    fn empty_assistant_content_never_counts() {
        let mut memory = Memory::new();
        memory.push(Message::assistant(""));
        memory.push(Message::assistant(""));
        assert_eq!(memory.repeated_assistant_responses(), 0);
    }
}
