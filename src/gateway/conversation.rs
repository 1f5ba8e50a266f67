//! Conversation history for one gateway session.

use std::collections::VecDeque;

use crate::types::{ChatMessage, Sentiment};

/// Bounded history of user and assistant turns.
///
/// User turns are stored as the user typed them, not as the enhanced
/// prompt actually sent, so history stays readable when replayed.
#[derive(Debug)]
pub struct Conversation {
    turns: VecDeque<ChatMessage>,
    max_turns: usize,
    user_messages: usize,
    last_sentiment: Option<Sentiment>,
}

impl Conversation {
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            max_turns,
            user_messages: 0,
            last_sentiment: None,
        }
    }

    pub fn push_user(&mut self, text: &str, sentiment: Sentiment) {
        self.user_messages += 1;
        self.last_sentiment = Some(sentiment);
        self.push(ChatMessage::user(text));
    }

    pub fn push_assistant(&mut self, text: &str) {
        self.push(ChatMessage::assistant(text));
    }

    fn push(&mut self, message: ChatMessage) {
        if self.max_turns == 0 {
            return;
        }
        while self.turns.len() >= self.max_turns {
            self.turns.pop_front();
        }
        self.turns.push_back(message);
    }

    /// The most recent `n` turns, oldest first.
    pub fn recent(&self, n: usize) -> Vec<ChatMessage> {
        let skip = self.turns.len().saturating_sub(n);
        self.turns.iter().skip(skip).cloned().collect()
    }

    /// User messages received so far (not capped by the history bound).
    pub fn message_count(&self) -> usize {
        self.user_messages
    }

    pub fn last_sentiment(&self) -> Option<Sentiment> {
        self.last_sentiment
    }

    pub fn clear(&mut self) {
        self.turns.clear();
        self.user_messages = 0;
        self.last_sentiment = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_returns_tail_in_order() {
        let mut conversation = Conversation::new(10);
        for i in 0..4 {
            conversation.push_user(&format!("q{i}"), Sentiment::Neutral);
            conversation.push_assistant(&format!("a{i}"));
        }
        let recent: Vec<String> = conversation.recent(3).into_iter().map(|m| m.content).collect();
        assert_eq!(recent, ["a2", "q3", "a3"]);
    }

    #[test]
    fn history_is_bounded_but_count_is_not() {
        let mut conversation = Conversation::new(2);
        for i in 0..5 {
            conversation.push_user(&format!("q{i}"), Sentiment::Negative);
        }
        assert_eq!(conversation.recent(10).len(), 2);
        assert_eq!(conversation.message_count(), 5);
        assert_eq!(conversation.last_sentiment(), Some(Sentiment::Negative));
    }
}
