//! Append-only conversation history

use serde::Serialize;

use crate::models::{ChatMessage, Expense};

use super::{QueryResolver, Resolution, GREETING};

/// Ordered chat history for one session, starting with the bot greeting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    pub fn new() -> Self {
        Self {
            messages: vec![ChatMessage::bot(GREETING)],
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Resolve a query and record the exchange
    ///
    /// Blank queries return `None` and leave the transcript untouched. The
    /// user message and the reply are appended together once the reply
    /// exists.
    pub async fn send(
        &mut self,
        resolver: &QueryResolver,
        query: &str,
        expenses: &[Expense],
    ) -> Option<Resolution> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }

        let resolution = resolver.resolve(query, expenses).await;
        self.messages.push(ChatMessage::user(query));
        self.messages.push(ChatMessage::bot(&resolution.reply));
        Some(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{AIClient, MockBackend};
    use crate::chat::{ResolverConfig, FALLBACK_REPLY};
    use crate::models::Sender;

    #[test]
    fn test_new_transcript_has_greeting() {
        let transcript = Transcript::new();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.messages()[0].sender, Sender::Bot);
        assert_eq!(transcript.messages()[0].text, GREETING);
    }

    #[tokio::test]
    async fn test_blank_query_appends_nothing() {
        let resolver = QueryResolver::new(None, ResolverConfig::default());
        let mut transcript = Transcript::new();

        assert!(transcript.send(&resolver, "", &[]).await.is_none());
        assert!(transcript.send(&resolver, "   \n", &[]).await.is_none());
        assert_eq!(transcript.len(), 1);
    }

    #[tokio::test]
    async fn test_send_appends_user_then_bot() {
        let resolver = QueryResolver::new(None, ResolverConfig::default());
        let mut transcript = Transcript::new();

        let res = transcript.send(&resolver, "  total  ", &[]).await.unwrap();
        assert_eq!(transcript.len(), 3);

        let messages = transcript.messages();
        assert_eq!(messages[1], ChatMessage::user("total"));
        assert_eq!(messages[2], ChatMessage::bot(&res.reply));
    }

    #[tokio::test]
    async fn test_failed_fallback_is_recorded() {
        let mock = MockBackend::failing();
        let resolver =
            QueryResolver::new(Some(AIClient::Mock(mock)), ResolverConfig::default());
        let mut transcript = Transcript::new();

        transcript.send(&resolver, "hello?", &[]).await.unwrap();
        transcript.send(&resolver, "total", &[]).await.unwrap();

        let texts: Vec<_> = transcript.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                GREETING,
                "hello?",
                FALLBACK_REPLY,
                "total",
                "💰 Your total spending is ₹0"
            ]
        );
    }
}
