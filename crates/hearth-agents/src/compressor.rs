use hearth_common::{Message, Result};
use tracing::info;

use crate::providers::{LlmProvider, LlmRequest};
use crate::session::SessionRecord;

pub const SUMMARIZE_INSTRUCTION: &str = "Summarize this conversation so far in less than 100 \
words, in English. Make sure to state all relevant facts from the user. Assume your last \
message is correct.";

const SUMMARY_PREFIX: &str = "Consider the following conversation context:";

/// Compresses a session's durable history into one cached system message.
/// A session is summarized at most once per process; afterwards the cached
/// summary is returned unchanged, however much the conversation grows.
/// Only an explicit session reset (or the optional every-K-turns knob)
/// causes another summarization.
pub struct ContextCompressor {
    model: String,
    resummarize_every_turns: Option<u32>,
}

impl ContextCompressor {
    pub fn new(model: impl Into<String>, resummarize_every_turns: Option<u32>) -> Self {
        Self {
            model: model.into(),
            resummarize_every_turns,
        }
    }

    /// Compressed context for the coming turn. Empty history yields an
    /// empty context without caching, so the first real history still
    /// gets summarized later.
    pub async fn context_for(
        &self,
        provider: &dyn LlmProvider,
        record: &mut SessionRecord,
        history: &[Message],
    ) -> Result<Vec<Message>> {
        if let Some(summary) = &record.summary {
            if !self.resummarize_due(record) {
                return Ok(summary.clone());
            }
        }
        if history.is_empty() {
            return Ok(Vec::new());
        }

        let summary = self.summarize(provider, history).await?;
        record.summary = Some(summary.clone());
        record.turns_since_summary = 0;
        Ok(summary)
    }

    fn resummarize_due(&self, record: &SessionRecord) -> bool {
        self.resummarize_every_turns
            .is_some_and(|every| every > 0 && record.turns_since_summary >= every)
    }

    async fn summarize(
        &self,
        provider: &dyn LlmProvider,
        history: &[Message],
    ) -> Result<Vec<Message>> {
        let mut messages = history.to_vec();
        messages.push(Message::system(SUMMARIZE_INSTRUCTION));
        let request = LlmRequest::new(&self.model, messages);

        let response = provider.complete(&request).await?;
        info!(
            history_len = history.len(),
            summary_chars = response.message.content.len(),
            "summarized session history"
        );
        Ok(vec![Message::system(format!(
            "{SUMMARY_PREFIX}\n{}",
            response.message.content
        ))])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ScriptedProvider, ScriptedStep};
    use hearth_common::Role;

    fn history() -> Vec<Message> {
        vec![
            Message::user("my name is Marcos and I live in São Paulo"),
            Message::assistant("Noted."),
        ]
    }

    #[tokio::test]
    async fn summary_is_computed_once_and_reused() {
        let provider = ScriptedProvider::new(vec![ScriptedStep::text(
            "Marcos lives in São Paulo.",
        )]);
        let compressor = ContextCompressor::new("test-model", None);
        let mut record = SessionRecord::default();

        let first = compressor
            .context_for(&provider, &mut record, &history())
            .await
            .expect("first summary");
        let second = compressor
            .context_for(&provider, &mut record, &history())
            .await
            .expect("cached summary");

        assert_eq!(provider.call_count(), 1);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].role, Role::System);
        assert!(first[0].content.starts_with(SUMMARY_PREFIX));
        assert!(first[0].content.contains("Marcos lives in São Paulo."));
        assert_eq!(first[0].content, second[0].content);
    }

    #[tokio::test]
    async fn cached_summary_ignores_new_history() {
        let provider = ScriptedProvider::new(vec![ScriptedStep::text("First summary.")]);
        let compressor = ContextCompressor::new("test-model", None);
        let mut record = SessionRecord::default();

        compressor
            .context_for(&provider, &mut record, &history())
            .await
            .expect("first summary");

        let mut grown = history();
        grown.push(Message::user("actually I moved to Recife"));
        grown.push(Message::assistant("Noted."));
        let cached = compressor
            .context_for(&provider, &mut record, &grown)
            .await
            .expect("cached summary");

        assert_eq!(provider.call_count(), 1);
        assert!(cached[0].content.contains("First summary."));
    }

    #[tokio::test]
    async fn empty_history_is_not_summarized_or_cached() {
        let provider = ScriptedProvider::new(vec![ScriptedStep::text("Late summary.")]);
        let compressor = ContextCompressor::new("test-model", None);
        let mut record = SessionRecord::default();

        let empty = compressor
            .context_for(&provider, &mut record, &[])
            .await
            .expect("empty context");
        assert!(empty.is_empty());
        assert_eq!(provider.call_count(), 0);
        assert!(record.summary.is_none());

        // Once there is something to summarize, the cache fills.
        let late = compressor
            .context_for(&provider, &mut record, &history())
            .await
            .expect("late summary");
        assert_eq!(provider.call_count(), 1);
        assert!(late[0].content.contains("Late summary."));
    }

    #[tokio::test]
    async fn summarization_request_appends_the_instruction() {
        let provider = ScriptedProvider::new(vec![ScriptedStep::text("Summary.")]);
        let compressor = ContextCompressor::new("test-model", None);
        let mut record = SessionRecord::default();

        compressor
            .context_for(&provider, &mut record, &history())
            .await
            .expect("summary");

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        let sent = &requests[0].messages;
        assert_eq!(sent.len(), history().len() + 1);
        let last = sent.last().expect("instruction message");
        assert_eq!(last.role, Role::System);
        assert_eq!(last.content, SUMMARIZE_INSTRUCTION);
        assert!(requests[0].tools.is_empty());
    }

    #[tokio::test]
    async fn resummarize_knob_refreshes_after_enough_turns() {
        let provider = ScriptedProvider::new(vec![
            ScriptedStep::text("Old summary."),
            ScriptedStep::text("New summary."),
        ]);
        let compressor = ContextCompressor::new("test-model", Some(2));
        let mut record = SessionRecord::default();

        compressor
            .context_for(&provider, &mut record, &history())
            .await
            .expect("first summary");
        record.turns_since_summary = 2;

        let refreshed = compressor
            .context_for(&provider, &mut record, &history())
            .await
            .expect("refreshed summary");
        assert_eq!(provider.call_count(), 2);
        assert!(refreshed[0].content.contains("New summary."));
        assert_eq!(record.turns_since_summary, 0);
    }
}
