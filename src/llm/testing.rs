//! Scripted generation client for tests.
//!
//! Replies are consumed in call order. Once the script runs out every call
//! gets the default reply (empty unless set). Each call is recorded.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::{ChatMessage, LlmClient};
use crate::error::LlmError;

#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Text(String),
    Fail(String),
    /// Never answers within any sane timeout.
    Hang,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub system_prompt: String,
    pub messages: Vec<ChatMessage>,
}

impl RecordedCall {
    /// Concatenated content of every message in the call.
    pub fn user_text(&self) -> String {
        self.messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<ScriptedReply>>,
    calls: Mutex<Vec<RecordedCall>>,
    default_reply: String,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let script = Self::new();
        for reply in replies {
            script.push(ScriptedReply::Text(reply.into()));
        }
        script
    }

    pub fn with_default(mut self, reply: impl Into<String>) -> Self {
        self.default_reply = reply.into();
        self
    }

    pub fn then_reply(self, reply: impl Into<String>) -> Self {
        self.push(ScriptedReply::Text(reply.into()));
        self
    }

    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.push(ScriptedReply::Fail(message.into()));
        self
    }

    pub fn then_hang(self) -> Self {
        self.push(ScriptedReply::Hang);
        self
    }

    pub fn push(&self, reply: ScriptedReply) {
        lock(&self.replies).push_back(reply);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    fn name(&self) -> &'static str {
        "Scripted"
    }

    async fn chat(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
    ) -> Result<String, LlmError> {
        lock(&self.calls).push(RecordedCall {
            system_prompt: system_prompt.to_string(),
            messages: messages.to_vec(),
        });

        let next = lock(&self.replies).pop_front();
        match next {
            Some(ScriptedReply::Text(text)) => Ok(text),
            Some(ScriptedReply::Fail(message)) => Err(LlmError::Api { message }),
            Some(ScriptedReply::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(LlmError::EmptyResponse)
            }
            None => Ok(self.default_reply.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replies_in_order_then_default() {
        let llm = ScriptedLlm::with_replies(["one", "two"]).with_default("rest");
        let msgs = [ChatMessage::user("hi")];

        assert_eq!(llm.chat("s", &msgs).await.unwrap(), "one");
        assert_eq!(llm.chat("s", &msgs).await.unwrap(), "two");
        assert_eq!(llm.chat("s", &msgs).await.unwrap(), "rest");
        assert_eq!(llm.call_count(), 3);
        assert_eq!(llm.calls()[0].user_text(), "hi");
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let llm = ScriptedLlm::new().then_fail("boom");
        let err = llm.chat("s", &[]).await.unwrap_err();
        assert!(err.to_string().contains("boom"));
    }
}
