//! Testing utilities for the story pipeline.
//!
//! This module provides tools for deterministic tests:
//! - `MockBackend` returns scripted replies and records every call
//! - `ScriptedUser` answers the revision loop from a fixed script
//! - Assertion helpers for inspecting recorded prompts

use crate::backend::{BackendError, TextBackend};
use crate::session::{SessionEvent, UserPrompter};
use crate::story::StoryDraft;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

type Handler = Box<dyn Fn(&str, f32) -> Result<String, BackendError> + Send + Sync>;

/// A recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendCall {
    pub prompt: String,
    pub temperature: f32,
}

/// A backend that returns scripted replies in order.
///
/// Once the script runs out every call fails, unless a handler was installed
/// with [`MockBackend::from_fn`].
pub struct MockBackend {
    replies: Mutex<VecDeque<Result<String, BackendError>>>,
    handler: Option<Handler>,
    calls: Mutex<Vec<BackendCall>>,
}

impl MockBackend {
    /// Create a backend with an empty script.
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            handler: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Create a backend that answers every call with `handler`.
    pub fn from_fn<F>(handler: F) -> Self
    where
        F: Fn(&str, f32) -> Result<String, BackendError> + Send + Sync + 'static,
    {
        Self {
            handler: Some(Box::new(handler)),
            ..Self::new()
        }
    }

    /// Queue a successful reply.
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.queue(Ok(text.into()));
        self
    }

    /// Queue a failed call.
    pub fn fail(self, message: impl Into<String>) -> Self {
        self.queue(Err(BackendError::new(message)));
        self
    }

    /// Queue a reply on a shared backend.
    pub fn queue(&self, reply: Result<String, BackendError>) {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(reply);
    }

    /// All calls made so far, oldest first.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// The most recent prompt, if any call was made.
    pub fn last_prompt(&self) -> Option<String> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .map(|c| c.prompt.clone())
    }

    /// Number of scripted replies not yet consumed.
    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextBackend for MockBackend {
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, BackendError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(BackendCall {
                prompt: prompt.to_string(),
                temperature,
            });

        let scripted = self
            .replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();

        match (scripted, &self.handler) {
            (Some(reply), _) => reply,
            (None, Some(handler)) => handler(prompt, temperature),
            (None, None) => Err(BackendError::new("MockBackend has no more scripted replies")),
        }
    }
}

/// One scripted answer to the revision loop.
#[derive(Debug, Clone)]
struct ScriptedReply {
    decision: String,
    feedback: Option<String>,
}

/// A user that answers the revision loop from a fixed script.
///
/// When the script runs out the user's input is treated as closed.
#[derive(Debug, Default)]
pub struct ScriptedUser {
    script: VecDeque<ScriptedReply>,
    pending_feedback: Option<String>,
    /// Names of the session events observed, in order.
    pub events: Vec<&'static str>,
    /// Versions of the drafts shown when a decision was asked for.
    pub shown_versions: Vec<u32>,
}

impl ScriptedUser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for a change, answering the feedback prompt with `feedback`.
    pub fn then_change(mut self, feedback: impl Into<String>) -> Self {
        self.script.push_back(ScriptedReply {
            decision: "yes".to_string(),
            feedback: Some(feedback.into()),
        });
        self
    }

    /// Reply to the decision prompt with `decision` verbatim.
    pub fn then_reply(mut self, decision: impl Into<String>, feedback: Option<&str>) -> Self {
        self.script.push_back(ScriptedReply {
            decision: decision.into(),
            feedback: feedback.map(str::to_string),
        });
        self
    }

    /// Declare the story finished.
    pub fn then_finish(self) -> Self {
        self.then_reply("no", None)
    }
}

#[async_trait]
impl UserPrompter for ScriptedUser {
    async fn ask_decision(&mut self, draft: &StoryDraft) -> Option<String> {
        self.shown_versions.push(draft.version());
        let reply = self.script.pop_front()?;
        self.pending_feedback = reply.feedback;
        Some(reply.decision)
    }

    async fn ask_feedback(&mut self, _draft: &StoryDraft) -> Option<String> {
        self.pending_feedback.take()
    }

    fn on_event(&mut self, event: SessionEvent<'_>) {
        self.events.push(event.name());
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert that the call at `index` had a prompt containing `needle`.
#[track_caller]
pub fn assert_prompt_contains(backend: &MockBackend, index: usize, needle: &str) {
    let calls = backend.calls();
    let call = calls
        .get(index)
        .unwrap_or_else(|| panic!("Expected call #{index}, only {} made", calls.len()));
    assert!(
        call.prompt.contains(needle),
        "Expected prompt #{index} to contain '{needle}', got:\n{}",
        call.prompt
    );
}

/// Assert that the call at `index` had a prompt NOT containing `needle`.
#[track_caller]
pub fn assert_prompt_lacks(backend: &MockBackend, index: usize, needle: &str) {
    let calls = backend.calls();
    let call = calls
        .get(index)
        .unwrap_or_else(|| panic!("Expected call #{index}, only {} made", calls.len()));
    assert!(
        !call.prompt.contains(needle),
        "Expected prompt #{index} to NOT contain '{needle}', got:\n{}",
        call.prompt
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_backend_replays_script() {
        let backend = MockBackend::new().reply("one").fail("two");

        assert_eq!(backend.complete("a", 0.1).await.unwrap(), "one");
        assert_eq!(backend.complete("b", 0.2).await.unwrap_err().message(), "two");
        assert!(backend.complete("c", 0.3).await.is_err());
        assert_eq!(backend.call_count(), 3);
        assert_eq!(backend.last_prompt().as_deref(), Some("c"));
    }

    #[tokio::test]
    async fn test_mock_backend_handler_after_script() {
        let backend = MockBackend::from_fn(|prompt, _| Ok(format!("echo: {}", prompt.len())))
            .reply("scripted");

        assert_eq!(backend.complete("abc", 0.5).await.unwrap(), "scripted");
        assert_eq!(backend.complete("abc", 0.5).await.unwrap(), "echo: 3");
        assert_eq!(backend.remaining(), 0);
    }

    #[tokio::test]
    async fn test_scripted_user() {
        let mut user = ScriptedUser::new().then_change("add a dragon").then_finish();
        let draft = StoryDraft::initial("story");

        assert_eq!(user.ask_decision(&draft).await.as_deref(), Some("yes"));
        assert_eq!(user.ask_feedback(&draft).await.as_deref(), Some("add a dragon"));
        assert_eq!(user.ask_decision(&draft).await.as_deref(), Some("no"));
        assert_eq!(user.ask_feedback(&draft).await, None);
        assert_eq!(user.ask_decision(&draft).await, None);
        assert_eq!(user.shown_versions, vec![0, 0, 0]);
    }
}
