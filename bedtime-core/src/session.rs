//! Storyteller and StorySession - the primary public API.
//!
//! A [`Storyteller`] wires the analyzer, drafter, critic and refiner to one
//! backend. Each [`StorySession`] it creates owns a single story from request
//! to the user's final confirmation:
//!
//! ```text
//! Analyzing -> Drafting -> Critiquing -> Refining -> AwaitingUserDecision
//!                                                     |            ^
//!                                                     v            |
//!                                                   Done      RefiningUser
//! ```
//!
//! The automatic steps run exactly once per session. After that the user may
//! ask for any number of revisions.

use crate::backend::{ClaudeBackend, TextBackend};
use crate::config::StoryConfig;
use crate::error::SessionError;
use crate::stages::{RequestAnalyzer, StoryCritic, StoryDrafter, StoryRefiner};
use crate::story::{Feedback, Intent, StoryDraft, UserRequest};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Analyzing,
    Drafting,
    Critiquing,
    Refining,
    AwaitingUserDecision,
    RefiningUser,
    Done,
}

impl SessionState {
    /// True for the states the session advances through without user input.
    pub fn is_automatic(self) -> bool {
        matches!(
            self,
            SessionState::Analyzing
                | SessionState::Drafting
                | SessionState::Critiquing
                | SessionState::Refining
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Analyzing => "analyzing",
            SessionState::Drafting => "drafting",
            SessionState::Critiquing => "critiquing",
            SessionState::Refining => "refining",
            SessionState::AwaitingUserDecision => "awaiting user decision",
            SessionState::RefiningUser => "refining user feedback",
            SessionState::Done => "done",
        };
        f.write_str(name)
    }
}

/// The user's answer to "Would you like any changes?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserDecision {
    /// The story is final.
    Finish,
    /// The user wants another revision.
    RequestChanges,
}

impl UserDecision {
    /// Only "no" or "n" (case-insensitive, surrounding whitespace ignored)
    /// finish the session. Every other reply, including an empty one, asks
    /// for changes.
    pub fn parse(reply: &str) -> Self {
        let reply = reply.trim();
        if reply.eq_ignore_ascii_case("no") || reply.eq_ignore_ascii_case("n") {
            UserDecision::Finish
        } else {
            UserDecision::RequestChanges
        }
    }
}

/// Something that just happened in a session.
#[derive(Debug, Clone, Copy)]
pub enum SessionEvent<'a> {
    /// The request was analyzed (possibly to the fallback intent).
    IntentIdentified(&'a Intent),
    /// The first draft was written.
    Drafted(&'a StoryDraft),
    /// The critic reviewed the first draft.
    Critiqued(&'a Feedback),
    /// The critique was applied; the story is ready for the user.
    Polished(&'a StoryDraft),
    /// A user-requested revision was applied.
    Revised(&'a StoryDraft),
}

impl SessionEvent<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::IntentIdentified(_) => "intent_identified",
            SessionEvent::Drafted(_) => "drafted",
            SessionEvent::Critiqued(_) => "critiqued",
            SessionEvent::Polished(_) => "polished",
            SessionEvent::Revised(_) => "revised",
        }
    }
}

/// Source of user input for [`Storyteller::run`].
///
/// Returning `None` means no input can be obtained; the session stops with
/// [`SessionError::InputClosed`].
#[async_trait]
pub trait UserPrompter: Send {
    /// Show `draft` and ask whether the user wants changes.
    async fn ask_decision(&mut self, draft: &StoryDraft) -> Option<String>;

    /// Ask what should change in `draft`.
    async fn ask_feedback(&mut self, draft: &StoryDraft) -> Option<String>;

    /// Progress notification. Ignored by default.
    fn on_event(&mut self, _event: SessionEvent<'_>) {}
}

/// A finished story.
#[derive(Debug, Clone)]
pub struct FinishedStory {
    /// The final draft.
    pub story: StoryDraft,
    /// The intent the story was drafted from.
    pub intent: Intent,
    /// Number of user revisions applied after the automatic pass.
    pub user_revisions: u32,
}

#[derive(Clone)]
struct Stages {
    analyzer: RequestAnalyzer,
    drafter: StoryDrafter,
    critic: StoryCritic,
    refiner: StoryRefiner,
}

/// Builds story sessions over one backend.
#[derive(Clone)]
pub struct Storyteller {
    stages: Stages,
}

impl Storyteller {
    /// Create a storyteller over any backend.
    pub fn new(backend: Arc<dyn TextBackend>, config: StoryConfig) -> Self {
        let t = config.temperatures;
        let stages = Stages {
            analyzer: RequestAnalyzer::new(backend.clone(), t.analysis),
            drafter: StoryDrafter::new(
                backend.clone(),
                config.age_band.clone(),
                config.story_length.clone(),
                t.drafting,
            ),
            critic: StoryCritic::new(backend.clone(), config.age_band.clone(), t.critique),
            refiner: StoryRefiner::new(backend, config.age_band.clone(), t.refinement),
        };
        Self { stages }
    }

    /// Create a storyteller backed by Claude.
    ///
    /// Requires `ANTHROPIC_API_KEY` environment variable to be set.
    pub fn from_env(config: StoryConfig) -> Result<Self, SessionError> {
        let mut backend = ClaudeBackend::from_env()?.with_max_tokens(config.max_tokens);
        if let Some(ref model) = config.model {
            backend = backend.with_model(model);
        }
        Ok(Self::new(Arc::new(backend), config))
    }

    pub fn analyzer(&self) -> &RequestAnalyzer {
        &self.stages.analyzer
    }

    /// Begin a session in the `Analyzing` state. No backend call is made yet.
    pub fn session(&self, request: impl Into<UserRequest>) -> StorySession {
        StorySession {
            stages: self.stages.clone(),
            request: request.into(),
            state: SessionState::Analyzing,
            intent: None,
            draft: None,
            feedback: None,
            user_revisions: 0,
        }
    }

    /// Run the automatic pass and return a session awaiting the user.
    pub async fn start(&self, request: impl Into<UserRequest>) -> Result<StorySession, SessionError> {
        let mut session = self.session(request);
        session.polish().await?;
        Ok(session)
    }

    /// Drive a whole session, asking `user` for decisions and feedback.
    ///
    /// Any generation failure ends the run and is returned verbatim.
    pub async fn run<U>(
        &self,
        request: impl Into<UserRequest>,
        user: &mut U,
    ) -> Result<FinishedStory, SessionError>
    where
        U: UserPrompter + ?Sized,
    {
        let mut session = self.session(request);
        while let Some(event) = session.step().await? {
            user.on_event(event);
        }

        loop {
            let draft = session.require_draft()?;
            let reply = user
                .ask_decision(draft)
                .await
                .ok_or(SessionError::InputClosed)?;

            if session.decide(&reply)? == UserDecision::Finish {
                break;
            }

            let draft = session.require_draft()?;
            let feedback = user
                .ask_feedback(draft)
                .await
                .ok_or(SessionError::InputClosed)?;
            let revised = session.revise(&feedback).await?;
            user.on_event(SessionEvent::Revised(revised));
        }

        session.finish()
    }
}

/// One story from request to final confirmation.
pub struct StorySession {
    stages: Stages,
    request: UserRequest,
    state: SessionState,
    intent: Option<Intent>,
    draft: Option<StoryDraft>,
    feedback: Option<Feedback>,
    user_revisions: u32,
}

impl fmt::Debug for StorySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorySession")
            .field("request", &self.request)
            .field("state", &self.state)
            .field("intent", &self.intent)
            .field("draft", &self.draft)
            .field("feedback", &self.feedback)
            .field("user_revisions", &self.user_revisions)
            .finish_non_exhaustive()
    }
}

impl StorySession {
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The analyzed intent, once analysis has run.
    pub fn intent(&self) -> Option<&Intent> {
        self.intent.as_ref()
    }

    /// The current draft, once drafting has run.
    pub fn current_draft(&self) -> Option<&StoryDraft> {
        self.draft.as_ref()
    }

    /// The most recent feedback. While `Refining` this is the critique about
    /// to be applied; afterwards it is the feedback that produced the
    /// current draft.
    pub fn feedback(&self) -> Option<&Feedback> {
        self.feedback.as_ref()
    }

    pub fn user_revisions(&self) -> u32 {
        self.user_revisions
    }

    pub fn is_done(&self) -> bool {
        self.state == SessionState::Done
    }

    /// Advance one automatic transition.
    ///
    /// Returns `None` once the session needs the user (or is done). On a
    /// generation failure the state is unchanged, so calling `step` again
    /// retries the failed stage.
    pub async fn step(&mut self) -> Result<Option<SessionEvent<'_>>, SessionError> {
        match self.state {
            SessionState::Analyzing => {
                let intent = self.stages.analyzer.analyze(&self.request).await;
                info!(category = %intent.category, "request analyzed");
                self.state = SessionState::Drafting;
                Ok(Some(SessionEvent::IntentIdentified(
                    self.intent.insert(intent),
                )))
            }
            SessionState::Drafting => {
                let intent = self
                    .intent
                    .as_ref()
                    .ok_or(SessionError::InvalidState(self.state))?;
                let draft = self.stages.drafter.draft(&self.request, intent).await?;
                info!(chars = draft.text().len(), "first draft written");
                self.state = SessionState::Critiquing;
                Ok(Some(SessionEvent::Drafted(self.draft.insert(draft))))
            }
            SessionState::Critiquing => {
                let draft = self.require_draft()?;
                let feedback = self.stages.critic.critique(draft).await?;
                info!("draft critiqued");
                self.state = SessionState::Refining;
                Ok(Some(SessionEvent::Critiqued(self.feedback.insert(feedback))))
            }
            SessionState::Refining => {
                let draft = self.require_draft()?;
                let feedback = self
                    .feedback
                    .as_ref()
                    .ok_or(SessionError::InvalidState(self.state))?;
                let refined = self.stages.refiner.refine(draft, feedback).await?;
                info!(version = refined.version(), "critique applied");
                self.state = SessionState::AwaitingUserDecision;
                Ok(Some(SessionEvent::Polished(self.draft.insert(refined))))
            }
            SessionState::AwaitingUserDecision
            | SessionState::RefiningUser
            | SessionState::Done => Ok(None),
        }
    }

    /// Run every remaining automatic transition.
    pub async fn polish(&mut self) -> Result<&StoryDraft, SessionError> {
        while self.step().await?.is_some() {}
        self.require_draft()
    }

    /// Apply the user's answer to "Would you like any changes?".
    pub fn decide(&mut self, reply: &str) -> Result<UserDecision, SessionError> {
        self.require_awaiting()?;
        let decision = UserDecision::parse(reply);
        if decision == UserDecision::Finish {
            info!(
                version = self.draft.as_ref().map(StoryDraft::version),
                "story accepted"
            );
            self.state = SessionState::Done;
        }
        Ok(decision)
    }

    /// Revise the current draft with user feedback.
    ///
    /// Calling this while awaiting a decision is itself a request for
    /// changes; `decide` need not be called first. The session reports
    /// `RefiningUser` while the refiner runs. On failure, or if the returned
    /// future is dropped before completing, the previous draft stays current
    /// and the session keeps awaiting a decision.
    pub async fn revise(&mut self, feedback: &str) -> Result<&StoryDraft, SessionError> {
        self.require_awaiting()?;
        let Some(draft) = self.draft.as_ref() else {
            return Err(SessionError::InvalidState(self.state));
        };
        let feedback = Feedback::from_user(draft, feedback);
        info!(revision = self.user_revisions + 1, "applying user revision");

        let refining = RefiningUser::enter(&mut self.state);
        let result = self.stages.refiner.refine(draft, &feedback).await;
        drop(refining);

        match result {
            Ok(revised) => {
                info!(version = revised.version(), "user revision applied");
                self.feedback = Some(feedback);
                self.user_revisions += 1;
                Ok(self.draft.insert(revised))
            }
            Err(e) => {
                warn!(error = %e, "user revision failed");
                Err(e.into())
            }
        }
    }

    /// Consume a finished session.
    pub fn finish(self) -> Result<FinishedStory, SessionError> {
        if self.state != SessionState::Done {
            return Err(SessionError::NotFinished);
        }
        match (self.draft, self.intent) {
            (Some(story), Some(intent)) => Ok(FinishedStory {
                story,
                intent,
                user_revisions: self.user_revisions,
            }),
            _ => Err(SessionError::InvalidState(self.state)),
        }
    }

    fn require_draft(&self) -> Result<&StoryDraft, SessionError> {
        self.draft
            .as_ref()
            .ok_or(SessionError::InvalidState(self.state))
    }

    fn require_awaiting(&self) -> Result<(), SessionError> {
        match self.state {
            SessionState::AwaitingUserDecision => Ok(()),
            SessionState::Done => Err(SessionError::Finished),
            other => Err(SessionError::InvalidState(other)),
        }
    }
}

/// Holds a session in `RefiningUser` and returns it to
/// `AwaitingUserDecision` when dropped, including on cancellation.
struct RefiningUser<'a> {
    state: &'a mut SessionState,
}

impl<'a> RefiningUser<'a> {
    fn enter(state: &'a mut SessionState) -> Self {
        *state = SessionState::RefiningUser;
        Self { state }
    }
}

impl Drop for RefiningUser<'_> {
    fn drop(&mut self) {
        *self.state = SessionState::AwaitingUserDecision;
    }
}
