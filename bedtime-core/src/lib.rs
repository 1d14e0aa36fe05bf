//! Bedtime story pipeline with an iterative draft-critique-refine loop.
//!
//! This crate provides:
//! - Request analysis that extracts a category, character and setting
//! - Story drafting, critique and refinement stages over a text backend
//! - A session state machine with an unbounded user revision loop
//! - Mock backends and scripted users for deterministic tests
//!
//! # Quick Start
//!
//! ```ignore
//! use bedtime_core::{StoryConfig, Storyteller, UserDecision, UserRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let storyteller = Storyteller::from_env(StoryConfig::default())?;
//!
//!     let mut session = storyteller.session(UserRequest::new("a brave rabbit who learns to fly"));
//!     while let Some(event) = session.step().await? {
//!         println!("{}", event.name());
//!     }
//!
//!     if let Some(draft) = session.current_draft() {
//!         println!("{}", draft.text());
//!     }
//!
//!     session.revise("add a dragon").await?;
//!     if session.decide("no")? == UserDecision::Finish {
//!         let finished = session.finish()?;
//!         println!("{}", finished.story.text());
//!     }
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod session;
pub mod stages;
pub mod story;
pub mod testing;

// Primary public API
pub use backend::{BackendError, ClaudeBackend, TextBackend};
pub use config::{StoryConfig, Temperatures};
pub use error::{GenerationError, SessionError};
pub use session::{
    FinishedStory, SessionEvent, SessionState, StorySession, Storyteller, UserDecision,
    UserPrompter,
};
pub use stages::{RequestAnalyzer, Stage, StoryCritic, StoryDrafter, StoryRefiner};
pub use story::{Feedback, FeedbackSource, Intent, StoryDraft, UserRequest};
pub use testing::{MockBackend, ScriptedUser};
