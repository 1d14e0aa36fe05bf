//! Line-oriented terminal front end.
//!
//! Reads the request and revision answers one line at a time and prints the
//! story as it moves through the pipeline. Output markers:
//! - `[STORY]` / `[UPDATED STORY]` precede story text
//! - `[FIRST DRAFT]` / `[FEEDBACK]` appear only with `--show-drafts`
//! - `[ERROR]` lines carry generation failures verbatim

use bedtime_core::{FinishedStory, SessionError, SessionEvent, StoryDraft, Storyteller, UserDecision};
use std::io::{self, BufRead, Write};
use tracing::warn;

const REQUEST_PROMPT: &str = "What kind of story would you like tonight? The popular categories are: \
fantasy, adventure, animal, and friendship. Give me something from here or what you want your story to be about. ";
const DECISION_PROMPT: &str = "Would you like any changes? (yes/no): ";
const FEEDBACK_PROMPT: &str = "Please describe what changes you would like to see: ";

/// Interactive session over a reader and a writer.
pub struct Terminal<R, W> {
    input: R,
    output: W,
    show_drafts: bool,
}

impl<R: BufRead, W: Write> Terminal<R, W> {
    pub fn new(input: R, output: W, show_drafts: bool) -> Self {
        Self {
            input,
            output,
            show_drafts,
        }
    }

    /// Run one story session.
    ///
    /// Returns `Ok(None)` when input ends before the user accepts a story.
    /// A failure in the automatic pass is printed and returned; a failed
    /// revision is printed and the user is asked again.
    pub async fn run(
        &mut self,
        storyteller: &Storyteller,
        request: Option<String>,
    ) -> Result<Option<FinishedStory>, SessionError> {
        writeln!(self.output, "Welcome! I am a bedtime story generator")?;

        let request = match request {
            Some(r) => r,
            None => match self.ask(REQUEST_PROMPT)? {
                Some(r) => r,
                None => return Ok(None),
            },
        };

        let mut session = storyteller.session(request);
        loop {
            match session.step().await {
                Ok(Some(event)) => self.render(event)?,
                Ok(None) => break,
                Err(e) => {
                    writeln!(self.output, "[ERROR] {e}")?;
                    return Err(e);
                }
            }
        }

        loop {
            let Some(reply) = self.ask(DECISION_PROMPT)? else {
                warn!("input closed while awaiting a decision");
                return Ok(None);
            };

            if session.decide(&reply)? == UserDecision::Finish {
                writeln!(self.output, "Goodnight")?;
                break;
            }

            let Some(changes) = self.ask(FEEDBACK_PROMPT)? else {
                warn!("input closed while awaiting feedback");
                return Ok(None);
            };

            match session.revise(&changes).await {
                Ok(draft) => self.render(SessionEvent::Revised(draft))?,
                Err(e) => writeln!(self.output, "[ERROR] {e}")?,
            }
        }

        session.finish().map(Some)
    }

    fn render(&mut self, event: SessionEvent<'_>) -> io::Result<()> {
        match event {
            SessionEvent::IntentIdentified(intent) => {
                writeln!(self.output, "Category identified: {} story", intent.category)?;
                if intent.has_character() {
                    writeln!(self.output, "Main character: {}", intent.character)?;
                }
                if intent.has_setting() {
                    writeln!(self.output, "Set in: {}", intent.setting)?;
                }
            }
            SessionEvent::Drafted(draft) if self.show_drafts => {
                self.print_story("[FIRST DRAFT]", draft)?;
            }
            SessionEvent::Critiqued(feedback) if self.show_drafts => {
                writeln!(self.output, "[FEEDBACK]")?;
                writeln!(self.output, "{}", feedback.text())?;
                writeln!(self.output)?;
            }
            SessionEvent::Polished(draft) => self.print_story("[STORY]", draft)?,
            SessionEvent::Revised(draft) => self.print_story("[UPDATED STORY]", draft)?,
            SessionEvent::Drafted(_) | SessionEvent::Critiqued(_) => {}
        }
        self.output.flush()
    }

    fn print_story(&mut self, header: &str, draft: &StoryDraft) -> io::Result<()> {
        writeln!(self.output, "{header}")?;
        for para in draft.paragraphs() {
            writeln!(self.output, "{para}")?;
            writeln!(self.output)?;
        }
        Ok(())
    }

    /// Print `prompt` and read one trimmed line. `None` at end of input.
    fn ask(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bedtime_core::{MockBackend, StoryConfig};
    use std::io::Cursor;
    use std::sync::Arc;

    const INTENT: &str = r#"{"category": "courage", "character": "Pip", "setting": ""}"#;

    fn storyteller(backend: MockBackend) -> (Storyteller, Arc<MockBackend>) {
        let backend = Arc::new(backend);
        (
            Storyteller::new(backend.clone(), StoryConfig::default()),
            backend,
        )
    }

    async fn run(
        teller: &Storyteller,
        input: &str,
        request: Option<&str>,
        show_drafts: bool,
    ) -> (Result<Option<FinishedStory>, SessionError>, String) {
        let mut output = Vec::new();
        let result = {
            let mut terminal = Terminal::new(Cursor::new(input.as_bytes()), &mut output, show_drafts);
            terminal.run(teller, request.map(str::to_string)).await
        };
        (result, String::from_utf8(output).unwrap())
    }

    fn polished() -> MockBackend {
        MockBackend::new()
            .reply(INTENT)
            .reply("Draft zero.")
            .reply("Pacing is rushed.")
            .reply("Pip learned to fly.\n\nThe end.")
    }

    #[tokio::test]
    async fn test_request_read_from_input_then_finish() {
        let (teller, backend) = storyteller(polished());

        let (result, out) = run(&teller, "a brave rabbit\nno\n", None, false).await;

        let finished = result.unwrap().unwrap();
        assert_eq!(finished.story.version(), 1);
        assert!(out.contains("Category identified: courage story"));
        assert!(out.contains("Main character: Pip"));
        assert!(!out.contains("Set in:"));
        assert!(out.contains("[STORY]\nPip learned to fly.\n\nThe end.\n"));
        assert!(!out.contains("[FIRST DRAFT]"));
        assert!(out.trim_end().ends_with("Goodnight"));
        assert!(backend.calls()[0].prompt.contains("a brave rabbit"));
    }

    #[tokio::test]
    async fn test_show_drafts_prints_intermediate_steps() {
        let (teller, _) = storyteller(polished());

        let (_, out) = run(&teller, "n\n", Some("a brave rabbit"), true).await;

        assert!(out.contains("[FIRST DRAFT]\nDraft zero."));
        assert!(out.contains("[FEEDBACK]\nPacing is rushed."));
    }

    #[tokio::test]
    async fn test_revision_loop_until_no() {
        let (teller, _) = storyteller(polished().reply("Shorter.").reply("With a dragon."));

        let (result, out) = run(
            &teller,
            "yes\nmake it shorter\n\nadd a dragon\nNO\n",
            Some("a brave rabbit"),
            false,
        )
        .await;

        let finished = result.unwrap().unwrap();
        assert_eq!(finished.story.text(), "With a dragon.");
        assert_eq!(finished.user_revisions, 2);
        assert_eq!(out.matches("[UPDATED STORY]").count(), 2);
        assert_eq!(out.matches(DECISION_PROMPT).count(), 3);
    }

    #[tokio::test]
    async fn test_failed_revision_is_reported_and_loop_continues() {
        let (teller, _) = storyteller(polished().fail("overloaded").reply("Second try."));

        let (result, out) = run(
            &teller,
            "yes\nadd a dragon\nyes\nadd a dragon\nn\n",
            Some("a brave rabbit"),
            false,
        )
        .await;

        assert!(out.contains("[ERROR] Story refinement failed: overloaded"));
        let finished = result.unwrap().unwrap();
        assert_eq!(finished.story.text(), "Second try.");
        assert_eq!(finished.story.version(), 2);
    }

    #[tokio::test]
    async fn test_drafting_failure_aborts() {
        let (teller, _) = storyteller(MockBackend::new().reply(INTENT).fail("quota exceeded"));

        let (result, out) = run(&teller, "", Some("a brave rabbit"), false).await;

        assert!(matches!(result, Err(SessionError::Generation(_))));
        assert!(out.contains("[ERROR] Story drafting failed: quota exceeded"));
    }

    #[tokio::test]
    async fn test_end_of_input_ends_quietly() {
        let (teller, backend) = storyteller(polished());

        let (result, out) = run(&teller, "", None, false).await;
        assert!(result.unwrap().is_none());
        assert_eq!(backend.call_count(), 0);
        assert!(out.contains(REQUEST_PROMPT));

        let (teller, _) = storyteller(polished());
        let (result, _) = run(&teller, "", Some("a brave rabbit"), false).await;
        assert!(result.unwrap().is_none());
    }
}
