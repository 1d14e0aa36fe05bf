//! Prompt builders for each stage.

use crate::story::{Feedback, Intent, StoryDraft, UserRequest};

/// Instruction for intent extraction.
pub fn analysis_prompt(request: &UserRequest) -> String {
    format!(
        r#"You analyze children's bedtime story requests.

From the request below, extract:
- a one-word category (e.g., friendship, courage, fantasy, mystery, love)
- the main character's name, if one is given
- the setting or place, if one is given

## Request
"{request}"

Respond with ONLY a JSON object (no markdown, no explanation outside the JSON), like:
{{"category": "fantasy", "character": "Finn", "setting": "snowy mountains"}}

Use an empty string for a character or setting the request does not mention."#
    )
}

/// Instruction for the first draft.
///
/// Character and setting sentences are left out entirely when the intent
/// has no value for them.
pub fn draft_prompt(
    request: &UserRequest,
    intent: &Intent,
    age_band: &str,
    story_length: Option<&str>,
) -> String {
    let mut details = String::new();
    if intent.has_character() {
        details.push_str(&format!("The main character is {}.\n", intent.character));
    }
    if intent.has_setting() {
        details.push_str(&format!("The story takes place in {}.\n", intent.setting));
    }

    let length = story_length
        .map(|l| format!("- Takes about {l} to read aloud.\n"))
        .unwrap_or_default();

    format!(
        r#"You are a warm and creative storyteller who writes bedtime stories for children aged {age_band}.
The story should reflect the category: {category}
{details}
The user requested: "{request}"

Write a bedtime story that:
- Has 5 short paragraphs with a clear beginning, middle, and comforting end.
- Includes a gentle moral and imaginative elements suitable for young listeners.
{length}- Does NOT use asterisks or any other markdown formatting."#,
        category = intent.category,
    )
}

/// Instruction for the critique pass.
pub fn critique_prompt(draft: &StoryDraft, age_band: &str) -> String {
    format!(
        r#"You are an expert children's literature critic.
Evaluate the following story for:
- Age-appropriateness ({age_band})
- Story arc quality
- Clarity of moral
- Creativity
- Emotional tone

Then give constructive feedback and suggest one or two improvements.

STORY:
{story}"#,
        story = draft.text(),
    )
}

/// Instruction for a revision, from either critic or user feedback.
pub fn refine_prompt(draft: &StoryDraft, feedback: &Feedback, age_band: &str) -> String {
    format!(
        r#"You are a children's storyteller revising your work for children aged {age_band}.

Original story:
{story}

Feedback:
{feedback}

Improve the story while keeping it warm, age-appropriate, and imaginative.
Reply with the full revised story only. Do NOT use asterisks or any other markdown formatting."#,
        story = draft.text(),
        feedback = feedback.text(),
    )
}
