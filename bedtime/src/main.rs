//! Bedtime story generator.
//!
//! Turns a free-text request into a polished children's story, then keeps
//! revising it until you are happy with it.
//!
//! ```bash
//! cargo run -p bedtime -- --request "a brave rabbit who learns to fly" --age 3-5
//! ```

mod terminal;

use anyhow::Context;
use bedtime_core::{SessionError, StoryConfig, Storyteller};
use clap::Parser;
use std::io;
use std::path::PathBuf;
use terminal::Terminal;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Interactive bedtime story generator.
#[derive(Debug, Parser)]
#[command(name = "bedtime", version, about)]
struct Args {
    /// What the story should be about (asked for interactively if omitted)
    #[arg(short, long)]
    request: Option<String>,

    /// Age band of the listener
    #[arg(long, default_value = "5-10")]
    age: String,

    /// How long the story should take to read aloud, e.g. "5-10 minutes"
    #[arg(long)]
    length: Option<String>,

    /// Model to use (overrides BEDTIME_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// Write the final story to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the first draft and the critic's feedback
    #[arg(long)]
    show_drafts: bool,

    /// Debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn story_config(&self) -> StoryConfig {
        let mut config = StoryConfig::from_env().with_age_band(&self.age);
        if let Some(ref length) = self.length {
            config = config.with_story_length(length);
        }
        if let Some(ref model) = self.model {
            config = config.with_model(model);
        }
        config
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(args.verbose);

    // Check for API key
    if std::env::var("ANTHROPIC_API_KEY").is_err() {
        eprintln!("Error: ANTHROPIC_API_KEY environment variable not set.");
        eprintln!("Please set it in .env file or with: export ANTHROPIC_API_KEY=your_key_here");
        std::process::exit(1);
    }

    let storyteller = Storyteller::from_env(args.story_config())?;

    let stdin = io::stdin();
    let mut terminal = Terminal::new(stdin.lock(), io::stdout(), args.show_drafts);
    let finished = match terminal.run(&storyteller, args.request.clone()).await {
        Ok(finished) => finished,
        // Already printed as [ERROR]
        Err(SessionError::Generation(_)) => std::process::exit(1),
        Err(e) => return Err(e.into()),
    };

    if let (Some(finished), Some(path)) = (finished, args.output.as_ref()) {
        tokio::fs::write(path, finished.story.text())
            .await
            .with_context(|| format!("failed to write story to {}", path.display()))?;
        info!(path = %path.display(), version = finished.story.version(), "story saved");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["bedtime"]);
        assert_eq!(args.age, "5-10");
        assert!(args.request.is_none());
        assert!(!args.show_drafts);
        assert!(args.output.is_none());
    }

    #[test]
    fn test_args_build_story_config() {
        let args = Args::parse_from([
            "bedtime",
            "--request",
            "a sleepy owl",
            "--age",
            "3-5",
            "--length",
            "15-30 minutes",
            "--model",
            "claude-3-5-haiku-20241022",
            "-o",
            "story.txt",
        ]);
        let config = args.story_config();

        assert_eq!(args.request.as_deref(), Some("a sleepy owl"));
        assert_eq!(config.age_band, "3-5");
        assert_eq!(config.story_length.as_deref(), Some("15-30 minutes"));
        assert_eq!(config.model.as_deref(), Some("claude-3-5-haiku-20241022"));
        assert_eq!(args.output, Some(PathBuf::from("story.txt")));
    }

    #[test]
    fn test_args_are_well_formed() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
