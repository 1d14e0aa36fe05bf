//! Story pipeline configuration.

/// Environment variable that overrides the backend model.
pub const MODEL_ENV_VAR: &str = "BEDTIME_MODEL";

/// Sampling temperature for each stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Temperatures {
    /// Intent extraction. Low, favoring consistent structured output.
    pub analysis: f32,
    /// First draft. High, favoring creative variation.
    pub drafting: f32,
    /// Critique. Moderate.
    pub critique: f32,
    /// Refinement, both automatic and user-driven.
    pub refinement: f32,
}

impl Default for Temperatures {
    fn default() -> Self {
        Self {
            analysis: 0.2,
            drafting: 0.9,
            critique: 0.7,
            refinement: 0.9,
        }
    }
}

/// Configuration for a [`crate::Storyteller`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoryConfig {
    /// Age band of the listener, e.g. "5-10".
    pub age_band: String,

    /// How long the story should take to read aloud, e.g. "5-10 minutes".
    pub story_length: Option<String>,

    /// Per-stage sampling temperatures.
    pub temperatures: Temperatures,

    /// Model to use (defaults to the backend's model).
    pub model: Option<String>,

    /// Maximum tokens per backend call.
    pub max_tokens: usize,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            age_band: "5-10".to_string(),
            story_length: None,
            temperatures: Temperatures::default(),
            model: None,
            max_tokens: crate::backend::DEFAULT_MAX_TOKENS,
        }
    }
}

impl StoryConfig {
    /// Default configuration with the model taken from `BEDTIME_MODEL` if set.
    pub fn from_env() -> Self {
        let model = std::env::var(MODEL_ENV_VAR)
            .ok()
            .filter(|m| !m.trim().is_empty());
        Self {
            model,
            ..Self::default()
        }
    }

    /// Set the listener's age band.
    pub fn with_age_band(mut self, age_band: impl Into<String>) -> Self {
        self.age_band = age_band.into();
        self
    }

    /// Set the target read-aloud length.
    pub fn with_story_length(mut self, length: impl Into<String>) -> Self {
        self.story_length = Some(length.into());
        self
    }

    /// Set per-stage temperatures.
    pub fn with_temperatures(mut self, temperatures: Temperatures) -> Self {
        self.temperatures = temperatures;
        self
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set max tokens per backend call.
    pub fn with_max_tokens(mut self, tokens: usize) -> Self {
        self.max_tokens = tokens;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_temperatures() {
        let t = Temperatures::default();
        assert!(t.analysis < t.critique);
        assert!(t.critique < t.drafting);
        assert_eq!(t.drafting, t.refinement);
    }

    #[test]
    fn test_story_config_builder() {
        let config = StoryConfig::default()
            .with_age_band("3-5")
            .with_story_length("5-10 minutes")
            .with_model("claude-3-5-haiku-20241022")
            .with_max_tokens(1024);

        assert_eq!(config.age_band, "3-5");
        assert_eq!(config.story_length.as_deref(), Some("5-10 minutes"));
        assert_eq!(config.model.as_deref(), Some("claude-3-5-haiku-20241022"));
        assert_eq!(config.max_tokens, 1024);
    }
}
