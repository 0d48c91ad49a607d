//! Renders the messages sent to the backend for each turn.
//!
//! Opening and continuation prompts share one Handlebars template; the
//! `opening` flag in the render context selects the turn-specific lines.

use handlebars::{Handlebars, RenderError, TemplateError};

use crate::session::Turn;
use crate::sys::llm::Content;
use crate::sys::CharacterProfile;

const STORY_TEMPLATE: &str = include_str!("story.hbs");
const TEMPLATE_NAME: &str = "story";

pub const DEFAULT_OPENING_PROMPT: &str = "Your Start:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    Opening,
    Continuation,
}

pub struct PromptComposer {
    registry: Handlebars<'static>,
    opening_prompt: String,
}

impl PromptComposer {
    pub fn builtin() -> Result<Self, TemplateError> {
        Self::with_template(STORY_TEMPLATE)
    }

    pub fn with_template(source: &str) -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_escape_fn(handlebars::no_escape);
        registry.register_template_string(TEMPLATE_NAME, source)?;

        Ok(Self {
            registry,
            opening_prompt: DEFAULT_OPENING_PROMPT.to_string(),
        })
    }

    /// Placeholder user message that follows the opening system prompt.
    pub fn with_opening_prompt(mut self, opening_prompt: impl Into<String>) -> Self {
        self.opening_prompt = opening_prompt.into();
        self
    }

    pub fn system_prompt(
        &self,
        profile: &CharacterProfile,
        kind: TurnKind,
    ) -> Result<String, RenderError> {
        let profile_json = serde_json::to_string_pretty(&profile.details)
            .unwrap_or_else(|_| profile.details.to_string());

        let ctx = serde_json::json!({
            "opening": kind == TurnKind::Opening,
            "name": profile.name,
            "race": profile.race,
            "class": profile.class,
            "behaviour": profile.behaviour,
            "profile": profile_json,
        });

        self.registry.render(TEMPLATE_NAME, &ctx)
    }

    pub fn compose_opening(&self, profile: &CharacterProfile) -> Result<String, RenderError> {
        self.system_prompt(profile, TurnKind::Opening)
    }

    pub fn opening_messages(&self, profile: &CharacterProfile) -> Result<Vec<Content>, RenderError> {
        Ok(vec![
            Content::system(self.compose_opening(profile)?),
            Content::user(self.opening_prompt.clone()),
        ])
    }

    /// Full replay of the session: the backend keeps no memory between calls.
    pub fn compose_continuation(
        &self,
        profile: &CharacterProfile,
        transcript: &[Turn],
        opening: &str,
        utterance: &str,
    ) -> Result<Vec<Content>, RenderError> {
        let mut messages = Vec::with_capacity(transcript.len() * 2 + 3);
        messages.push(Content::system(
            self.system_prompt(profile, TurnKind::Continuation)?,
        ));
        messages.push(Content::assistant(opening));

        for turn in transcript {
            messages.push(Content::user(turn.player.as_str()));
            messages.push(Content::assistant(turn.reply.as_str()));
        }

        messages.push(Content::user(utterance));

        log::debug!(
            "continuation prompt: {} messages, {} turns replayed",
            messages.len(),
            transcript.len()
        );

        Ok(messages)
    }
}
