use std::sync::Arc;
use std::time::Instant;

use rand::Rng;

use crate::prompt::PromptComposer;
use crate::sys::llm::{Content, GenerationError, GenerationOptions, Generator};
use crate::sys::CharacterProfile;

pub const START_SENTINEL: &str = "start game";

/// Seeds are drawn from `0..SEED_RANGE`.
pub const SEED_RANGE: u32 = 1_000_000;

pub fn is_start_sentinel(utterance: &str) -> bool {
    utterance.trim().eq_ignore_ascii_case(START_SENTINEL)
}

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("generation unavailable: {0}")]
    GenerationUnavailable(#[from] GenerationError),
    #[error("prompt render err: {0}")]
    Prompt(#[from] handlebars::RenderError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub player: String,
    pub reply: String,
}

impl Turn {
    pub fn new(player: impl Into<String>, reply: impl Into<String>) -> Self {
        Self {
            player: player.into(),
            reply: reply.into(),
        }
    }
}

/// One play-through. Only [`GameMaster::handle_action`] grows the transcript.
#[derive(Debug, Clone)]
pub struct Session {
    seed: u32,
    profile: Arc<CharacterProfile>,
    opening: String,
    transcript: Vec<Turn>,
}

impl Session {
    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn profile(&self) -> &CharacterProfile {
        &self.profile
    }

    pub fn opening(&self) -> &str {
        &self.opening
    }

    pub fn transcript(&self) -> &[Turn] {
        &self.transcript
    }

    fn options(&self) -> GenerationOptions {
        GenerationOptions::deterministic(self.seed)
    }
}

pub struct GameMaster<G> {
    composer: PromptComposer,
    generator: G,
    debug_llm: bool,
}

impl<G: Generator> GameMaster<G> {
    pub fn new(composer: PromptComposer, generator: G) -> Self {
        Self {
            composer,
            generator,
            debug_llm: false,
        }
    }

    /// Log every message list sent to the backend.
    pub fn with_debug_llm(mut self, debug_llm: bool) -> Self {
        self.debug_llm = debug_llm;
        self
    }

    pub fn create_session(&self, profile: Arc<CharacterProfile>) -> Result<Session, GameError> {
        let seed = rand::thread_rng().gen_range(0..SEED_RANGE);
        self.create_session_with_seed(profile, seed)
    }

    pub fn create_session_with_seed(
        &self,
        profile: Arc<CharacterProfile>,
        seed: u32,
    ) -> Result<Session, GameError> {
        log::info!("creating session for {} with seed {seed}", profile.name);

        let messages = self.composer.opening_messages(&profile)?;
        let opening = self.generate(&messages, GenerationOptions::deterministic(seed))?;

        Ok(Session {
            seed,
            profile,
            opening,
            transcript: Vec::new(),
        })
    }

    pub fn handle_action(
        &self,
        utterance: &str,
        session: &mut Session,
    ) -> Result<String, GameError> {
        if is_start_sentinel(utterance) {
            log::debug!("start sentinel, replaying opening");
            return Ok(session.opening.clone());
        }

        let messages = self.composer.compose_continuation(
            &session.profile,
            &session.transcript,
            &session.opening,
            utterance,
        )?;
        let reply = self.generate(&messages, session.options())?;

        session.transcript.push(Turn::new(utterance, reply.clone()));
        log::info!("turn {} recorded", session.transcript.len());

        Ok(reply)
    }

    fn generate(
        &self,
        messages: &[Content],
        options: GenerationOptions,
    ) -> Result<String, GenerationError> {
        if self.debug_llm {
            for content in messages {
                log::info!("[{}] {}", content.role, content.message);
            }
        }

        let start = Instant::now();
        let result = self.generator.chat(messages, options);
        match &result {
            Ok(reply) => log::info!(
                "generated {} chars from {} messages in {:?}",
                reply.len(),
                messages.len(),
                start.elapsed()
            ),
            Err(e) => log::warn!("generation failed after {:?}: {e}", start.elapsed()),
        }
        result
    }
}
