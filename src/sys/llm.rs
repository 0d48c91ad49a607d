use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Role {
    #[serde(rename = "system")]
    System,
    #[serde(rename = "user")]
    User,
    #[serde(rename = "assistant")]
    Assistant,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let role = self.as_ref();
        write!(f, "{role}")
    }
}

impl AsRef<str> for Role {
    fn as_ref(&self) -> &str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Content {
    pub role: Role,
    pub message: String,
}

impl Content {
    pub fn new(role: Role, message: impl Into<String>) -> Self {
        Self {
            role,
            message: message.into(),
        }
    }

    pub fn system(message: impl Into<String>) -> Self {
        Self::new(Role::System, message)
    }

    pub fn user(message: impl Into<String>) -> Self {
        Self::new(Role::User, message)
    }

    pub fn assistant(message: impl Into<String>) -> Self {
        Self::new(Role::Assistant, message)
    }
}

impl AsRef<Content> for Content {
    fn as_ref(&self) -> &Content {
        self
    }
}

/// Sampling parameters sent with every request of a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub seed: u32,
}

impl GenerationOptions {
    pub fn deterministic(seed: u32) -> Self {
        Self {
            temperature: 0.0,
            seed,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("request failed: {0}")]
    RequestFailed(String),
    #[error("request timed out")]
    Timeout,
    #[error("backend unavailable ({status}): {body}")]
    Unavailable { status: u16, body: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// A stateless chat backend: one call, one reply.
pub trait Generator {
    fn chat(
        &self,
        messages: &[Content],
        options: GenerationOptions,
    ) -> Result<String, GenerationError>;
}

impl<G: Generator + ?Sized> Generator for Box<G> {
    fn chat(
        &self,
        messages: &[Content],
        options: GenerationOptions,
    ) -> Result<String, GenerationError> {
        (**self).chat(messages, options)
    }
}

impl<G: Generator + ?Sized> Generator for &G {
    fn chat(
        &self,
        messages: &[Content],
        options: GenerationOptions,
    ) -> Result<String, GenerationError> {
        (**self).chat(messages, options)
    }
}
