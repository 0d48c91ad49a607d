use std::path::{Path, PathBuf};

pub mod llm;

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("character file `{0}` not found")]
    NotFound(PathBuf),
    #[error("read character file `{path}` err: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("character file is not valid: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("character field `{0}` is missing or empty")]
    MissingField(&'static str),
}

#[derive(Debug, serde::Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, serde::Deserialize)]
struct Physical {
    race: Named,
}

#[derive(Debug, serde::Deserialize)]
struct ProfileRecord {
    name: String,
    physical: Physical,
    class: Named,
    behaviour: Vec<String>,
}

/// The player character every prompt is written around.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterProfile {
    pub name: String,
    pub race: String,
    pub class: String,
    pub behaviour: Vec<String>,
    /// Whole record as loaded, interpolated verbatim into the opening prompt.
    pub details: serde_json::Value,
}

impl CharacterProfile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ProfileError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ProfileError::NotFound(path.to_path_buf())
            } else {
                ProfileError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        Self::from_json_str(&data)
    }

    pub fn from_json_str(data: &str) -> Result<Self, ProfileError> {
        let details: serde_json::Value = serde_json::from_str(data)?;
        Self::from_value(details)
    }

    pub fn from_value(details: serde_json::Value) -> Result<Self, ProfileError> {
        let record: ProfileRecord = serde_json::from_value(details.clone())?;

        let profile = Self {
            name: record.name,
            race: record.physical.race.name,
            class: record.class.name,
            behaviour: record.behaviour,
            details,
        };
        profile.validate()?;
        Ok(profile)
    }

    fn validate(&self) -> Result<(), ProfileError> {
        if self.name.trim().is_empty() {
            return Err(ProfileError::MissingField("name"));
        }
        if self.race.trim().is_empty() {
            return Err(ProfileError::MissingField("physical.race.name"));
        }
        if self.class.trim().is_empty() {
            return Err(ProfileError::MissingField("class.name"));
        }
        if self.behaviour.iter().all(|b| b.trim().is_empty()) {
            return Err(ProfileError::MissingField("behaviour"));
        }
        Ok(())
    }
}
