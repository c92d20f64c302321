use crate::core::error::AibudError;
use indexmap::IndexMap;
use std::fs;
use std::path::Path;

/// Text standing in for the user's name inside every template.
pub const DEFAULT_NAME_MARKER: &str = "You:";

const BUILTIN_PROMPTS: &str = include_str!("../prompts.json");

/// Persona name -> conversation template, in document order.
pub type Transcripts = IndexMap<String, String>;

/// Read-only set of persona templates loaded at startup.
#[derive(Debug, Clone)]
pub struct PersonaCatalog {
    templates: Transcripts,
}

impl PersonaCatalog {
    pub fn from_json(contents: &str, default_persona: &str) -> Result<Self, AibudError> {
        let templates: Transcripts = serde_json::from_str(contents)?;

        if templates.is_empty() {
            return Err(AibudError::Config(
                "Persona catalog contains no prompts".to_string(),
            ));
        }
        if !templates.contains_key(default_persona) {
            return Err(AibudError::Config(format!(
                "Persona catalog has no '{}' prompt",
                default_persona
            )));
        }

        let catalog = Self { templates };
        for name in catalog.persona_names() {
            if catalog
                .template(name)
                .is_some_and(|t| !t.contains(DEFAULT_NAME_MARKER))
            {
                tracing::warn!(persona = %name, "Prompt has no '{}' line", DEFAULT_NAME_MARKER);
            }
        }
        Ok(catalog)
    }

    /// Catalog shipped with the binary.
    pub fn builtin(default_persona: &str) -> Result<Self, AibudError> {
        Self::from_json(BUILTIN_PROMPTS, default_persona)
    }

    pub fn load(path: &Path, default_persona: &str) -> Result<Self, AibudError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            AibudError::Config(format!("Read prompts {}: {}", path.display(), e))
        })?;
        Self::from_json(&contents, default_persona)
    }

    /// Builtin catalog unless a prompts file is configured.
    pub fn resolve(path: Option<&Path>, default_persona: &str) -> Result<Self, AibudError> {
        match path {
            Some(path) => Self::load(path, default_persona),
            None => Self::builtin(default_persona),
        }
    }

    pub fn template(&self, name: &str) -> Option<&str> {
        self.templates.get(name).map(String::as_str)
    }

    pub fn persona_names(&self) -> Vec<&str> {
        self.templates.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// An independent copy of every template, used to seed or reset a room.
    pub fn fresh_transcripts(&self) -> Transcripts {
        self.templates.clone()
    }
}
