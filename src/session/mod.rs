pub mod store;

use crate::persona::{DEFAULT_NAME_MARKER, PersonaCatalog, Transcripts};

pub use store::SessionStore;

/// Values a room starts with before anyone changes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDefaults {
    pub persona: String,
    pub model: String,
    pub engine: String,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            persona: "normal".to_string(),
            model: "GPT3".to_string(),
            engine: "gpt-3.5-turbo-instruct".to_string(),
        }
    }
}

/// Conversation state for one room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub room_id: String,
    transcripts: Transcripts,
    active_persona: String,
    pub active_model: String,
    pub active_engine: String,
    name_substitution_pending: bool,
}

impl Session {
    /// `defaults.persona` must be in the catalog; `PersonaCatalog` checks this on load.
    pub fn new(room_id: &str, catalog: &PersonaCatalog, defaults: &SessionDefaults) -> Self {
        Self {
            room_id: room_id.to_string(),
            transcripts: catalog.fresh_transcripts(),
            active_persona: defaults.persona.clone(),
            active_model: defaults.model.clone(),
            active_engine: defaults.engine.clone(),
            name_substitution_pending: true,
        }
    }

    pub fn active_persona(&self) -> &str {
        &self.active_persona
    }

    pub fn has_persona(&self, name: &str) -> bool {
        self.transcripts.contains_key(name)
    }

    /// Returns false and leaves the session untouched for unknown names.
    pub fn set_active_persona(&mut self, name: &str) -> bool {
        if !self.has_persona(name) {
            return false;
        }
        self.active_persona = name.to_string();
        true
    }

    pub fn transcript(&self, persona: &str) -> Option<&str> {
        self.transcripts.get(persona).map(String::as_str)
    }

    #[cfg(test)]
    pub fn transcripts(&self) -> &Transcripts {
        &self.transcripts
    }

    pub fn active_transcript(&self) -> &str {
        self.transcript(&self.active_persona).unwrap_or_default()
    }

    pub fn append_to_active(&mut self, text: &str) {
        if let Some(transcript) = self.transcripts.get_mut(&self.active_persona) {
            transcript.push_str(text);
        }
    }

    pub fn name_substitution_pending(&self) -> bool {
        self.name_substitution_pending
    }

    /// Replace the name marker in every persona with `display_name`. Only the
    /// first call in a session's lifetime does anything.
    pub fn substitute_name(&mut self, display_name: &str) -> bool {
        if !self.name_substitution_pending {
            return false;
        }

        let replacement = format!("{}:", display_name);
        for transcript in self.transcripts.values_mut() {
            *transcript = transcript.replace(DEFAULT_NAME_MARKER, &replacement);
        }
        self.name_substitution_pending = false;
        true
    }

    /// Drop accumulated conversation; persona, model, engine and the
    /// substitution flag are kept. A reset after substitution brings the
    /// `You:` marker back for good, since substitution never runs twice.
    pub fn reset_transcripts(&mut self, catalog: &PersonaCatalog) {
        self.transcripts = catalog.fresh_transcripts();
        if !self.transcripts.contains_key(&self.active_persona) {
            if let Some(first) = self.transcripts.keys().next() {
                self.active_persona = first.clone();
            }
        }
    }
}
