use std::io;
use thiserror::Error;

/// Unified error type for the AiBud bot
#[derive(Error, Debug)]
pub enum AibudError {
    /// `!ai` was invoked with nothing after it
    #[error("Empty prompt entered")]
    EmptyInput,

    /// `!ai.set` without a persona name
    #[error("Empty persona name")]
    EmptyPersonaName,

    /// `!ai.setmodel` without a model name
    #[error("Empty model name")]
    EmptyModelName,

    /// `!ai.setengine` without an engine name
    #[error("Empty engine name")]
    EmptyEngineName,

    /// Persona name is not part of the room's transcripts
    #[error("Unknown persona: {0}")]
    UnknownPersona(String),

    /// Message starts with `!ai` but matches no command
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// `!ai.help` followed by an unsupported topic
    #[error("Unknown help topic: {0}")]
    UnknownHelpTopic(String),

    /// The provider answered with blank text
    #[error("Empty response received from model")]
    EmptyResponse,

    /// Completion provider failed (status, payload or transport)
    #[error("Provider error: {0}")]
    Provider(String),

    /// API-related errors
    #[error("API error: {0}")]
    Api(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Chat platform errors (gateway, REST)
    #[error("Transport error: {0}")]
    Transport(String),

    /// IO-related errors
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Network-related errors
    #[error("Network error: {0}")]
    Network(String),
}

impl AibudError {
    /// Text sent back to the room when a command fails.
    pub fn user_message(&self) -> String {
        match self {
            AibudError::EmptyInput => "`Empty prompt entered\nType a valid prompt`".to_string(),
            AibudError::EmptyPersonaName => {
                "`Empty or Invalid prompt name entered\nType a valid prompt name`".to_string()
            }
            AibudError::EmptyModelName => {
                "`Empty or Invalid model name entered\nType a valid model engine name`".to_string()
            }
            AibudError::EmptyEngineName => {
                "`Empty or Invalid engine name entered\nType a valid engine name`".to_string()
            }
            AibudError::UnknownPersona(name) => format!("`Behavior prompt {} not found`", name),
            AibudError::UnknownCommand(text) => {
                format!("`Invalid command {} entered\nType !ai.help for help`", text)
            }
            AibudError::UnknownHelpTopic(topic) => {
                format!("`Invalid help command {} entered`", topic)
            }
            AibudError::EmptyResponse => {
                "`Empty response received from model\nTry again`".to_string()
            }
            _ => "`Error occurred while generating prompt`".to_string(),
        }
    }

    /// Whether the failure came from the caller's input rather than the system.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            AibudError::EmptyInput
                | AibudError::EmptyPersonaName
                | AibudError::EmptyModelName
                | AibudError::EmptyEngineName
                | AibudError::UnknownPersona(_)
                | AibudError::UnknownCommand(_)
                | AibudError::UnknownHelpTopic(_)
        )
    }
}

impl From<reqwest::Error> for AibudError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AibudError::Network(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            AibudError::Network(format!("Connection failed: {}", err))
        } else if err.is_status() {
            AibudError::Api(format!("API returned error status: {}", err))
        } else {
            AibudError::Network(format!("Request failed: {}", err))
        }
    }
}

impl From<serde_json::Error> for AibudError {
    fn from(err: serde_json::Error) -> Self {
        AibudError::Serialization(format!("JSON error: {}", err))
    }
}

impl From<serde_yml::Error> for AibudError {
    fn from(err: serde_yml::Error) -> Self {
        AibudError::Serialization(format!("YAML error: {}", err))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for AibudError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        AibudError::Transport(format!("WebSocket error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_echo_offending_input() {
        assert_eq!(
            AibudError::UnknownPersona("missing".into()).user_message(),
            "`Behavior prompt missing not found`"
        );
        assert_eq!(
            AibudError::UnknownCommand("!ai.nope".into()).user_message(),
            "`Invalid command !ai.nope entered\nType !ai.help for help`"
        );
        assert_eq!(
            AibudError::UnknownHelpTopic("foo".into()).user_message(),
            "`Invalid help command foo entered`"
        );
    }

    #[test]
    fn provider_details_stay_out_of_replies() {
        let err = AibudError::Provider("401 invalid api key sk-123".into());
        assert!(!err.user_message().contains("sk-123"));
        assert!(!err.is_user_error());
        assert!(AibudError::EmptyInput.is_user_error());
    }
}
