use regex::Regex;

const PREFIX: &str = "!ai";
const RESET: &str = "!ai.reset";
const SET_PERSONA: &str = "!ai.set ";
const SET_MODEL: &str = "!ai.setmodel";
const SET_ENGINE: &str = "!ai.setengine";
const HELP: &str = "!ai.help";
const SUBCOMMAND: &str = "!ai.";
const GENERATE: &str = "!ai ";

/// Intent of one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Reset,
    SetPersona(String),
    SetModel(String),
    SetEngine(String),
    /// Untrimmed text after `!ai.help`; empty for the bare command.
    Help(String),
    Generate(String),
    /// Starts with `!ai` but matches nothing; carries the trimmed message.
    Unknown(String),
    Ignore,
}

/// Classifies message text. Prefixes are tried from most to least specific so
/// that e.g. `!ai.setengine` never lands in the `!ai.set ` branch.
#[derive(Debug, Clone, Default)]
pub struct CommandParser {
    mention: Option<Regex>,
}

impl CommandParser {
    pub fn new() -> Self {
        Self { mention: None }
    }

    /// Also treat `<@id>` / `<@!id>` at the start of a message as a generate request.
    pub fn with_mention(bot_user_id: &str) -> Self {
        let pattern = format!(r"^<@!?{}>", regex::escape(bot_user_id));
        Self {
            mention: Regex::new(&pattern).ok(),
        }
    }

    pub fn parse(&self, text: &str) -> Command {
        let text = text.trim_start();

        if let Some(mention) = &self.mention {
            if let Some(found) = mention.find(text) {
                return Command::Generate(text[found.end()..].to_string());
            }
        }

        if !text.starts_with(PREFIX) {
            return Command::Ignore;
        }

        if text.starts_with(RESET) {
            Command::Reset
        } else if let Some(rest) = text.strip_prefix(SET_PERSONA) {
            Command::SetPersona(rest.trim().to_string())
        } else if let Some(rest) = text.strip_prefix(SET_MODEL) {
            Command::SetModel(rest.trim().to_string())
        } else if let Some(rest) = text.strip_prefix(SET_ENGINE) {
            Command::SetEngine(rest.trim().to_string())
        } else if let Some(rest) = text.trim_end().strip_prefix(HELP) {
            Command::Help(rest.to_string())
        } else if text.starts_with(SUBCOMMAND) {
            Command::Unknown(text.trim().to_string())
        } else if let Some(rest) = text.strip_prefix(GENERATE) {
            Command::Generate(rest.to_string())
        } else {
            Command::Unknown(text.trim().to_string())
        }
    }
}
