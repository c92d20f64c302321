use super::{InboundEvent, Transport};
use crate::core::error::AibudError;
use async_trait::async_trait;
use console::style;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::FileHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tokio::sync::mpsc;

const SUBCOMMAND_PREFIX: &str = "!ai.";

/// Completes `!ai.` subcommand names.
pub struct CommandCompleter {
    command_names: Vec<String>,
}

impl CommandCompleter {
    pub fn new(command_names: Vec<String>) -> Self {
        Self { command_names }
    }

    fn candidates(&self, line: &str, pos: usize) -> Option<(usize, Vec<Pair>)> {
        let typed = line.get(..pos)?.strip_prefix(SUBCOMMAND_PREFIX)?;
        if typed.contains(char::is_whitespace) {
            return None;
        }

        let matches: Vec<Pair> = self
            .command_names
            .iter()
            .filter(|cmd| cmd.starts_with(typed))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();

        if matches.is_empty() {
            None
        } else {
            Some((SUBCOMMAND_PREFIX.len(), matches))
        }
    }
}

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        Ok(self.candidates(line, pos).unwrap_or((pos, Vec::new())))
    }
}

impl Hinter for CommandCompleter {
    type Hint = String;
}

impl Highlighter for CommandCompleter {}

impl Validator for CommandCompleter {}

impl Helper for CommandCompleter {}

/// Local stand-in for a chat room: one user typing into a terminal.
pub struct ConsoleTransport {
    room_id: String,
    display_name: String,
    assistant_label: String,
    command_names: Vec<String>,
}

impl ConsoleTransport {
    pub fn new(
        room_id: &str,
        display_name: &str,
        assistant_label: &str,
        command_names: Vec<String>,
    ) -> Self {
        Self {
            room_id: room_id.to_string(),
            display_name: display_name.to_string(),
            assistant_label: assistant_label.to_string(),
            command_names,
        }
    }

    fn event(&self, text: String) -> InboundEvent {
        InboundEvent {
            room_id: self.room_id.clone(),
            channel_id: self.room_id.clone(),
            message_id: None,
            author_is_bot: false,
            display_name: self.display_name.clone(),
            text,
        }
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    fn name(&self) -> &'static str {
        "console"
    }

    async fn listen(&self, events: mpsc::Sender<InboundEvent>) -> Result<(), AibudError> {
        let helper = CommandCompleter::new(self.command_names.clone());
        let prompt = format!("{}> ", self.display_name);
        let template = self.event(String::new());

        println!(
            "{}",
            style("Type `!ai.help` for commands, `exit` to quit").dim()
        );

        tokio::task::spawn_blocking(move || -> Result<(), AibudError> {
            let mut editor = Editor::<CommandCompleter, FileHistory>::new()
                .map_err(|e| AibudError::Transport(format!("Line editor: {}", e)))?;
            editor.set_helper(Some(helper));

            loop {
                match editor.readline(&prompt) {
                    Ok(line) => {
                        let trimmed = line.trim();
                        if trimmed == "exit" || trimmed == "quit" {
                            break;
                        }
                        if trimmed.is_empty() {
                            continue;
                        }
                        if let Err(e) = editor.add_history_entry(trimmed) {
                            return Err(AibudError::Transport(format!(
                                "Failed to add history entry: {}",
                                e
                            )));
                        }

                        let event = InboundEvent {
                            text: line,
                            ..template.clone()
                        };
                        if events.blocking_send(event).is_err() {
                            break;
                        }
                    }
                    Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                    Err(e) => return Err(AibudError::Transport(format!("Read line: {}", e))),
                }
            }
            Ok(())
        })
        .await
        .map_err(|e| AibudError::Transport(format!("Console input task: {}", e)))?
    }

    async fn reply(&self, _event: &InboundEvent, text: &str) -> Result<(), AibudError> {
        println!(
            "{} {}",
            style(format!("{}:", self.assistant_label)).bold().cyan(),
            text
        );
        Ok(())
    }

    async fn send_typing(&self, _event: &InboundEvent) -> Result<(), AibudError> {
        println!(
            "{}",
            style(format!("{} is typing...", self.assistant_label)).dim()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completer() -> CommandCompleter {
        CommandCompleter::new(vec![
            "help".to_string(),
            "reset".to_string(),
            "set".to_string(),
            "setengine".to_string(),
            "setmodel".to_string(),
        ])
    }

    #[test]
    fn completes_subcommands_after_prefix() {
        let (start, pairs) = completer().candidates("!ai.se", 6).unwrap();
        assert_eq!(start, 4);
        let names: Vec<_> = pairs.into_iter().map(|p| p.replacement).collect();
        assert_eq!(names, vec!["set", "setengine", "setmodel"]);
    }

    #[test]
    fn no_completion_outside_subcommand_name() {
        assert!(completer().candidates("!ai hello", 9).is_none());
        assert!(completer().candidates("!ai.set pir", 11).is_none());
        assert!(completer().candidates("!ai.zzz", 7).is_none());
    }

    #[test]
    fn events_carry_room_and_user() {
        let transport = ConsoleTransport::new("local", "Alice", "AiBud", Vec::new());
        let event = transport.event("!ai hi".to_string());
        assert_eq!(event.room_id, "local");
        assert_eq!(event.display_name, "Alice");
        assert!(!event.author_is_bot);
    }
}
