use super::CommandContext;
use crate::core::error::AibudError;

pub const RESET_CONFIRMATION: &str = "🪄`Prompt Reset`🪄";
pub const RESET_HELP: &str = "`!ai.reset` - Resets the prompt history and returns it to default";
pub const GENERATE_HELP: &str = "`!ai [prompt]` - Generates a prompt using the entered prompt";

/// A command that only touches session metadata and answers immediately.
pub trait CommandHandler: Send + Sync {
    fn execute(&self, ctx: &mut CommandContext<'_>, args: &str)
    -> Result<Vec<String>, AibudError>;
    fn help(&self) -> &'static str;
}

pub struct SetPersonaCommand;
pub struct SetModelCommand;
pub struct SetEngineCommand;
pub struct HelpCommand;

impl CommandHandler for SetPersonaCommand {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        args: &str,
    ) -> Result<Vec<String>, AibudError> {
        let name = args.trim();
        if name.is_empty() {
            return Err(AibudError::EmptyPersonaName);
        }
        if !ctx.session.has_persona(name) {
            return Err(AibudError::UnknownPersona(name.to_string()));
        }
        if ctx.session.active_persona() == name {
            return Ok(vec![format!("`Behavior prompt already set to {}`", name)]);
        }

        ctx.session.set_active_persona(name);
        tracing::info!(room = %ctx.session.room_id, persona = %name, "Persona selected");
        Ok(vec![format!("`Behavior prompt set to {}`", name)])
    }

    fn help(&self) -> &'static str {
        "`!ai.set [prompt name]` - Sets the prompt to the entered prompt."
    }
}

impl CommandHandler for SetModelCommand {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        args: &str,
    ) -> Result<Vec<String>, AibudError> {
        let model = args.trim();
        if model.is_empty() {
            return Err(AibudError::EmptyModelName);
        }
        if ctx.session.active_model == model {
            return Ok(vec![format!("`Model already set to {}`", model)]);
        }

        ctx.session.active_model = model.to_string();
        // A different model cannot continue another model's conversation.
        ctx.session.reset_transcripts(ctx.catalog);
        tracing::info!(room = %ctx.session.room_id, model = %model, "Model selected, prompt reset");

        Ok(vec![
            format!("`Model set to {}`", model),
            RESET_CONFIRMATION.to_string(),
        ])
    }

    fn help(&self) -> &'static str {
        "`!ai.setmodel [model name]` - Sets the model to be used for processing the prompt"
    }
}

impl CommandHandler for SetEngineCommand {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        args: &str,
    ) -> Result<Vec<String>, AibudError> {
        let engine = args.trim();
        if engine.is_empty() {
            return Err(AibudError::EmptyEngineName);
        }
        if ctx.session.active_engine == engine {
            return Ok(vec![format!("`Engine already set to {}`", engine)]);
        }

        ctx.session.active_engine = engine.to_string();
        tracing::info!(room = %ctx.session.room_id, engine = %engine, "Engine selected");
        Ok(vec![format!("`Engine set to {}`", engine)])
    }

    fn help(&self) -> &'static str {
        "`!ai.setengine [engine name]` - Sets the engine to be used for processing the prompt"
    }
}

impl CommandHandler for HelpCommand {
    /// `args` is the raw text after `!ai.help`, so only the exact commands
    /// `!ai.help` and `!ai.help set` are accepted.
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        args: &str,
    ) -> Result<Vec<String>, AibudError> {
        match args {
            "" => {
                let help_text = [
                    RESET_HELP,
                    SetPersonaCommand.help(),
                    GENERATE_HELP,
                    SetModelCommand.help(),
                    SetEngineCommand.help(),
                    HelpCommand.help(),
                    "`!ai.help set` - Shows all the prompt names you can choose from",
                ]
                .join("\n");
                Ok(vec![help_text])
            }
            " set" => Ok(vec![format!(
                "`Prompts you can choose from:\n{}`",
                ctx.catalog.persona_names().join(", ")
            )]),
            other => Err(AibudError::UnknownHelpTopic(other.trim().to_string())),
        }
    }

    fn help(&self) -> &'static str {
        "`!ai.help` - Shows this help message"
    }
}
