use super::{
    Command, CommandContext, CommandParser,
    handler::{HelpCommand, RESET_CONFIRMATION, SetEngineCommand, SetModelCommand, SetPersonaCommand},
    registry::CommandRegistry,
};
use crate::core::error::AibudError;
use crate::gateway::CompletionGateway;
use crate::session::SessionStore;
use crate::transport::{InboundEvent, Transport};
use std::sync::Arc;

#[derive(Clone)]
pub struct CommandDispatcher {
    registry: Arc<CommandRegistry>,
    parser: CommandParser,
    store: Arc<SessionStore>,
    gateway: Arc<CompletionGateway>,
}

impl CommandDispatcher {
    pub fn new(
        registry: Arc<CommandRegistry>,
        parser: CommandParser,
        store: Arc<SessionStore>,
        gateway: Arc<CompletionGateway>,
    ) -> Self {
        Self {
            registry,
            parser,
            store,
            gateway,
        }
    }

    /// Handle one inbound message and return the replies to send, in order.
    /// Failures are turned into their user-facing message here.
    pub async fn dispatch(&self, event: &InboundEvent, transport: &dyn Transport) -> Vec<String> {
        if event.author_is_bot {
            return Vec::new();
        }

        let command = self.parser.parse(&event.text);
        if command == Command::Ignore {
            return Vec::new();
        }
        tracing::debug!(room = %event.room_id, ?command, "Dispatching command");

        match self.execute(command, event, transport).await {
            Ok(replies) => replies,
            Err(e) => {
                if e.is_user_error() {
                    tracing::debug!(room = %event.room_id, "Rejected command: {}", e);
                } else {
                    tracing::warn!(room = %event.room_id, "Command failed: {}", e);
                }
                vec![e.user_message()]
            }
        }
    }

    async fn execute(
        &self,
        command: Command,
        event: &InboundEvent,
        transport: &dyn Transport,
    ) -> Result<Vec<String>, AibudError> {
        match command {
            Command::Ignore => Ok(Vec::new()),
            Command::Unknown(text) => Err(AibudError::UnknownCommand(text)),
            Command::Reset => {
                self.store.reset(&event.room_id).await;
                Ok(vec![RESET_CONFIRMATION.to_string()])
            }
            Command::SetPersona(name) => self.run_handler("set", &name, event).await,
            Command::SetModel(model) => self.run_handler("setmodel", &model, event).await,
            Command::SetEngine(engine) => self.run_handler("setengine", &engine, event).await,
            Command::Help(topic) => self.run_handler("help", &topic, event).await,
            Command::Generate(text) => {
                // Lock before any await so later commands in the room wait their turn.
                let handle = self.store.get_or_create(&event.room_id);
                let mut session = handle.lock().await;

                if let Err(e) = transport.send_typing(event).await {
                    tracing::warn!(room = %event.room_id, "Typing indicator failed: {}", e);
                }

                let reply = self
                    .gateway
                    .generate(&mut session, &event.display_name, &text)
                    .await?;
                Ok(vec![reply])
            }
        }
    }

    async fn run_handler(
        &self,
        name: &str,
        args: &str,
        event: &InboundEvent,
    ) -> Result<Vec<String>, AibudError> {
        let handle = self.store.get_or_create(&event.room_id);
        let mut session = handle.lock().await;
        let mut ctx = CommandContext {
            session: &mut session,
            catalog: self.store.catalog(),
        };
        self.registry.execute(name, args, &mut ctx)
    }

    /// Subcommand names, used for completion in the console.
    pub fn get_command_names(&self) -> Vec<String> {
        let mut names = self.registry.get_command_names();
        names.push("reset".to_string());
        names.sort();
        names
    }
}

pub fn create_command_dispatcher(
    parser: CommandParser,
    store: Arc<SessionStore>,
    gateway: Arc<CompletionGateway>,
) -> CommandDispatcher {
    let mut registry = CommandRegistry::new();

    registry.register("set", SetPersonaCommand);
    registry.register("setmodel", SetModelCommand);
    registry.register("setengine", SetEngineCommand);
    registry.register("help", HelpCommand);

    CommandDispatcher::new(Arc::new(registry), parser, store, gateway)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::factory::ProviderFactory;
    use crate::providers::mock::MockProvider;
    use crate::session::SessionDefaults;
    use crate::session::tests::sample_catalog;
    use crate::transport::mock::{RecordingTransport, event};
    use std::time::Duration;

    struct Harness {
        dispatcher: CommandDispatcher,
        store: Arc<SessionStore>,
        provider: Arc<MockProvider>,
        transport: RecordingTransport,
    }

    fn harness(provider: MockProvider) -> Harness {
        let provider = Arc::new(provider);
        let store = Arc::new(SessionStore::new(
            Arc::new(sample_catalog()),
            SessionDefaults::default(),
        ));
        let mut factory = ProviderFactory::new("GPT3");
        factory.register("GPT3", provider.clone());
        let gateway = Arc::new(CompletionGateway::new(factory, "AiBud"));
        let dispatcher = create_command_dispatcher(CommandParser::new(), store.clone(), gateway);

        Harness {
            dispatcher,
            store,
            provider,
            transport: RecordingTransport::default(),
        }
    }

    impl Harness {
        async fn send(&self, name: &str, text: &str) -> Vec<String> {
            self.dispatcher
                .dispatch(&event("guild-1", name, text), &self.transport)
                .await
        }
    }

    #[tokio::test]
    async fn generate_scenario() {
        let h = harness(MockProvider::replying("there!"));

        let replies = h.send("Alice", "!ai Hello").await;

        assert_eq!(replies, vec!["there!"]);
        assert_eq!(*h.transport.typing.lock().unwrap(), 1);
        let handle = h.store.get_or_create("guild-1");
        let session = handle.lock().await;
        assert!(session
            .transcript("normal")
            .unwrap()
            .ends_with("Alice: Hello\nAiBud: there!\n"));
    }

    #[tokio::test]
    async fn whitespace_only_prompt_is_rejected_without_call() {
        let h = harness(MockProvider::replying("unused"));

        let replies = h.send("Alice", "!ai   ").await;

        assert_eq!(replies, vec!["`Empty prompt entered\nType a valid prompt`"]);
        assert_eq!(h.provider.calls(), 0);
    }

    #[tokio::test]
    async fn persona_selection_scenarios() {
        let h = harness(MockProvider::replying("unused"));

        assert_eq!(
            h.send("Alice", "!ai.set missing").await,
            vec!["`Behavior prompt missing not found`"]
        );
        assert_eq!(
            h.send("Alice", "!ai.set normal").await,
            vec!["`Behavior prompt already set to normal`"]
        );
        let handle = h.store.get_or_create("guild-1");
        assert_eq!(handle.lock().await.active_persona(), "normal");
    }

    #[tokio::test]
    async fn setmodel_resets_but_setengine_does_not() {
        let h = harness(MockProvider::replying("ok"));
        h.send("Alice", "!ai hi").await;

        let replies = h.send("Alice", "!ai.setengine davinci").await;
        assert_eq!(replies, vec!["`Engine set to davinci`"]);
        {
            let handle = h.store.get_or_create("guild-1");
            let session = handle.lock().await;
            assert!(session.active_transcript().ends_with("Alice: hi\nAiBud: ok\n"));
        }

        let replies = h.send("Alice", "!ai.setmodel GPTJ").await;
        assert_eq!(replies, vec!["`Model set to GPTJ`", RESET_CONFIRMATION]);
        let handle = h.store.get_or_create("guild-1");
        let session = handle.lock().await;
        assert_eq!(session.transcripts(), &h.store.catalog().fresh_transcripts());
    }

    #[tokio::test]
    async fn reset_replies_confirmation() {
        let h = harness(MockProvider::replying("ok"));
        h.send("Alice", "!ai hi").await;

        assert_eq!(h.send("Alice", "!ai.reset").await, vec![RESET_CONFIRMATION]);
        let handle = h.store.get_or_create("guild-1");
        assert_eq!(
            handle.lock().await.transcripts(),
            &h.store.catalog().fresh_transcripts()
        );
    }

    #[tokio::test]
    async fn persona_isolation_through_dispatch() {
        let h = harness(MockProvider::replying("ok"));
        h.send("Alice", "!ai first").await;
        let pirate_before = {
            let handle = h.store.get_or_create("guild-1");
            let session = handle.lock().await;
            session.transcript("pirate").unwrap().to_string()
        };

        h.send("Alice", "!ai second").await;

        let handle = h.store.get_or_create("guild-1");
        assert_eq!(
            handle.lock().await.transcript("pirate").unwrap(),
            pirate_before
        );
    }

    #[tokio::test]
    async fn bots_and_plain_chat_are_ignored() {
        let h = harness(MockProvider::replying("ok"));

        let mut bot_event = event("guild-1", "OtherBot", "!ai hello");
        bot_event.author_is_bot = true;
        assert!(h.dispatcher.dispatch(&bot_event, &h.transport).await.is_empty());
        assert!(h.send("Alice", "just chatting").await.is_empty());

        assert_eq!(h.provider.calls(), 0);
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn unknown_and_malformed_commands() {
        let h = harness(MockProvider::replying("ok"));

        assert_eq!(
            h.send("Alice", "!ai.dance").await,
            vec!["`Invalid command !ai.dance entered\nType !ai.help for help`"]
        );
        assert_eq!(
            h.send("Alice", "!ai").await,
            vec!["`Invalid command !ai entered\nType !ai.help for help`"]
        );
        assert_eq!(
            h.send("Alice", "!ai.help me").await,
            vec!["`Invalid help command me entered`"]
        );
    }

    #[tokio::test]
    async fn provider_failures_become_generic_replies() {
        let h = harness(MockProvider::scripted(vec![
            Err("timeout".to_string()),
            Ok("   ".to_string()),
        ]));

        assert_eq!(
            h.send("Alice", "!ai hi").await,
            vec!["`Error occurred while generating prompt`"]
        );
        assert_eq!(
            h.send("Alice", "!ai hi again").await,
            vec!["`Empty response received from model\nTry again`"]
        );
    }

    #[tokio::test]
    async fn concurrent_generations_in_one_room_do_not_interleave() {
        let h = Arc::new(harness(
            MockProvider::replying("ok").with_delay(Duration::from_millis(20)),
        ));

        let first = {
            let h = h.clone();
            tokio::spawn(async move { h.send("Alice", "!ai one").await })
        };
        let second = {
            let h = h.clone();
            tokio::spawn(async move { h.send("Bob", "!ai two").await })
        };
        first.await.unwrap();
        second.await.unwrap();

        let handle = h.store.get_or_create("guild-1");
        let session = handle.lock().await;
        let transcript = session.active_transcript();
        let one_then_two = transcript.ends_with("Alice: one\nAiBud: ok\nBob: two\nAiBud: ok\n");
        let two_then_one = transcript.ends_with("Bob: two\nAiBud: ok\nAlice: one\nAiBud: ok\n");
        assert!(one_then_two || two_then_one, "interleaved transcript: {}", transcript);
    }

    #[tokio::test]
    async fn generate_holds_room_while_typing() {
        let mut h = harness(MockProvider::replying("hey"));
        h.transport.typing_delay = Duration::from_millis(50);
        let h = Arc::new(h);

        let generate = {
            let h = h.clone();
            tokio::spawn(async move { h.send("Alice", "!ai hello").await })
        };
        tokio::task::yield_now().await;
        let switched = h.send("Alice", "!ai.set pirate").await;

        assert_eq!(generate.await.unwrap(), vec!["hey"]);
        assert_eq!(switched, vec!["`Behavior prompt set to pirate`"]);
        let handle = h.store.get_or_create("guild-1");
        let session = handle.lock().await;
        assert!(session
            .transcript("normal")
            .unwrap()
            .ends_with("Alice: hello\nAiBud: hey\n"));
        assert_eq!(session.transcript("pirate"), Some("Alice: Ahoy\nAiBud: Arr.\n"));
    }

    #[test]
    fn command_names_cover_every_subcommand() {
        let h = harness(MockProvider::replying("ok"));
        assert_eq!(
            h.dispatcher.get_command_names(),
            vec!["help", "reset", "set", "setengine", "setmodel"]
        );
    }
}
