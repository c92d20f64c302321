use crate::commands::CommandDispatcher;
use crate::core::error::AibudError;
use crate::transport::{InboundEvent, Transport};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};

const EVENT_BUFFER: usize = 64;
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

pub struct Application {
    dispatcher: CommandDispatcher,
    transport: Arc<dyn Transport>,
}

impl Application {
    pub fn new(dispatcher: CommandDispatcher, transport: Arc<dyn Transport>) -> Self {
        Self {
            dispatcher,
            transport,
        }
    }

    /// Serve until the transport stops (console) or Ctrl-C.
    pub async fn run(&self) -> Result<(), AibudError> {
        tokio::select! {
            result = self.serve() => result,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                Ok(())
            }
        }
    }

    async fn serve(&self) -> Result<(), AibudError> {
        loop {
            let result = self.serve_connection().await;

            if !self.transport.reconnects() {
                return result;
            }
            if let Err(e) = result {
                tracing::error!(transport = self.transport.name(), "Connection lost: {}", e);
            }
            tracing::info!(
                transport = self.transport.name(),
                "Reconnecting in {}s",
                RECONNECT_DELAY.as_secs()
            );
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }

    /// One listen session. Each room gets a worker that handles its events
    /// in arrival order; different rooms run concurrently.
    async fn serve_connection(&self) -> Result<(), AibudError> {
        let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
        let listener = {
            let transport = self.transport.clone();
            tokio::spawn(async move { transport.listen(tx).await })
        };

        let mut rooms: HashMap<String, mpsc::UnboundedSender<InboundEvent>> = HashMap::new();
        let mut workers = JoinSet::new();
        while let Some(event) = rx.recv().await {
            let room_id = event.room_id.clone();
            let worker = rooms
                .entry(room_id.clone())
                .or_insert_with(|| self.spawn_room_worker(&mut workers));

            if let Err(mpsc::error::SendError(event)) = worker.send(event) {
                tracing::warn!(room = %room_id, "Room worker stopped, restarting");
                let worker = self.spawn_room_worker(&mut workers);
                if worker.send(event).is_err() {
                    tracing::error!(room = %room_id, "Dropped event for room");
                }
                rooms.insert(room_id, worker);
            }

            while let Some(result) = workers.try_join_next() {
                log_worker_exit(result);
            }
        }

        drop(rooms);
        while let Some(result) = workers.join_next().await {
            log_worker_exit(result);
        }

        listener
            .await
            .map_err(|e| AibudError::Transport(format!("Listener task failed: {}", e)))?
    }

    fn spawn_room_worker(&self, workers: &mut JoinSet<()>) -> mpsc::UnboundedSender<InboundEvent> {
        let (tx, mut rx) = mpsc::unbounded_channel::<InboundEvent>();
        let dispatcher = self.dispatcher.clone();
        let transport = self.transport.clone();
        workers.spawn(async move {
            while let Some(event) = rx.recv().await {
                handle_event(&dispatcher, transport.as_ref(), event).await;
            }
        });
        tx
    }
}

fn log_worker_exit(result: Result<(), JoinError>) {
    if let Err(e) = result {
        tracing::error!("Room worker failed: {}", e);
    }
}

async fn handle_event(dispatcher: &CommandDispatcher, transport: &dyn Transport, event: InboundEvent) {
    let replies = dispatcher.dispatch(&event, transport).await;
    for reply in replies {
        if let Err(e) = transport.reply(&event, &reply).await {
            tracing::error!(room = %event.room_id, "Failed to send reply: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CommandParser;
    use crate::commands::dispatcher::create_command_dispatcher;
    use crate::gateway::CompletionGateway;
    use crate::providers::factory::ProviderFactory;
    use crate::providers::mock::MockProvider;
    use crate::session::tests::sample_catalog;
    use crate::session::{SessionDefaults, SessionStore};
    use crate::transport::mock::event;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Emits a fixed script of messages, then ends the connection.
    struct ScriptedTransport {
        script: Vec<InboundEvent>,
        typing_delay: Duration,
        replies: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<InboundEvent>) -> Self {
            Self {
                script,
                typing_delay: Duration::ZERO,
                replies: Mutex::new(Vec::new()),
            }
        }

        fn with_typing_delay(mut self, delay: Duration) -> Self {
            self.typing_delay = delay;
            self
        }

        fn replies(&self) -> Vec<String> {
            self.replies.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn listen(&self, events: mpsc::Sender<InboundEvent>) -> Result<(), AibudError> {
            for event in &self.script {
                events
                    .send(event.clone())
                    .await
                    .map_err(|e| AibudError::Transport(e.to_string()))?;
            }
            Ok(())
        }

        async fn reply(&self, _event: &InboundEvent, text: &str) -> Result<(), AibudError> {
            self.replies.lock().unwrap().push(text.to_string());
            Ok(())
        }

        async fn send_typing(&self, _event: &InboundEvent) -> Result<(), AibudError> {
            tokio::time::sleep(self.typing_delay).await;
            Ok(())
        }
    }

    fn setup(reply: &str) -> (CommandDispatcher, Arc<SessionStore>) {
        let store = Arc::new(SessionStore::new(
            Arc::new(sample_catalog()),
            SessionDefaults::default(),
        ));
        let mut factory = ProviderFactory::new("GPT3");
        factory.register("GPT3", Arc::new(MockProvider::replying(reply)));
        let gateway = Arc::new(CompletionGateway::new(factory, "AiBud"));
        let dispatcher = create_command_dispatcher(CommandParser::new(), store.clone(), gateway);
        (dispatcher, store)
    }

    #[tokio::test]
    async fn runs_until_transport_ends_and_sends_replies() {
        let (dispatcher, store) = setup("hey");
        let transport = Arc::new(ScriptedTransport::new(vec![
            event("room-a", "Alice", "!ai hello"),
            event("room-b", "Bob", "not for the bot"),
        ]));

        Application::new(dispatcher, transport.clone()).run().await.unwrap();

        assert_eq!(transport.replies(), vec!["hey"]);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn slow_generate_finishes_before_later_persona_switch() {
        let (dispatcher, store) = setup("hey");
        let transport = Arc::new(
            ScriptedTransport::new(vec![
                event("room-a", "Alice", "!ai hello"),
                event("room-a", "Alice", "!ai.set pirate"),
            ])
            .with_typing_delay(Duration::from_millis(50)),
        );

        Application::new(dispatcher, transport.clone()).run().await.unwrap();

        assert_eq!(
            transport.replies(),
            vec!["hey", "`Behavior prompt set to pirate`"]
        );
        let handle = store.get_or_create("room-a");
        let session = handle.lock().await;
        assert_eq!(session.active_persona(), "pirate");
        assert_eq!(
            session.transcript("normal").unwrap(),
            "Alice: Hello\nAiBud: Hi there.\nAlice: hello\nAiBud: hey\n"
        );
        assert_eq!(session.transcript("pirate").unwrap(), "Alice: Ahoy\nAiBud: Arr.\n");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn room_commands_apply_in_arrival_order() {
        for _ in 0..10 {
            let (dispatcher, store) = setup("ok");
            let script: Vec<_> = (0..50)
                .map(|i| event("room-a", "Alice", &format!("!ai.setengine e{}", i)))
                .collect();
            let transport = Arc::new(ScriptedTransport::new(script));

            Application::new(dispatcher, transport.clone()).run().await.unwrap();

            let expected: Vec<String> = (0..50).map(|i| format!("`Engine set to e{}`", i)).collect();
            assert_eq!(transport.replies(), expected);
            let handle = store.get_or_create("room-a");
            assert_eq!(handle.lock().await.active_engine, "e49");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn rooms_keep_their_own_order() {
        let (dispatcher, store) = setup("ok");
        let script: Vec<_> = (0..20)
            .flat_map(|i| {
                [
                    event("room-a", "Alice", &format!("!ai.setengine a{}", i)),
                    event("room-b", "Bob", &format!("!ai.setengine b{}", i)),
                ]
            })
            .collect();
        let transport = Arc::new(ScriptedTransport::new(script));

        Application::new(dispatcher, transport).run().await.unwrap();

        assert_eq!(store.get_or_create("room-a").lock().await.active_engine, "a19");
        assert_eq!(store.get_or_create("room-b").lock().await.active_engine, "b19");
    }
}
