use crate::core::error::AibudError;
use crate::providers::CompletionRequest;
use crate::providers::factory::ProviderFactory;
use crate::session::Session;

const MAX_TOKENS: u32 = 64;
const TEMPERATURE: f64 = 0.8;
const TOP_P: f64 = 1.0;
const FREQUENCY_PENALTY: f64 = 1.5;
const PRESENCE_PENALTY: f64 = 0.0;

/// Turns a room's transcript into a completion call and records both turns.
pub struct CompletionGateway {
    providers: ProviderFactory,
    assistant_label: String,
}

impl CompletionGateway {
    pub fn new(providers: ProviderFactory, assistant_label: &str) -> Self {
        Self {
            providers,
            assistant_label: assistant_label.to_string(),
        }
    }

    fn request(session: &Session) -> CompletionRequest {
        CompletionRequest {
            prompt: session.active_transcript().to_string(),
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            top_p: TOP_P,
            frequency_penalty: FREQUENCY_PENALTY,
            presence_penalty: PRESENCE_PENALTY,
            engine: session.active_engine.clone(),
        }
    }

    /// Returns the trimmed reply. On `EmptyResponse` and provider failures the
    /// user's turn and the open assistant slot stay in the transcript.
    pub async fn generate(
        &self,
        session: &mut Session,
        display_name: &str,
        user_text: &str,
    ) -> Result<String, AibudError> {
        if session.substitute_name(display_name) {
            tracing::debug!(room = %session.room_id, name = %display_name, "Substituted default name");
        }

        let user_text = user_text.trim();
        if user_text.is_empty() {
            return Err(AibudError::EmptyInput);
        }

        session.append_to_active(&format!(
            "{}: {}\n{}: ",
            display_name, user_text, self.assistant_label
        ));

        let provider = self.providers.resolve(&session.active_model)?;
        let request = Self::request(session);

        tracing::info!(
            room = %session.room_id,
            persona = %session.active_persona(),
            provider = %provider.name(),
            engine = %request.engine,
            "Generating completion"
        );

        let generated = provider.complete(&request).await.map_err(|e| {
            tracing::error!(room = %session.room_id, "Completion failed: {}", e);
            match e {
                AibudError::Provider(message) => AibudError::Provider(message),
                other => AibudError::Provider(other.to_string()),
            }
        })?;

        let reply = generated.trim();
        if reply.is_empty() {
            tracing::warn!(room = %session.room_id, "Empty response received from provider");
            return Err(AibudError::EmptyResponse);
        }

        session.append_to_active(&format!("{}\n", generated));
        tracing::debug!("{}: {}\n{}: {}", display_name, user_text, self.assistant_label, reply);
        Ok(reply.to_string())
    }
}
