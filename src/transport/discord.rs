//! Discord transport: Gateway WebSocket for inbound messages, REST for replies.

use super::{InboundEvent, Transport};
use crate::core::error::AibudError;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use reqwest::Client;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

const API_BASE: &str = "https://discord.com/api/v10";
const DEFAULT_GATEWAY: &str = "wss://gateway.discord.gg";
/// GUILDS | GUILD_MESSAGES | MESSAGE_CONTENT
const INTENTS: u64 = 33281;
const MAX_MESSAGE_LEN: usize = 2000;

pub struct DiscordTransport {
    bot_token: String,
    bot_user_id: Option<String>,
    guild_id: Option<String>,
    client: Client,
}

impl DiscordTransport {
    pub fn new(bot_token: String, bot_user_id: Option<String>, guild_id: Option<String>) -> Self {
        Self {
            bot_token,
            bot_user_id,
            guild_id,
            client: Client::new(),
        }
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.bot_token)
    }

    /// Look up the bot's own user id when the config does not provide one.
    pub async fn fetch_bot_user_id(&self) -> Result<String, AibudError> {
        let resp = self
            .client
            .get(format!("{}/users/@me", API_BASE))
            .header("Authorization", self.auth_header())
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(AibudError::Transport(format!(
                "Invalid Discord bot token ({})",
                resp.status()
            )));
        }

        let me: Value = resp.json().await?;
        me.get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AibudError::Transport("Missing id in /users/@me".to_string()))
    }

    pub fn set_bot_user_id(&mut self, id: String) {
        self.bot_user_id = Some(id);
    }

    async fn gateway_url(&self) -> String {
        let resp = self
            .client
            .get(format!("{}/gateway/bot", API_BASE))
            .header("Authorization", self.auth_header())
            .send()
            .await;

        let body: Option<Value> = match resp {
            Ok(resp) => resp.json().await.ok(),
            Err(e) => {
                tracing::warn!("Discord: gateway lookup failed: {}", e);
                None
            }
        };

        body.and_then(|b| b.get("url").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| DEFAULT_GATEWAY.to_string())
    }
}

/// Convert a `MESSAGE_CREATE` payload into an inbound event. Returns `None`
/// for payloads without text or outside the configured guild.
pub fn parse_message_create(
    d: &Value,
    bot_user_id: Option<&str>,
    guild_filter: Option<&str>,
) -> Option<InboundEvent> {
    let content = d.get("content").and_then(Value::as_str).unwrap_or("");
    if content.is_empty() {
        return None;
    }

    let guild_id = d.get("guild_id").and_then(Value::as_str);
    if let Some(filter) = guild_filter {
        if guild_id != Some(filter) {
            return None;
        }
    }

    let channel_id = d.get("channel_id").and_then(Value::as_str)?.to_string();
    let author = d.get("author")?;
    let author_id = author.get("id").and_then(Value::as_str).unwrap_or("");
    let author_is_bot = author.get("bot").and_then(Value::as_bool).unwrap_or(false)
        || bot_user_id == Some(author_id);

    let username = author.get("username").and_then(Value::as_str).unwrap_or("User");
    let display_name = d
        .get("member")
        .and_then(|m| m.get("nick"))
        .and_then(Value::as_str)
        .filter(|nick| !nick.is_empty())
        .unwrap_or(username);

    Some(InboundEvent {
        room_id: guild_id.unwrap_or(channel_id.as_str()).to_string(),
        channel_id,
        message_id: d.get("id").and_then(Value::as_str).map(str::to_string),
        author_is_bot,
        display_name: display_name.to_string(),
        text: content.to_string(),
    })
}

/// Split text into chunks Discord accepts, preferring line breaks.
pub fn split_message(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in text.split_inclusive('\n') {
        if current.chars().count() + line.chars().count() > MAX_MESSAGE_LEN && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        if line.chars().count() > MAX_MESSAGE_LEN {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(MAX_MESSAGE_LEN) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }
        current.push_str(line);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[async_trait]
impl Transport for DiscordTransport {
    fn name(&self) -> &'static str {
        "discord"
    }

    async fn listen(&self, events: mpsc::Sender<InboundEvent>) -> Result<(), AibudError> {
        let ws_url = format!("{}/?v=10&encoding=json", self.gateway_url().await);
        tracing::info!("Discord: connecting to gateway...");

        let (ws_stream, _) = tokio_tungstenite::connect_async(&ws_url).await?;
        let (mut write, mut read) = ws_stream.split();

        let hello = read
            .next()
            .await
            .ok_or_else(|| AibudError::Transport("No hello from gateway".to_string()))??;
        let hello_data: Value = serde_json::from_str(&hello.to_string())?;
        let heartbeat_interval = hello_data
            .get("d")
            .and_then(|d| d.get("heartbeat_interval"))
            .and_then(Value::as_u64)
            .unwrap_or(41250);

        let identify = json!({
            "op": 2,
            "d": {
                "token": self.bot_token,
                "intents": INTENTS,
                "properties": {
                    "os": std::env::consts::OS,
                    "browser": "aibud",
                    "device": "aibud"
                }
            }
        });
        write.send(Message::Text(identify.to_string())).await?;
        tracing::info!("Discord: connected and identified");

        let mut heartbeat =
            tokio::time::interval(std::time::Duration::from_millis(heartbeat_interval));
        let mut sequence: Option<u64> = None;

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    let hb = json!({"op": 1, "d": sequence});
                    if write.send(Message::Text(hb.to_string())).await.is_err() {
                        break;
                    }
                }
                msg = read.next() => {
                    let msg = match msg {
                        Some(Ok(Message::Text(t))) => t,
                        Some(Ok(Message::Close(frame))) => {
                            tracing::warn!("Discord: gateway closed: {:?}", frame);
                            break;
                        }
                        None => break,
                        Some(Err(e)) => return Err(e.into()),
                        _ => continue,
                    };

                    let payload: Value = match serde_json::from_str(&msg) {
                        Ok(p) => p,
                        Err(_) => continue,
                    };

                    if let Some(s) = payload.get("s").and_then(Value::as_u64) {
                        sequence = Some(s);
                    }

                    match payload.get("op").and_then(Value::as_u64) {
                        // Heartbeat request
                        Some(1) => {
                            let hb = json!({"op": 1, "d": sequence});
                            if write.send(Message::Text(hb.to_string())).await.is_err() {
                                break;
                            }
                            continue;
                        }
                        // Reconnect / invalid session
                        Some(7) | Some(9) => {
                            tracing::warn!("Discord: gateway asked to reconnect");
                            break;
                        }
                        _ => {}
                    }

                    let event_type = payload.get("t").and_then(Value::as_str).unwrap_or("");
                    if event_type == "READY" {
                        tracing::info!("AiBud is online");
                        continue;
                    }
                    if event_type != "MESSAGE_CREATE" {
                        continue;
                    }

                    let Some(d) = payload.get("d") else {
                        continue;
                    };
                    let Some(event) = parse_message_create(
                        d,
                        self.bot_user_id.as_deref(),
                        self.guild_id.as_deref(),
                    ) else {
                        continue;
                    };

                    if events.send(event).await.is_err() {
                        tracing::info!("Discord: event receiver dropped, stopping");
                        return Ok(());
                    }
                }
            }
        }

        Ok(())
    }

    async fn reply(&self, event: &InboundEvent, text: &str) -> Result<(), AibudError> {
        let url = format!("{}/channels/{}/messages", API_BASE, event.channel_id);

        for (i, chunk) in split_message(text).into_iter().enumerate() {
            let mut body = json!({ "content": chunk });
            if i == 0 {
                if let Some(ref message_id) = event.message_id {
                    body["message_reference"] = json!({ "message_id": message_id });
                }
            }

            let resp = self
                .client
                .post(&url)
                .header("Authorization", self.auth_header())
                .json(&body)
                .send()
                .await?;

            if !resp.status().is_success() {
                let status = resp.status();
                let error = resp.text().await.unwrap_or_default();
                return Err(AibudError::Transport(format!(
                    "Discord API error ({}): {}",
                    status, error
                )));
            }
        }

        Ok(())
    }

    async fn send_typing(&self, event: &InboundEvent) -> Result<(), AibudError> {
        let url = format!("{}/channels/{}/typing", API_BASE, event.channel_id);
        let resp = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .header("Content-Length", "0")
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(AibudError::Transport(format!(
                "Typing indicator rejected ({})",
                resp.status()
            )));
        }
        Ok(())
    }

    fn reconnects(&self) -> bool {
        true
    }
}
