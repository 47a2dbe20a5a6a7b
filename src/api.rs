use std::future::Future;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::sync::mpsc::UnboundedSender;
use url::Url;

use wadoru_core::{ErrorReply, GuessReply, HintReply, LobbyId, OkReply, StateSnapshot};

use crate::error::ApiError;
use crate::session::SessionCmd;
use crate::stream::StreamHandle;

/// Server operations the session performs. Implementations must be cheap to
/// clone: the session hands a clone to every in-flight request task.
pub trait Backend: Clone + Send + Sync + 'static {
    fn fetch_state(
        &self,
        emoji: Option<String>,
    ) -> impl Future<Output = Result<StateSnapshot, ApiError>> + Send;

    /// Presence ping carrying the player's identity; the reply is discarded.
    fn heartbeat(&self, emoji: String) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn register_identity(&self, emoji: String)
        -> impl Future<Output = Result<(), ApiError>> + Send;

    fn submit_guess(
        &self,
        emoji: String,
        guess: String,
    ) -> impl Future<Output = Result<GuessReply, ApiError>> + Send;

    fn claim_hint(
        &self,
        emoji: String,
        col: u32,
    ) -> impl Future<Output = Result<HintReply, ApiError>> + Send;

    fn send_chat(
        &self,
        emoji: String,
        text: String,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn reset_round(&self) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Attach the push stream, forwarding decoded messages into `tx`.
    /// Backends without push support return [`ApiError::StreamUnsupported`]
    /// and the session falls back to polling.
    fn open_stream(
        &self,
        tx: UnboundedSender<SessionCmd>,
    ) -> impl Future<Output = Result<StreamHandle, ApiError>> + Send;
}

/// JSON-over-HTTP backend. All endpoint URLs are resolved up front so the
/// request paths never fail mid-session.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    state_url: Url,
    stream_url: Url,
    emoji_url: Url,
    guess_url: Url,
    hint_url: Url,
    chat_url: Url,
    reset_url: Url,
}

impl HttpBackend {
    /// `base` is the server root; a lobby scopes every path under
    /// `lobby/<id>/`.
    pub fn new(client: Client, base: &Url, lobby: Option<&LobbyId>) -> Result<Self, ApiError> {
        let prefix = match lobby {
            Some(id) => format!("lobby/{id}/"),
            None => String::new(),
        };
        let endpoint = |path: &str| {
            base.join(&format!("{prefix}{path}"))
                .map_err(|_| ApiError::Payload)
        };
        Ok(Self {
            client,
            state_url: endpoint("state")?,
            stream_url: endpoint("stream")?,
            emoji_url: endpoint("emoji")?,
            guess_url: endpoint("guess")?,
            hint_url: endpoint("hint")?,
            chat_url: endpoint("chat")?,
            reset_url: endpoint("reset")?,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn stream_url(&self) -> Url {
        self.stream_url.clone()
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        body: serde_json::Value,
    ) -> Result<T, ApiError> {
        let response = self.client.post(url.clone()).json(&body).send().await?;
        read_json(response).await
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(ApiError::LobbyGone);
    }
    if !status.is_success() {
        let msg = match response.json::<ErrorReply>().await {
            Ok(reply) if !reply.msg.is_empty() => reply.msg,
            _ => status.to_string(),
        };
        return Err(ApiError::Rejected { msg });
    }
    response.json::<T>().await.map_err(|_| ApiError::Payload)
}

impl Backend for HttpBackend {
    async fn fetch_state(&self, emoji: Option<String>) -> Result<StateSnapshot, ApiError> {
        let mut url = self.state_url.clone();
        if let Some(emoji) = emoji {
            url.query_pairs_mut().append_pair("emoji", &emoji);
        }
        let response = self.client.get(url).send().await?;
        read_json(response).await
    }

    async fn heartbeat(&self, emoji: String) -> Result<(), ApiError> {
        // The server answers a heartbeat with the full state payload;
        // the regular fetch path is the one that applies it.
        self.post_json::<StateSnapshot>(&self.state_url, json!({ "emoji": emoji }))
            .await
            .map(|_| ())
    }

    async fn register_identity(&self, emoji: String) -> Result<(), ApiError> {
        self.post_json::<OkReply>(&self.emoji_url, json!({ "emoji": emoji }))
            .await
            .map(|_| ())
    }

    async fn submit_guess(&self, emoji: String, guess: String) -> Result<GuessReply, ApiError> {
        let response = self
            .client
            .post(self.guess_url.clone())
            .json(&json!({ "emoji": emoji, "guess": guess }))
            .send()
            .await?;
        // A guess that lands just after someone else's win comes back as a
        // rejection carrying a close-call notice. Treat that body as a reply
        // so the near-miss reaches the caller.
        let status = response.status();
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            let bytes = response.bytes().await?;
            if let Ok(reply) = serde_json::from_slice::<GuessReply>(&bytes) {
                if reply.close_call.is_some() {
                    return Ok(reply);
                }
            }
            let msg = match serde_json::from_slice::<ErrorReply>(&bytes) {
                Ok(reply) if !reply.msg.is_empty() => reply.msg,
                _ => status.to_string(),
            };
            return Err(ApiError::Rejected { msg });
        }
        read_json(response).await
    }

    async fn claim_hint(&self, emoji: String, col: u32) -> Result<HintReply, ApiError> {
        self.post_json(&self.hint_url, json!({ "emoji": emoji, "col": col }))
            .await
    }

    async fn send_chat(&self, emoji: String, text: String) -> Result<(), ApiError> {
        self.post_json::<OkReply>(&self.chat_url, json!({ "emoji": emoji, "text": text }))
            .await
            .map(|_| ())
    }

    async fn reset_round(&self) -> Result<(), ApiError> {
        self.post_json::<OkReply>(&self.reset_url, json!({}))
            .await
            .map(|_| ())
    }

    async fn open_stream(
        &self,
        tx: UnboundedSender<SessionCmd>,
    ) -> Result<StreamHandle, ApiError> {
        crate::stream::open_stream(&self.client, self.stream_url.clone(), tx).await
    }
}
