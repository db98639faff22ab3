//! Backend conversation client
//!
//! Posts user input (typed text, named events, recorded audio) to the
//! backend's `/query/*` endpoint family and publishes normalized messages
//! through the store. Calls are fire-and-subscribe: failures surface as
//! apology messages, never as errors to the caller.

use crate::audio::RecordedAudio;
use crate::config::WidgetConfig;
use crate::messages::normalizer::{self, QueryResponse};
use crate::messages::store::ConversationStore;
use crate::messages::types::{DialogEvent, Message, QueryMethod, WARM_UP_SENTINEL};
use crate::session::ConversationSession;
use crate::{ParleyError, Result};
use parking_lot::Mutex;
use reqwest::multipart::{Form, Part};
use tracing::{debug, error, info};

pub struct ConversationClient {
    http: reqwest::Client,
    api_host: String,
    session: Mutex<ConversationSession>,
    store: ConversationStore,
}

impl ConversationClient {
    pub fn new(config: &WidgetConfig) -> Self {
        let session = ConversationSession::new();
        info!("New conversation session {}", session.id());
        Self {
            http: reqwest::Client::new(),
            api_host: config.api_host.trim_end_matches('/').to_string(),
            session: Mutex::new(session),
            store: ConversationStore::new(),
        }
    }

    /// The store this client publishes into
    pub fn store(&self) -> ConversationStore {
        self.store.clone()
    }

    pub fn session_id(&self) -> String {
        self.session.lock().id().to_string()
    }

    /// Send typed text. The user message is echoed immediately; the bot
    /// reply (or apology) follows asynchronously.
    pub async fn converse_text(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.store.publish(Message::user(QueryMethod::Text, text));

        let form = Form::new()
            .text("q", text.to_string())
            .text("session", self.session_id());
        self.dispatch("/query/text", form).await;
    }

    /// Fire a named backend event; the event's title is echoed as the user
    /// message.
    pub async fn converse_event(&self, event: &DialogEvent) {
        self.store
            .publish(Message::user(QueryMethod::Event, event.title.clone()));

        let form = Form::new()
            .text("event", event.event.clone())
            .text("session", self.session_id());
        self.dispatch("/query/event", form).await;
    }

    /// Submit a finished capture. The transcript the backend recognized is
    /// echoed as a user message before the bot reply, so the visible order
    /// is: user-audio-transcript, then bot-response.
    pub async fn converse_audio(&self, audio: RecordedAudio) {
        let part = match Part::bytes(audio.data)
            .file_name(audio.title)
            .mime_str("audio/wav")
        {
            Ok(part) => part,
            Err(e) => {
                self.publish_failure(ParleyError::TransportError(e.to_string()));
                return;
            }
        };
        let form = Form::new()
            .part("file", part)
            .text("session", self.session_id());

        match self.post("/query/audio", form).await {
            Ok(res) => {
                if !res.original_request.is_empty() {
                    self.store.publish(Message::user(
                        QueryMethod::Audio,
                        res.original_request.clone(),
                    ));
                }
                self.publish_normalized(&res);
            }
            Err(e) => self.publish_failure(e),
        }
    }

    /// Prime the session without showing a greeting echo
    pub async fn warm_up(&self) {
        self.converse_text(WARM_UP_SENTINEL).await;
    }

    async fn dispatch(&self, path: &str, form: Form) {
        match self.post(path, form).await {
            Ok(res) => self.publish_normalized(&res),
            Err(e) => self.publish_failure(e),
        }
    }

    async fn post(&self, path: &str, form: Form) -> Result<QueryResponse> {
        let url = format!("{}{}", self.api_host, path);
        debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ParleyError::TransportError(format!("{}: {}", url, e)))?
            .error_for_status()
            .map_err(|e| ParleyError::TransportError(e.to_string()))?;

        response
            .json::<QueryResponse>()
            .await
            .map_err(|e| ParleyError::MalformedPayload(e.to_string()))
    }

    fn publish_normalized(&self, res: &QueryResponse) {
        let message = {
            let mut session = self.session.lock();
            normalizer::normalize(res, &mut session)
        };
        self.store.publish(message);
    }

    fn publish_failure(&self, err: ParleyError) {
        error!("Conversation turn failed: {}", err);
        let message = {
            let mut session = self.session.lock();
            normalizer::failure_message(&mut session)
        };
        self.store.publish(message);
    }
}
