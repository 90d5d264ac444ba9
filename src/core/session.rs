//! Per-session exchange orchestration.
//!
//! `ChatSession` owns the conversation, the loaded config, and the loading
//! flag that serializes exchanges. It is deliberately free of terminal
//! concerns so the submit/accumulate/rollback paths can be tested directly.

use crate::api::RelayRequest;
use crate::core::chat_stream::{StreamMessage, StreamParams};
use crate::core::config::ChatConfig;
use crate::core::conversation::{Conversation, ConversationUpdate};
use crate::core::message::{Attachment, Message};

/// Result of submitting a user message.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// The message was appended and a relay request should be spawned with
    /// these parameters.
    Started(StreamParams),
    /// Config lacks an API key or model. The user message stays appended and
    /// unanswered; no network call was made.
    ConfigurationRequired,
    /// An exchange is already in flight; the submission was ignored.
    Busy,
}

pub struct ChatSession {
    conversation: Conversation,
    config: ChatConfig,
    client: reqwest::Client,
    is_loading: bool,
    error: Option<String>,
    accumulated: String,
}

impl ChatSession {
    pub fn new(config: ChatConfig) -> Self {
        Self {
            conversation: Conversation::new(),
            config,
            client: reqwest::Client::new(),
            is_loading: false,
            error: None,
            accumulated: String::new(),
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Append the user's message and prepare the relay request. The request
    /// snapshot is taken here, after the append, so the relay sees the full
    /// history including the new turn.
    pub fn submit(
        &mut self,
        content: String,
        attachments: Vec<Attachment>,
    ) -> SubmitOutcome {
        if self.is_loading {
            return SubmitOutcome::Busy;
        }

        let message = Message::user(content).with_attachments(attachments);
        self.conversation.apply(ConversationUpdate::Append(message));

        if !self.config.has_credentials() {
            self.error = Some(
                "Please configure API settings first (trickle set api-key / model)".to_string(),
            );
            return SubmitOutcome::ConfigurationRequired;
        }

        self.is_loading = true;
        self.error = None;
        self.accumulated.clear();

        SubmitOutcome::Started(StreamParams {
            client: self.client.clone(),
            relay_base_url: self.config.relay_base_url().to_string(),
            request: RelayRequest {
                messages: self.conversation.to_wire(),
                api_key: self.config.api_key.clone(),
                model: self.config.model.clone(),
            },
        })
    }

    /// Apply one stream message in arrival order. Fragments extend the
    /// trailing assistant message; an error triggers the single compensating
    /// rollback and ends the exchange.
    pub fn on_stream_message(&mut self, message: StreamMessage) {
        match message {
            StreamMessage::Chunk(text) => {
                self.accumulated.push_str(&text);
                self.conversation
                    .apply(ConversationUpdate::AppendOrExtendAssistant {
                        content: self.accumulated.clone(),
                    });
            }
            StreamMessage::Error(err) => {
                self.error = Some(err);
                self.conversation.apply(ConversationUpdate::RollbackLast);
                self.is_loading = false;
                self.accumulated.clear();
            }
            StreamMessage::End => {
                self.is_loading = false;
                self.accumulated.clear();
            }
        }
    }
}
