//! Conversation session: the message log and the submit/settle lifecycle.
//!
//! A submit appends the user's message and a `"Thinking..."` placeholder,
//! marks the session busy and hands back a [`PendingRequest`]. Whoever drives
//! the session dispatches it (inline via [`Session::send`], or on a spawned
//! task in the TUI) and feeds the outcome back through [`Session::settle`].
//! Nothing serializes overlapping submits; outcomes settle in arrival order.

use std::sync::Arc;

use crate::ai::{build_messages, CompletionClient, CompletionError, OpenAIClient, RequestConfig};
use crate::config::{Config, ConfigError, Credentials};
use crate::state::{ChatMessage, ChatRole};

pub const GREETING: &str = "👋 Hello! I'm your L'Oréal product advisor. Ask me about L'Oréal products, routines or recommendations.";
pub const PLACEHOLDER: &str = "Thinking...";
pub const NO_RESPONSE: &str = "No response from the API.";

/// Result of one round trip to the completion provider.
pub type Outcome = Result<Option<String>, CompletionError>;

/// A submitted question waiting to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    pub id: u64,
    pub messages: Vec<ChatMessage>,
}

/// Sends pending requests. Cheap to clone so it can move into a task.
#[derive(Clone)]
pub struct Dispatcher {
    client: Result<Arc<dyn CompletionClient>, ConfigError>,
    request_config: RequestConfig,
}

impl Dispatcher {
    pub fn new(client: Arc<dyn CompletionClient>, request_config: RequestConfig) -> Self {
        Self {
            client: Ok(client),
            request_config,
        }
    }

    /// A dispatcher that reports `error` for every request without
    /// touching the network.
    pub fn unconfigured(error: ConfigError, request_config: RequestConfig) -> Self {
        Self {
            client: Err(error),
            request_config,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let request_config = RequestConfig::from_config(config);
        match Credentials::resolve(config) {
            Ok(credentials) => {
                let mut client = OpenAIClient::new(&credentials.api_key);
                if let Some(base_url) = &config.base_url {
                    client = client.with_base_url(base_url);
                }
                Self::new(Arc::new(client), request_config)
            }
            Err(error) => {
                tracing::warn!(%error, "completion provider not configured");
                Self::unconfigured(error, request_config)
            }
        }
    }

    pub fn request_config(&self) -> &RequestConfig {
        &self.request_config
    }

    pub fn config_error(&self) -> Option<&ConfigError> {
        self.client.as_ref().err()
    }

    pub async fn dispatch(&self, pending: &PendingRequest) -> Outcome {
        let client = match &self.client {
            Ok(client) => client,
            Err(error) => return Err(error.clone().into()),
        };

        tracing::info!(request_id = pending.id, model = %self.request_config.model, "dispatching request");
        client.complete(&pending.messages, &self.request_config).await
    }
}

/// Clears the busy flag on drop so settling always leaves the busy state.
struct BusyGuard<'a> {
    flag: &'a mut bool,
}

impl<'a> BusyGuard<'a> {
    fn new(flag: &'a mut bool) -> Self {
        Self { flag }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        *self.flag = false;
    }
}

pub struct Session {
    messages: Vec<ChatMessage>,
    /// Parallel to `messages`: the request a placeholder entry belongs to.
    placeholder_owner: Vec<Option<u64>>,
    /// Contents of the input line. Cleared by a successful submit.
    pub input: String,
    busy: bool,
    next_request_id: u64,
    dispatcher: Dispatcher,
}

impl Session {
    pub fn new(dispatcher: Dispatcher) -> Self {
        let mut session = Self {
            messages: Vec::new(),
            placeholder_owner: Vec::new(),
            input: String::new(),
            busy: false,
            next_request_id: 1,
            dispatcher,
        };
        session.initialize();
        session
    }

    /// Reset the log to the greeting.
    pub fn initialize(&mut self) {
        self.messages.clear();
        self.placeholder_owner.clear();
        self.push(ChatMessage::assistant(GREETING), None);
    }

    fn push(&mut self, message: ChatMessage, owner: Option<u64>) {
        self.messages.push(message);
        self.placeholder_owner.push(owner);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Whether the entry at `index` is a placeholder still waiting on its request.
    pub fn is_pending_placeholder(&self, index: usize) -> bool {
        self.placeholder_owner.get(index).copied().flatten().is_some()
            && self.messages[index].content == PLACEHOLDER
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Record a question and enter the busy state. Blank input is ignored.
    pub fn submit(&mut self, text: &str) -> Option<PendingRequest> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let id = self.next_request_id;
        self.next_request_id += 1;

        self.push(ChatMessage::user(text), None);
        self.input.clear();
        self.push(ChatMessage::assistant(PLACEHOLDER), Some(id));
        self.busy = true;
        tracing::debug!(request_id = id, "question submitted");

        Some(PendingRequest {
            id,
            messages: build_messages(text),
        })
    }

    /// Replace the placeholder with the outcome and leave the busy state.
    /// Returns the appended assistant message.
    pub fn settle(&mut self, request_id: u64, outcome: Outcome) -> ChatMessage {
        let _guard = BusyGuard::new(&mut self.busy);

        // Only this request's placeholder is touched. If its text was altered
        // it stays in the log and the reply is appended anyway.
        if let Some(idx) = self
            .placeholder_owner
            .iter()
            .position(|owner| *owner == Some(request_id))
        {
            if self.messages[idx].role == ChatRole::Assistant
                && self.messages[idx].content == PLACEHOLDER
            {
                self.messages.remove(idx);
                self.placeholder_owner.remove(idx);
            } else {
                self.placeholder_owner[idx] = None;
            }
        }

        let text = match outcome {
            Ok(Some(reply)) if !reply.is_empty() => {
                tracing::info!(request_id, "request settled");
                reply
            }
            Ok(_) => {
                tracing::warn!(request_id, "provider returned no content");
                NO_RESPONSE.to_string()
            }
            Err(error) => {
                tracing::error!(request_id, %error, "request failed");
                failure_text(&error)
            }
        };

        // `self.busy` is held by the guard, so push field by field.
        let message = ChatMessage::assistant(text);
        self.messages.push(message.clone());
        self.placeholder_owner.push(None);
        message
    }

    /// Submit, dispatch and settle in one go. `None` for blank input.
    pub async fn send(&mut self, text: &str) -> Option<ChatMessage> {
        let pending = self.submit(text)?;
        let outcome = self.dispatcher.dispatch(&pending).await;
        Some(self.settle(pending.id, outcome))
    }
}

fn failure_text(error: &CompletionError) -> String {
    match error {
        CompletionError::Http { .. } => format!("Error: {}", error),
        _ => format!("Request failed: {}", error),
    }
}
