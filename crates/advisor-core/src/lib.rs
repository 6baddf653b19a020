pub mod ai;
pub mod config;
pub mod session;
pub mod state;

// Re-export main types for convenience
pub use ai::{CompletionClient, CompletionError, OpenAIClient, RequestConfig};
pub use config::{Config, ConfigError, Credentials};
pub use session::{Dispatcher, Outcome, PendingRequest, Session};
pub use state::{ChatMessage, ChatRole};
