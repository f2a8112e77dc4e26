pub mod agents;
pub mod career;
pub mod config;
pub mod error;
pub mod prompt_templating;
pub mod providers;
pub mod transcript;

pub use agents::chat_turn::{ChatSession, send_turn};
pub use config::Settings;
pub use error::{CompletionError, ConfigError, Error, TemplateError};
pub use prompt_templating::{Bindings, PromptTemplate, TemplateSyntax, render, render_messages};
pub use providers::CompletionBackend;
pub use transcript::{Role, Transcript, Turn};
