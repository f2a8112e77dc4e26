use std::path::PathBuf;

/// Errors raised while assembling [`Settings`](crate::config::Settings).
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("missing required setting `{0}`")]
    Missing(&'static str),
    #[error("setting `PROJECT_ENDPOINT` is not an http(s) url: {0}")]
    InvalidEndpoint(String),
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Errors raised while rendering a prompt template.
#[derive(thiserror::Error, Debug)]
pub enum TemplateError {
    #[error("template references unbound parameter `{0}`")]
    UnboundParameter(String),
    #[error("unbalanced message block at byte {0}")]
    UnbalancedBlock(usize),
    #[error("message block at byte {0} has no role attribute")]
    MissingRole(usize),
    #[error("unknown message role `{0}`")]
    UnknownRole(String),
    #[error("text outside of a message block at byte {0}")]
    StrayText(usize),
    #[error("could not read template file: {0}")]
    Io(#[from] std::io::Error),
    #[error("template variables must serialize to a map of scalars: {0}")]
    Variables(String),
    #[error("jinja template error: {0}")]
    Tera(#[from] tera::Error),
    #[error("handlebars template error: {0}")]
    Handlebars(#[from] handlebars::RenderError),
}

/// Errors raised by a chat completion backend.
#[derive(thiserror::Error, Debug)]
pub enum CompletionError {
    #[error("chat completion request failed: {0}")]
    Prompt(#[from] rig::completion::PromptError),
    #[error("completion service error: {0}")]
    Service(String),
    #[error("transcript does not end with a user turn")]
    NoPendingUserTurn,
}

/// Umbrella error for callers that drive a whole session.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Completion(#[from] CompletionError),
}
