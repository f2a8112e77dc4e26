//! Azure OpenAI, reached through its OpenAI-compatible `/openai/v1` surface.
//!
//! The deployment name is used as the model identifier.
use rig::{agent::Agent, client::CompletionClient, providers::openai};

use crate::config::Settings;

/// The agent type produced by [`agent`].
pub type AzureAgent = Agent<<openai::Client as CompletionClient>::CompletionModel>;

/// Turn a resource endpoint (`https://name.openai.azure.com/`) into the v1 base url.
/// Endpoints that already end in `/v1` are used as given.
pub fn base_url(endpoint: &str) -> String {
    let endpoint = endpoint.trim_end_matches('/');

    if endpoint.ends_with("/v1") {
        endpoint.to_string()
    } else {
        format!("{endpoint}/openai/v1")
    }
}

pub fn client(settings: &Settings) -> openai::Client {
    openai::Client::from_url(&settings.api_key, &base_url(&settings.endpoint))
}

/// Build an agent for the configured deployment, with the configured system prompt as preamble.
pub fn agent(settings: &Settings) -> AzureAgent {
    let client = client(settings);
    let mut builder = client.agent(&settings.deployment);

    if let Some(preamble) = &settings.system_prompt {
        builder = builder.preamble(preamble);
    }

    tracing::debug!(deployment = %settings.deployment, "Built Azure OpenAI agent");
    builder.build()
}
