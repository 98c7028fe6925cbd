// Transcache Infrastructure - HTTP Adapters
// Implements: TranslationClient (OpenAI-compatible chat completions), CachePurger (webhook)

pub mod openai_client;
pub mod webhook_purger;

#[cfg(test)]
mod test_server;

pub use openai_client::{OpenAiConfig, OpenAiTranslationClient};
pub use webhook_purger::WebhookPurger;
