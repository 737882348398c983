//! LLM Provider implementations for zeroloop.
//!
//! All providers implement the `zeroloop_core::Provider` trait.
//! [`chat_model`] binds a configured endpoint to a [`ChatModel`].

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use std::sync::Arc;
use zeroloop_config::{AppConfig, ModelConfig};
use zeroloop_core::error::ProviderError;
use zeroloop_core::provider::ChatModel;

/// Build a [`ChatModel`] for one of the configured model sections.
pub fn chat_model(config: &AppConfig, model: &ModelConfig) -> Result<ChatModel, ProviderError> {
    let api_key = config.api_key_for(model).unwrap_or_default();
    let provider = OpenAiCompatProvider::new(&model.provider, &model.base_url, api_key)?;
    let mut chat = ChatModel::new(Arc::new(provider), &model.model).with_temperature(model.temperature);
    if let Some(max) = model.max_tokens {
        chat = chat.with_max_tokens(max);
    }
    Ok(chat)
}
