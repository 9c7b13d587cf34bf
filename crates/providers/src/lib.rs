//! Chat model provider implementations for cocochat.
//!
//! All providers implement the `cocochat_core::Provider` trait.
//! [`build_from_config`] selects and constructs the configured one.

pub mod openai_compat;

use std::sync::Arc;
use std::time::Duration;

use cocochat_config::AppConfig;
use cocochat_core::error::ProviderError;
use cocochat_core::provider::Provider;

pub use openai_compat::OpenAiCompatProvider;

/// Build the configured provider.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let model = &config.model;
    let base_url = model
        .api_url
        .clone()
        .unwrap_or_else(|| default_base_url(&model.provider));

    let api_key = match &model.api_key {
        Some(key) => key.clone(),
        None => {
            tracing::warn!(
                provider = %model.provider,
                "No API key configured; set COCOCHAT_API_KEY or OPENAI_API_KEY"
            );
            String::new()
        }
    };

    match model.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiCompatProvider::new(
            &model.provider,
            base_url,
            api_key,
            Duration::from_secs(model.request_timeout_secs),
        )?)),
        other => Err(ProviderError::NotConfigured(format!(
            "unknown provider '{other}'"
        ))),
    }
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openai" => "https://api.openai.com/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}
