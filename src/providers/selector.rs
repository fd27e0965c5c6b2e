use std::sync::Arc;

use once_cell::sync::OnceCell;

use super::{GeminiProvider, ImageGenerationProvider, VolcengineProvider};
use crate::{
    config::{Config, ProviderKind},
    error::Result,
};

/// Builds the configured provider on first use and hands out the same
/// instance afterwards.
pub struct ProviderSelector {
    config: Config,
    provider: OnceCell<Arc<dyn ImageGenerationProvider>>,
}

impl ProviderSelector {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            provider: OnceCell::new(),
        }
    }

    /// Seeds the selector with an already built provider.
    pub fn with_provider(config: Config, provider: Arc<dyn ImageGenerationProvider>) -> Self {
        Self {
            config,
            provider: OnceCell::with_value(provider),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn resolve(&self) -> Result<Arc<dyn ImageGenerationProvider>> {
        self.provider
            .get_or_try_init(|| {
                let kind = self.config.provider_kind()?;
                let provider = build_provider(kind, &self.config)?;
                log::info!("Image provider ready: {}", provider.name());
                Ok(provider)
            })
            .map(Arc::clone)
    }
}

pub fn build_provider(kind: ProviderKind, config: &Config) -> Result<Arc<dyn ImageGenerationProvider>> {
    let provider: Arc<dyn ImageGenerationProvider> = match kind {
        ProviderKind::Volcengine => Arc::new(VolcengineProvider::new(
            &config.volcengine,
            config.timeouts,
        )?),
        ProviderKind::Gemini => Arc::new(GeminiProvider::new(&config.gemini, config.timeouts)?),
    };
    Ok(provider)
}
