use std::sync::Arc;

use crate::{
    codec::ImageCodec,
    config::Config,
    error::Result,
    models::ImageItem,
    providers::{build_http_client, ImageGenerationProvider, ProviderSelector, VolcengineProvider},
    proxy::TryOnProxy,
    session::TryOnSession,
    storage::BlobStorageManager,
};

/// Everything a caller needs, wired from one [`Config`].
#[derive(Clone)]
pub struct TryOnClient {
    selector: Arc<ProviderSelector>,
    codec: ImageCodec,
    storage: Option<Arc<BlobStorageManager>>,
}

impl TryOnClient {
    pub fn new(config: Config) -> Result<Self> {
        let codec = ImageCodec::new(build_http_client()?, config.timeouts.fetch);
        Ok(Self {
            selector: Arc::new(ProviderSelector::new(config)),
            codec,
            storage: None,
        })
    }

    pub async fn with_storage(config: Config) -> Result<Self> {
        let storage = BlobStorageManager::new(config.storage.clone()).await?;
        let mut client = Self::new(config)?;
        client.storage = Some(Arc::new(storage));
        Ok(client)
    }

    pub fn config(&self) -> &Config {
        self.selector.config()
    }

    pub fn selector(&self) -> &Arc<ProviderSelector> {
        &self.selector
    }

    pub fn provider(&self) -> Result<Arc<dyn ImageGenerationProvider>> {
        self.selector.resolve()
    }

    pub fn codec(&self) -> &ImageCodec {
        &self.codec
    }

    pub fn storage(&self) -> Option<&Arc<BlobStorageManager>> {
        self.storage.as_ref()
    }

    pub fn session(&self, people: Vec<ImageItem>, garments: Vec<ImageItem>) -> TryOnSession {
        TryOnSession::new(people, garments)
    }

    /// The server-side proxy always talks to Volcengine, whatever provider the
    /// client side is configured with.
    pub async fn proxy(&self) -> Result<TryOnProxy> {
        let config = self.config();
        let provider = VolcengineProvider::new(&config.volcengine, config.timeouts)?;
        let storage = match &self.storage {
            Some(storage) => Arc::clone(storage),
            None => Arc::new(BlobStorageManager::new(config.storage.clone()).await?),
        };
        Ok(TryOnProxy::new(
            Arc::new(provider),
            storage,
            config.inline_limit_bytes,
        ))
    }
}
