pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod providers;
pub mod proxy;
#[cfg(feature = "server")]
pub mod server;
pub mod session;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::TryOnClient;
pub use codec::{bytes_to_data_uri, ImageCodec};
pub use config::{Config, GeminiConfig, ProviderKind, StorageConfig, Timeouts, VolcengineConfig};
pub use error::{Result, TryOnError};
pub use models::{GeneratedImage, HistoryItem, ImageItem, TryOnProxyRequest, TryOnProxyResponse};
pub use providers::{GeminiProvider, ImageGenerationProvider, ProviderSelector, VolcengineProvider};
pub use proxy::TryOnProxy;
pub use session::{Step, TryOnSession};
pub use storage::{BlobStorageManager, LocalBlobStorage, MemoryBlobStorage};
