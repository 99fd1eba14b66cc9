pub mod error;
pub mod hls;
pub mod options;
pub mod registry;
pub mod universal;
pub mod utils;

use async_trait::async_trait;

use crate::media::Data;

pub use error::ExtractorError;
pub use options::ExtractOptions;
pub use registry::{ExtractorRegistry, ExtractorRegistryBuilder, default_registry};
pub use universal::UniversalExtractor;

/// A site adapter producing [`Data`] items from a page url.
///
/// Single pages usually return one item; playlist pages return one item per
/// selected entry, with per-entry failures recorded on the items themselves.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    async fn extract(
        &self,
        url: &str,
        options: &ExtractOptions,
    ) -> Result<Vec<Data>, ExtractorError>;
}
