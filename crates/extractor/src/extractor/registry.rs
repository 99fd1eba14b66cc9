use std::{fmt, sync::Arc};

use rustc_hash::FxHashMap;
use tracing::debug;
use url::Url;

use super::{ExtractOptions, Extractor, ExtractorError, UniversalExtractor, utils};
use crate::{http::Transport, media::Data};

/// Immutable mapping from domain key to extractor.
///
/// Built once at startup through [`ExtractorRegistry::builder`]; lookups
/// never mutate it, so it can be shared freely behind an `Arc`.
pub struct ExtractorRegistry {
    extractors: FxHashMap<String, Arc<dyn Extractor>>,
    fallback: Option<Arc<dyn Extractor>>,
}

impl fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorRegistry")
            .field("domains", &self.domains())
            .field("fallback", &self.fallback.as_ref().map(|e| e.name()))
            .finish()
    }
}

#[derive(Default)]
pub struct ExtractorRegistryBuilder {
    extractors: FxHashMap<String, Arc<dyn Extractor>>,
    fallback: Option<Arc<dyn Extractor>>,
}

impl ExtractorRegistryBuilder {
    /// Registers `extractor` for every domain key in `domains`.
    ///
    /// A later registration for the same key wins.
    pub fn register(mut self, domains: &[&str], extractor: Arc<dyn Extractor>) -> Self {
        for domain in domains {
            if self
                .extractors
                .insert(domain.to_string(), extractor.clone())
                .is_some()
            {
                debug!(domain, "Replacing previously registered extractor");
            }
        }
        self
    }

    /// Extractor used for urls whose domain has no registration.
    pub fn fallback(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.fallback = Some(extractor);
        self
    }

    pub fn build(self) -> ExtractorRegistry {
        ExtractorRegistry {
            extractors: self.extractors,
            fallback: self.fallback,
        }
    }
}

impl ExtractorRegistry {
    pub fn builder() -> ExtractorRegistryBuilder {
        ExtractorRegistryBuilder::default()
    }

    /// Registered domain keys, sorted.
    pub fn domains(&self) -> Vec<&str> {
        let mut domains: Vec<&str> = self.extractors.keys().map(String::as_str).collect();
        domains.sort_unstable();
        domains
    }

    /// Extractor registered for the domain key `domain`, without fallback.
    pub fn get(&self, domain: &str) -> Option<&Arc<dyn Extractor>> {
        self.extractors.get(domain)
    }

    /// Picks the extractor responsible for `url`.
    pub fn resolve(&self, url: &str) -> Result<&Arc<dyn Extractor>, ExtractorError> {
        let parsed = Url::parse(url).map_err(|_| ExtractorError::InvalidUrl(url.to_string()))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| ExtractorError::InvalidUrl(url.to_string()))?;

        utils::domain_of(host)
            .and_then(|domain| self.get(domain))
            .or(self.fallback.as_ref())
            .ok_or_else(|| ExtractorError::UnsupportedUrl(url.to_string()))
    }

    /// Extracts `url` with the matching extractor and fills the stream
    /// defaults of every successful item.
    pub async fn extract(
        &self,
        url: &str,
        options: &ExtractOptions,
    ) -> Result<Vec<Data>, ExtractorError> {
        let extractor = self.resolve(url)?;
        debug!(url, extractor = extractor.name(), "Extracting");
        let mut data = extractor.extract(url, options).await?;
        for item in data.iter_mut().filter(|d| !d.is_failed()) {
            item.fill_up_streams();
        }
        Ok(data)
    }
}

/// Registry with the built-in extractors.
pub fn default_registry(transport: Arc<dyn Transport>) -> ExtractorRegistry {
    ExtractorRegistry::builder()
        .fallback(Arc::new(UniversalExtractor::new(transport)))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{MediaType, Part, Stream};
    use async_trait::async_trait;

    struct NamedExtractor(&'static str);

    #[async_trait]
    impl Extractor for NamedExtractor {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn extract(
            &self,
            url: &str,
            _options: &ExtractOptions,
        ) -> Result<Vec<Data>, ExtractorError> {
            let stream = Stream::new("hd").with_part(Part::new(format!("{url}/v.flv"), 7, "flv"));
            Ok(vec![
                Data::new(self.0, "clip", MediaType::Video, url).with_stream(stream),
            ])
        }
    }

    fn registry() -> ExtractorRegistry {
        ExtractorRegistry::builder()
            .register(&["bilibili", "b23"], Arc::new(NamedExtractor("bilibili")))
            .register(&["youku"], Arc::new(NamedExtractor("youku")))
            .fallback(Arc::new(NamedExtractor("universal")))
            .build()
    }

    #[test]
    fn test_resolve_by_domain() {
        let registry = registry();
        let name = |url: &str| registry.resolve(url).map(|e| e.name()).unwrap();
        assert_eq!(name("https://www.bilibili.com/video/BV1"), "bilibili");
        assert_eq!(name("https://b23.tv/abc"), "bilibili");
        assert_eq!(name("https://v.youku.com/v_show/id_x.html"), "youku");
        assert_eq!(name("https://example.org/file.mp4"), "universal");
        assert_eq!(name("http://127.0.0.1:8080/file.mp4"), "universal");
    }

    #[test]
    fn test_resolve_without_fallback() {
        let registry = ExtractorRegistry::builder()
            .register(&["youku"], Arc::new(NamedExtractor("youku")))
            .build();
        assert!(matches!(
            registry.resolve("https://example.org/x"),
            Err(ExtractorError::UnsupportedUrl(_))
        ));
        assert!(matches!(
            registry.resolve("example.org/x"),
            Err(ExtractorError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_get_ignores_fallback() {
        let registry = registry();
        assert_eq!(registry.get("youku").map(|e| e.name()), Some("youku"));
        assert!(registry.get("example").is_none());
    }

    #[test]
    fn test_domains_sorted() {
        assert_eq!(registry().domains(), vec!["b23", "bilibili", "youku"]);
    }

    #[tokio::test]
    async fn test_extract_fills_stream_defaults() {
        let data = registry()
            .extract("https://www.bilibili.com/video/BV1", &ExtractOptions::default())
            .await
            .unwrap();
        let stream = data[0].stream("hd").unwrap();
        assert_eq!(stream.quality, "hd");
        assert_eq!(stream.ext, "mp4");
        assert_eq!(stream.size, 7);
    }
}
