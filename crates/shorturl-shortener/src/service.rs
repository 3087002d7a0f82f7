use async_trait::async_trait;
use shorturl_core::{
    NewUrlMapping, ReduceRequest, ReducedUrl, Repository, ShortToken, Shortener, ShortenerError,
    UrlMapping,
};
use shorturl_generator::Generator;
use std::sync::Arc;
use tracing::{debug, error, info};
use typed_builder::TypedBuilder;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_BATCH_SIZE: usize = 5;

#[derive(Debug, Clone, TypedBuilder)]
pub struct ShortenerConfig {
    /// Prefix of every short URL; a trailing `/` is ignored.
    #[builder(default = DEFAULT_BASE_URL.to_string(), setter(into))]
    base_url: String,
    /// Number of items sent to the backend per `add_batch` call.
    #[builder(default = DEFAULT_BATCH_SIZE)]
    batch_size: usize,
}

impl ShortenerConfig {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

impl Default for ShortenerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// The reduction engine.
///
/// Wraps a `Repository` and a `Generator`. Generated tokens are candidates
/// only: when the URL is already stored the backend returns the existing
/// token. No collision retry is performed.
#[derive(Debug, Clone)]
pub struct ShortenerService<R, G> {
    repository: Arc<R>,
    generator: Arc<G>,
    config: ShortenerConfig,
}

impl<R: Repository, G: Generator> ShortenerService<R, G> {
    pub fn new(repository: R, generator: G, config: ShortenerConfig) -> Self {
        Self::from_shared(Arc::new(repository), Arc::new(generator), config)
    }

    /// Builds a service around handles that are shared with other owners.
    pub fn from_shared(
        repository: Arc<R>,
        generator: Arc<G>,
        mut config: ShortenerConfig,
    ) -> Self {
        config.batch_size = config.batch_size.max(1);
        Self {
            repository,
            generator,
            config,
        }
    }

    pub fn config(&self) -> &ShortenerConfig {
        &self.config
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    fn short_url(&self, token: &ShortToken) -> String {
        token.to_url(&self.config.base_url)
    }

    fn candidate(&self, request: ReduceRequest) -> NewUrlMapping {
        NewUrlMapping::new(
            request.correlation_id,
            request.original_url,
            self.generator.generate(),
        )
    }

    fn reduced(&self, mapping: UrlMapping) -> ReducedUrl {
        ReducedUrl {
            short_url: self.short_url(&mapping.short_url),
            correlation_id: mapping.correlation_id,
            original_url: mapping.original_url,
        }
    }
}

#[async_trait]
impl<R: Repository, G: Generator> Shortener for ShortenerService<R, G> {
    async fn reduce_url(&self, request: ReduceRequest) -> Result<String, ShortenerError> {
        let original_url = request.original_url.clone();
        let token = self
            .repository
            .add_url(self.candidate(request))
            .await
            .map_err(|e| {
                error!(original_url, error = %e, "can't add short url to storage");
                ShortenerError::Reduction(e)
            })?;

        let short_url = self.short_url(&token);
        info!(original_url, short_url, "url reduced");
        Ok(short_url)
    }

    async fn batch_reduce_url(
        &self,
        requests: Vec<ReduceRequest>,
    ) -> Result<Vec<ReducedUrl>, ShortenerError> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let total = requests.len();
        let mut shortened = Vec::with_capacity(total);
        let mut requests = requests.into_iter();

        for chunk_index in 0.. {
            let chunk: Vec<NewUrlMapping> = requests
                .by_ref()
                .take(self.config.batch_size)
                .map(|request| self.candidate(request))
                .collect();
            if chunk.is_empty() {
                break;
            }

            match self.repository.add_batch(chunk).await {
                Ok(stored) => shortened.extend(stored.into_iter().map(|m| self.reduced(m))),
                Err(source) => {
                    error!(
                        chunk = chunk_index,
                        shortened = shortened.len(),
                        total,
                        error = %source,
                        "batch chunk failed"
                    );
                    if shortened.is_empty() {
                        return Err(ShortenerError::NoBatchShorten { source });
                    }
                    return Err(ShortenerError::SomeBatchShortenFailed { shortened, source });
                }
            }
        }

        info!(count = shortened.len(), "batch reduced");
        Ok(shortened)
    }

    async fn get_url(&self, token: &str) -> Option<String> {
        match self.lookup(token).await {
            Ok(Some(mapping)) => Some(mapping.original_url),
            Ok(None) => {
                debug!(token, "short url not found");
                None
            }
            Err(e) => {
                error!(token, error = %e, "can't get original url");
                None
            }
        }
    }

    async fn lookup(&self, token: &str) -> Result<Option<UrlMapping>, ShortenerError> {
        self.repository
            .get_url(&ShortToken::from(token))
            .await
            .map_err(ShortenerError::Lookup)
    }
}
