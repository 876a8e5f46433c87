//! Lemmatization
//!
//! The lemmatizer is an external NLP service. Calls are slow, so the router
//! goes through [`CachedLemmatizer`], keyed by the exact input text.

mod http;

pub use http::HttpLemmatizer;

use std::num::NonZeroUsize;

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::Mutex;

use crate::Result;

/// Default number of cached lemmatizations
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Turns text into a sequence of lemma tokens
#[async_trait]
pub trait Lemmatizer: Send + Sync {
    /// Lemmatize a piece of text
    ///
    /// # Errors
    ///
    /// Returns `Error::Nlp` if the service fails
    async fn lemmatize(&self, text: &str) -> Result<Vec<String>>;
}

/// Lowercased whitespace tokens; used when no NLP service is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceLemmatizer;

#[async_trait]
impl Lemmatizer for WhitespaceLemmatizer {
    async fn lemmatize(&self, text: &str) -> Result<Vec<String>> {
        Ok(text.split_whitespace().map(str::to_lowercase).collect())
    }
}

/// LRU cache in front of another lemmatizer
pub struct CachedLemmatizer<L> {
    inner: L,
    cache: Mutex<LruCache<String, Vec<String>>>,
}

impl<L: Lemmatizer> CachedLemmatizer<L> {
    /// Wrap a lemmatizer with a cache of `capacity` entries (minimum 1)
    #[must_use]
    pub fn new(inner: L, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of cached entries
    pub async fn cached(&self) -> usize {
        self.cache.lock().await.len()
    }
}

#[async_trait]
impl<L: Lemmatizer> Lemmatizer for CachedLemmatizer<L> {
    async fn lemmatize(&self, text: &str) -> Result<Vec<String>> {
        {
            let mut cache = self.cache.lock().await;
            if let Some(cached) = cache.get(text) {
                return Ok(cached.clone());
            }
        }

        // Failures are not cached
        let lemmas = self.inner.lemmatize(text).await?;
        self.cache
            .lock()
            .await
            .put(text.to_string(), lemmas.clone());
        Ok(lemmas)
    }
}
