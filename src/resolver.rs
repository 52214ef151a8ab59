//! Cached ISIN to market-ticker resolution.

use std::sync::Arc;
use tracing::warn;

use crate::attribute_provider::AttributeProvider;
use crate::cache::Cache;
use crate::codes;

/// Resolves ISINs to bare market tickers through the attribute service,
/// memoised for the process lifetime.
///
/// ISIN to ticker mappings are static, so entries are never invalidated and
/// a missing mapping is not retried within one process. Vendor errors on a
/// single lookup downgrade to `None`: some unresolvable tickers are expected
/// and must not abort the overlap computation.
pub struct TickerResolver {
    provider: Arc<dyn AttributeProvider>,
    cache: Arc<Cache<String, Option<String>>>,
    source_attribute: String,
    target_attribute: String,
}

impl TickerResolver {
    pub fn new(
        provider: Arc<dyn AttributeProvider>,
        cache: Arc<Cache<String, Option<String>>>,
        source_attribute: &str,
        target_attribute: &str,
    ) -> Self {
        TickerResolver {
            provider,
            cache,
            source_attribute: source_attribute.to_string(),
            target_attribute: target_attribute.to_string(),
        }
    }

    /// Resolves one ISIN. The raw service value carries the asset-class
    /// suffix, which is stripped before caching.
    pub async fn resolve(&self, isin: &str) -> Option<String> {
        if let Some(cached) = self.cache.get(&isin.to_string()).await {
            return cached;
        }

        let resolved = match self
            .provider
            .resolve_attribute(&self.source_attribute, isin, &self.target_attribute)
            .await
        {
            Ok(value) => value.as_deref().and_then(codes::normalize_ticker),
            Err(e) => {
                warn!("Ticker resolution failed for ISIN {isin}: {e}");
                None
            }
        };

        self.cache.insert_if_absent(isin.to_string(), resolved).await
    }
}
