//! Attribute translation seam for the market-data service.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

#[async_trait]
pub trait AttributeProvider: Send + Sync {
    /// Translates one identifier between attribute spaces. `None` when the
    /// service has no mapping for it.
    async fn resolve_attribute(
        &self,
        source: &str,
        identifier: &str,
        target: &str,
    ) -> Result<Option<String>>;

    /// Translates a batch of identifiers in one call. Identifiers the
    /// service does not know are absent from the returned map.
    async fn fetch_bulk_attribute(
        &self,
        source: &str,
        identifiers: &[String],
        target: &str,
    ) -> Result<HashMap<String, String>>;
}
