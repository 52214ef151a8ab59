//! Provides position-exposure values for derived position codes.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

#[async_trait]
pub trait ExposureProvider: Send + Sync {
    /// Fetches the current position exposure for a batch of position codes.
    /// Codes without a value are absent from the returned map.
    async fn fetch_position_exposure(&self, codes: &[String]) -> Result<HashMap<String, f64>>;
}
