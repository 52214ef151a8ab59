use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::attribute_provider::AttributeProvider;
use crate::exposure_provider::ExposureProvider;

// FbiProvider implementation for AttributeProvider and ExposureProvider
pub struct FbiProvider {
    base_url: String,
}

impl FbiProvider {
    pub fn new(base_url: &str) -> Self {
        FbiProvider {
            base_url: base_url.to_string(),
        }
    }

    fn client(&self) -> Result<reqwest::Client> {
        Ok(reqwest::Client::builder().user_agent("xbo/1.0").build()?)
    }
}

#[derive(Debug, Serialize)]
struct ResolveRequest<'a> {
    source: &'a str,
    identifier: &'a str,
    target: &'a str,
}

#[derive(Debug, Deserialize)]
struct ResolveResponse {
    value: Option<String>,
}

#[derive(Debug, Serialize)]
struct BulkRequest<'a> {
    source: &'a str,
    identifiers: &'a [String],
    target: &'a str,
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    values: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
struct ExposureRequest<'a> {
    codes: &'a [String],
}

#[derive(Debug, Deserialize)]
struct ExposureResponse {
    values: HashMap<String, f64>,
}

#[async_trait]
impl AttributeProvider for FbiProvider {
    #[instrument(
        name = "FbiResolve",
        skip(self),
        fields(identifier = %identifier, target = %target)
    )]
    async fn resolve_attribute(
        &self,
        source: &str,
        identifier: &str,
        target: &str,
    ) -> Result<Option<String>> {
        let url = format!("{}/attributes/resolve", self.base_url);
        debug!("Requesting attribute resolution from {}", url);

        let response = self
            .client()?
            .post(&url)
            .json(&ResolveRequest {
                source,
                identifier,
                target,
            })
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for identifier: {}", e, identifier))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for identifier: {}",
                response.status(),
                identifier
            ));
        }

        let data = response
            .json::<ResolveResponse>()
            .await
            .map_err(|e| anyhow!("Failed to parse resolve response for {}: {}", identifier, e))?;

        Ok(data.value)
    }

    async fn fetch_bulk_attribute(
        &self,
        source: &str,
        identifiers: &[String],
        target: &str,
    ) -> Result<HashMap<String, String>> {
        if identifiers.is_empty() {
            return Ok(HashMap::new());
        }

        let url = format!("{}/attributes/bulk", self.base_url);
        debug!(
            "Requesting {} bulk {} attributes from {}",
            identifiers.len(),
            target,
            url
        );

        let response = self
            .client()?
            .post(&url)
            .json(&BulkRequest {
                source,
                identifiers,
                target,
            })
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for bulk {} lookup", e, target))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for bulk {} lookup",
                response.status(),
                target
            ));
        }

        let data = response
            .json::<BulkResponse>()
            .await
            .map_err(|e| anyhow!("Failed to parse bulk {} response: {}", target, e))?;

        Ok(data.values)
    }
}

#[async_trait]
impl ExposureProvider for FbiProvider {
    async fn fetch_position_exposure(&self, codes: &[String]) -> Result<HashMap<String, f64>> {
        if codes.is_empty() {
            return Ok(HashMap::new());
        }

        let url = format!("{}/exposures", self.base_url);
        debug!("Requesting {} position exposures from {}", codes.len(), url);

        let response = self
            .client()?
            .post(&url)
            .json(&ExposureRequest { codes })
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for exposure batch", e))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for exposure batch",
                response.status()
            ));
        }

        let data = response
            .json::<ExposureResponse>()
            .await
            .map_err(|e| anyhow!("Failed to parse exposure response: {}", e))?;

        Ok(data.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_json(server: &MockServer, endpoint: &str, body: &str) {
        Mock::given(method("POST"))
            .and(path(endpoint))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_successful_attribute_resolution() {
        let server = MockServer::start().await;
        mount_json(
            &server,
            "/attributes/resolve",
            r#"{"value": "EUN5 GY Equity"}"#,
        )
        .await;

        let provider = FbiProvider::new(&server.uri());
        let value = provider
            .resolve_attribute("ISIN", "DE000A0H0785", "BBG")
            .await
            .unwrap();
        assert_eq!(value, Some("EUN5 GY Equity".to_string()));
    }

    #[tokio::test]
    async fn test_resolution_without_mapping_returns_none() {
        let server = MockServer::start().await;
        mount_json(&server, "/attributes/resolve", r#"{"value": null}"#).await;

        let provider = FbiProvider::new(&server.uri());
        let value = provider
            .resolve_attribute("ISIN", "XX0000000000", "BBG")
            .await
            .unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_resolution_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/attributes/resolve"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let provider = FbiProvider::new(&server.uri());
        let result = provider
            .resolve_attribute("ISIN", "DE000A0H0785", "BBG")
            .await;
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "HTTP error: 500 Internal Server Error for identifier: DE000A0H0785"
        );
    }

    #[tokio::test]
    async fn test_resolution_malformed_response() {
        let server = MockServer::start().await;
        mount_json(&server, "/attributes/resolve", "not json").await;

        let provider = FbiProvider::new(&server.uri());
        let result = provider
            .resolve_attribute("ISIN", "DE000A0H0785", "BBG")
            .await;
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse resolve response for DE000A0H0785")
        );
    }

    #[tokio::test]
    async fn test_bulk_attribute_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/attributes/bulk"))
            .and(body_partial_json(serde_json::json!({
                "source": "BBG",
                "target": "DisplayName"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"values": {"EUN5 GY Equity": "EUN5 GY", "IEAC LN Equity": "IEAC LN"}}"#,
            ))
            .mount(&server)
            .await;

        let provider = FbiProvider::new(&server.uri());
        let tickers = vec!["EUN5 GY Equity".to_string(), "IEAC LN Equity".to_string()];
        let values = provider
            .fetch_bulk_attribute("BBG", &tickers, "DisplayName")
            .await
            .unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values.get("EUN5 GY Equity"), Some(&"EUN5 GY".to_string()));
    }

    #[tokio::test]
    async fn test_bulk_fetch_empty_input_skips_request() {
        // No mock mounted: a request would fail the test.
        let provider = FbiProvider::new("http://127.0.0.1:1");
        let values = provider
            .fetch_bulk_attribute("BBG", &[], "DisplayName")
            .await
            .unwrap();
        assert!(values.is_empty());
    }

    #[tokio::test]
    async fn test_bulk_fetch_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/attributes/bulk"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let provider = FbiProvider::new(&server.uri());
        let result = provider
            .fetch_bulk_attribute("BBG", &["EUN5 GY Equity".to_string()], "DisplayName")
            .await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().starts_with("HTTP error: 503"));
    }

    #[tokio::test]
    async fn test_exposure_fetch() {
        let server = MockServer::start().await;
        mount_json(
            &server,
            "/exposures",
            r#"{"values": {"NMP.EUN5_GY": 0.42, "NMP.IEAC_LN": 1.05}}"#,
        )
        .await;

        let provider = FbiProvider::new(&server.uri());
        let codes = vec!["NMP.EUN5_GY".to_string(), "NMP.IEAC_LN".to_string()];
        let values = provider.fetch_position_exposure(&codes).await.unwrap();
        assert_eq!(values.get("NMP.EUN5_GY"), Some(&0.42));
        assert_eq!(values.get("NMP.IEAC_LN"), Some(&1.05));
    }

    #[tokio::test]
    async fn test_exposure_fetch_empty_input_skips_request() {
        let provider = FbiProvider::new("http://127.0.0.1:1");
        let values = provider.fetch_position_exposure(&[]).await.unwrap();
        assert!(values.is_empty());
    }
}
