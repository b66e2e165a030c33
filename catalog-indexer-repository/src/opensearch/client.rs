//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `SearchEngineClient`
//! using the OpenSearch Rust client.

use async_trait::async_trait;
use opensearch::{
    cluster::ClusterHealthParts,
    http::request::JsonBody,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesExistsParts},
    BulkParts, OpenSearch,
};
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::errors::SearchError;
use crate::interfaces::{BulkDocument, SearchEngineClient};
use crate::opensearch::bulk::{bulk_lines, failed_items};

/// Error type OpenSearch returns when creating an index that already exists.
const ALREADY_EXISTS: &str = "resource_already_exists_exception";

/// OpenSearch client implementation.
///
/// # Example
///
/// ```ignore
/// let client = OpenSearchClient::new("http://localhost:9200").await?;
/// let doc = BulkDocument::new(genre.id.to_string(), &genre)?;
/// client.bulk_upsert("genres", &[doc]).await?;
/// ```
pub struct OpenSearchClient {
    client: OpenSearch,
}

impl OpenSearchClient {
    /// Create a new OpenSearch client connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchClient)` - A new client instance
    /// * `Err(SearchError)` - If connection setup fails
    pub async fn new(url: &str) -> Result<Self, SearchError> {
        let parsed_url = Url::parse(url).map_err(|e| SearchError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(url = %url, "Created OpenSearch client");

        Ok(Self { client })
    }
}

#[async_trait]
impl SearchEngineClient for OpenSearchClient {
    async fn index_exists(&self, index: &str) -> Result<bool, SearchError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        match response.status_code().as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(SearchError::from_status(status, &body, SearchError::query))
            }
        }
    }

    #[instrument(skip(self, body))]
    async fn create_index(&self, index: &str, body: &Value) -> Result<(), SearchError> {
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(body.clone())
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let status = response.status_code();
        if status.is_success() {
            info!(index = %index, "Created search index");
            return Ok(());
        }

        let error_body = response.text().await.unwrap_or_default();
        if error_body.contains(ALREADY_EXISTS) {
            debug!(index = %index, "Search index was created concurrently");
            return Ok(());
        }

        error!(status = %status, body = %error_body, "Index creation failed");
        Err(SearchError::from_status(
            status.as_u16(),
            &error_body,
            SearchError::index_creation,
        ))
    }

    #[instrument(skip(self, documents), fields(count = documents.len()))]
    async fn bulk_upsert(&self, index: &str, documents: &[BulkDocument]) -> Result<(), SearchError> {
        if documents.is_empty() {
            return Ok(());
        }

        let body: Vec<JsonBody<Value>> = bulk_lines(index, documents)
            .into_iter()
            .map(JsonBody::from)
            .collect();

        let response = self
            .client
            .bulk(BulkParts::Index(index))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Bulk request failed");
            return Err(SearchError::from_status(
                status.as_u16(),
                &error_body,
                SearchError::bulk_index,
            ));
        }

        let response_body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))?;

        let failures = failed_items(&response_body);
        if let Some(first) = failures.first() {
            warn!(
                index = %index,
                failed = failures.len(),
                total = documents.len(),
                first_id = %first.id,
                first_status = first.status,
                first_reason = %first.reason,
                "Bulk upsert rejected documents"
            );
            return Err(SearchError::bulk_index(format!(
                "{} of {} documents rejected by {}; first: id={} status={} reason={}",
                failures.len(),
                documents.len(),
                index,
                first.id,
                first.status,
                first.reason
            )));
        }

        debug!(index = %index, count = documents.len(), "Bulk upsert applied");
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, SearchError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let health: Value = response
            .json()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))?;
        let status = health
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("unknown");

        info!(status = %status, "OpenSearch cluster status");

        Ok(status == "green" || status == "yellow")
    }
}
