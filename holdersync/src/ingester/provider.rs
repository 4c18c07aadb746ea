use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use derive_more::Display;
use serde_json::Value;

use crate::collections::CollectionId;
use crate::holders::TokenRecord;

/// Outcome of one bounded range query against a source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RangeFetch {
    /// Raw ownership records for the requested range. May be empty for
    /// range-based sources whose index space is sparse.
    Records(Vec<TokenRecord>),
    /// The source affirmatively reported the end of the collection.
    Exhausted,
}

#[derive(Clone, Debug, Display, PartialEq, Eq)]
pub enum ProviderError {
    #[display("rate limited by source")]
    RateLimited,
    #[display("request timed out")]
    Timeout,
    #[display("query exceeded source compute limit")]
    GasExceeded,
    #[display("network error: {_0}")]
    Network(String),
    #[display("undecodable payload: {_0}")]
    Decode(String),
    #[display("authentication rejected: {_0}")]
    Auth(String),
    #[display("unknown collection: {_0}")]
    UnknownCollection(String),
    #[display("malformed request: {_0}")]
    MalformedRequest(String),
}

impl ProviderError {
    /// Transient errors are retried by the governor. Decode failures are
    /// transient: source inconsistency is common and self-heals on retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited
                | ProviderError::Timeout
                | ProviderError::GasExceeded
                | ProviderError::Network(_)
                | ProviderError::Decode(_)
        )
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ProviderError::RateLimited)
    }
}

impl std::error::Error for ProviderError {}

/// The Range Fetcher boundary: one bounded query per call for a
/// contiguous index range of a single collection.
#[async_trait::async_trait]
pub trait Provider: Sync + Send {
    async fn fetch_range(
        &self,
        collection: &CollectionId,
        start_index: u64,
        batch_size: u64,
    ) -> Result<RangeFetch, ProviderError>;
}

/// Offset/page-based indexer API source.
#[derive(Clone)]
pub struct IndexerProvider {
    base_url: String,
    http: reqwest::Client,
}

#[async_trait::async_trait]
impl Provider for IndexerProvider {
    async fn fetch_range(
        &self,
        collection: &CollectionId,
        start_index: u64,
        batch_size: u64,
    ) -> Result<RangeFetch, ProviderError> {
        let url = format!(
            "{}/collections/{}/tokens?offset={}&limit={}",
            self.base_url, collection, start_index, batch_size
        );

        let response = self.http.get(&url).send().await.map_err(classify_reqwest_error)?;
        let status = response.status().as_u16();
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body, collection));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        let records = decode_token_list(&body)?;

        // An empty page from an offset-paginated indexer is an
        // affirmative end-of-collection signal.
        if records.is_empty() {
            Ok(RangeFetch::Exhausted)
        } else {
            Ok(RangeFetch::Records(records))
        }
    }
}

/// Direct chain source: a smart-contract range query with base64-encoded
/// arguments and a binary-or-JSON result payload.
#[derive(Clone)]
pub struct ChainRpcProvider {
    endpoint: String,
    http: reqwest::Client,
}

#[async_trait::async_trait]
impl Provider for ChainRpcProvider {
    async fn fetch_range(
        &self,
        collection: &CollectionId,
        start_index: u64,
        batch_size: u64,
    ) -> Result<RangeFetch, ProviderError> {
        let query = format!(
            r#"{{"tokens_in_range":{{"start_index":{},"count":{}}}}}"#,
            start_index, batch_size
        );
        let url = format!(
            "{}/wasm/contract/{}/smart/{}",
            self.endpoint,
            collection,
            BASE64.encode(query)
        );

        let response = self.http.get(&url).send().await.map_err(classify_reqwest_error)?;
        let status = response.status().as_u16();
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body, collection));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        // Range queries cannot distinguish "sparse range" from "past the
        // end"; an empty result is just an empty batch, and termination
        // is the orchestrator's call.
        decode_chain_payload(&body).map(RangeFetch::Records)
    }
}

pub fn indexer(base_url: &str) -> IndexerProvider {
    IndexerProvider {
        base_url: base_url.trim_end_matches('/').to_string(),
        http: reqwest::Client::new(),
    }
}

pub fn chain_rpc(endpoint: &str) -> ChainRpcProvider {
    ChainRpcProvider {
        endpoint: endpoint.trim_end_matches('/').to_string(),
        http: reqwest::Client::new(),
    }
}

/// Decodes a chain-query response body. The token list may arrive inside
/// a `data` or `smart` envelope, itself either direct JSON or a base64
/// string wrapping JSON.
pub fn decode_chain_payload(body: &Value) -> Result<Vec<TokenRecord>, ProviderError> {
    let payload = body.get("data").or_else(|| body.get("smart")).unwrap_or(body);

    match payload {
        Value::String(encoded) => {
            let bytes = BASE64
                .decode(encoded)
                .map_err(|e| ProviderError::Decode(format!("bad base64 payload: {e}")))?;
            let inner: Value = serde_json::from_slice(&bytes)
                .map_err(|e| ProviderError::Decode(format!("bad binary payload: {e}")))?;
            decode_token_list(&inner)
        }
        _ => decode_token_list(payload),
    }
}

/// Decodes `{"tokens": [...]}` or a bare array into validated records.
pub fn decode_token_list(payload: &Value) -> Result<Vec<TokenRecord>, ProviderError> {
    let list = payload.get("tokens").unwrap_or(payload);

    let records: Vec<TokenRecord> = serde_json::from_value(list.clone())
        .map_err(|e| ProviderError::Decode(format!("unexpected token shape: {e}")))?;

    for record in &records {
        if !record.is_valid() {
            return Err(ProviderError::Decode(format!(
                "record with empty field: token_id={:?} owner_id={:?}",
                record.token_id, record.owner_id
            )));
        }
    }

    Ok(records)
}

pub fn classify_status(status: u16, body: &str, collection: &CollectionId) -> ProviderError {
    match status {
        429 => ProviderError::RateLimited,
        401 | 403 => ProviderError::Auth(body.to_string()),
        404 => ProviderError::UnknownCollection(collection.to_string()),
        400 => ProviderError::MalformedRequest(body.to_string()),
        // Several chain gateways report compute exhaustion as a 5xx with
        // an "out of gas" message in the body.
        _ if body.contains("out of gas") => ProviderError::GasExceeded,
        _ => ProviderError::Network(format!("status {status}: {body}")),
    }
}

fn classify_reqwest_error(error: reqwest::Error) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Network(error.to_string())
    }
}
