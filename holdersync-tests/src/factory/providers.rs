use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use holdersync::{CollectionId, Provider, ProviderError, RangeFetch, TokenRecord};
use tokio_util::sync::CancellationToken;

pub fn token_records(pairs: &[(&str, &str)]) -> Vec<TokenRecord> {
    pairs.iter().map(|(token_id, owner_id)| TokenRecord::new(token_id, owner_id)).collect()
}

pub fn page(pairs: &[(&str, &str)]) -> Result<RangeFetch, ProviderError> {
    Ok(RangeFetch::Records(token_records(pairs)))
}

pub fn exhausted() -> Result<RangeFetch, ProviderError> {
    Ok(RangeFetch::Exhausted)
}

pub fn empty_page() -> Result<RangeFetch, ProviderError> {
    Ok(RangeFetch::Records(vec![]))
}

/// Serves a scripted sequence of pages, one per call, regardless of the
/// requested range. Reports exhaustion once the script runs out.
pub struct ScriptedProvider {
    pages: Mutex<VecDeque<Result<RangeFetch, ProviderError>>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(pages: Vec<Result<RangeFetch, ProviderError>>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    async fn fetch_range(
        &self,
        _collection: &CollectionId,
        _start_index: u64,
        _batch_size: u64,
    ) -> Result<RangeFetch, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pages.lock().unwrap().pop_front().unwrap_or(Ok(RangeFetch::Exhausted))
    }
}

/// Scripts pages per collection id, for coordinator-level tests.
pub struct MultiCollectionProvider {
    pages: Mutex<HashMap<String, VecDeque<Result<RangeFetch, ProviderError>>>>,
}

impl MultiCollectionProvider {
    pub fn new(scripts: Vec<(&str, Vec<Result<RangeFetch, ProviderError>>)>) -> Self {
        Self {
            pages: Mutex::new(
                scripts
                    .into_iter()
                    .map(|(collection_id, pages)| (collection_id.to_string(), pages.into()))
                    .collect(),
            ),
        }
    }
}

#[async_trait::async_trait]
impl Provider for MultiCollectionProvider {
    async fn fetch_range(
        &self,
        collection: &CollectionId,
        _start_index: u64,
        _batch_size: u64,
    ) -> Result<RangeFetch, ProviderError> {
        self.pages
            .lock()
            .unwrap()
            .get_mut(collection.as_str())
            .and_then(|pages| pages.pop_front())
            .unwrap_or(Ok(RangeFetch::Exhausted))
    }
}

/// Always returns an empty (zero new tokens) batch, like a sparse range
/// source scanned past its last token.
pub struct EmptyPagesProvider {
    calls: AtomicUsize,
}

impl EmptyPagesProvider {
    pub fn new() -> Self {
        Self { calls: AtomicUsize::new(0) }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for EmptyPagesProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Provider for EmptyPagesProvider {
    async fn fetch_range(
        &self,
        _collection: &CollectionId,
        _start_index: u64,
        _batch_size: u64,
    ) -> Result<RangeFetch, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(RangeFetch::Records(vec![]))
    }
}

/// Fabricates one fresh token per call, so only the configured upper
/// bound can end the scan.
pub struct EndlessProvider {
    calls: AtomicUsize,
}

impl EndlessProvider {
    pub fn new() -> Self {
        Self { calls: AtomicUsize::new(0) }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for EndlessProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Provider for EndlessProvider {
    async fn fetch_range(
        &self,
        _collection: &CollectionId,
        start_index: u64,
        _batch_size: u64,
    ) -> Result<RangeFetch, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(RangeFetch::Records(vec![TokenRecord::new(
            &format!("t{start_index}"),
            &format!("owner{start_index}"),
        )]))
    }
}

/// Fails every call with the given error.
pub struct FailingProvider {
    error: ProviderError,
    calls: AtomicUsize,
}

impl FailingProvider {
    pub fn new(error: ProviderError) -> Self {
        Self {
            error,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Provider for FailingProvider {
    async fn fetch_range(
        &self,
        _collection: &CollectionId,
        _start_index: u64,
        _batch_size: u64,
    ) -> Result<RangeFetch, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

/// Cancels the supplied token when asked for a designated collection,
/// like an operator interrupt landing mid-run. Other collections are
/// served by the wrapped provider.
pub struct InterruptingProvider {
    inner: MultiCollectionProvider,
    interrupt_at: String,
    cancel: CancellationToken,
}

impl InterruptingProvider {
    pub fn new(
        inner: MultiCollectionProvider,
        interrupt_at: &str,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            inner,
            interrupt_at: interrupt_at.to_string(),
            cancel,
        }
    }
}

#[async_trait::async_trait]
impl Provider for InterruptingProvider {
    async fn fetch_range(
        &self,
        collection: &CollectionId,
        start_index: u64,
        batch_size: u64,
    ) -> Result<RangeFetch, ProviderError> {
        if collection.as_str() == self.interrupt_at {
            self.cancel.cancel();
            return Err(ProviderError::Network("connection reset".to_string()));
        }
        self.inner.fetch_range(collection, start_index, batch_size).await
    }
}

/// Never responds; for exercising the per-call timeout.
pub struct StallingProvider;

#[async_trait::async_trait]
impl Provider for StallingProvider {
    async fn fetch_range(
        &self,
        _collection: &CollectionId,
        _start_index: u64,
        _batch_size: u64,
    ) -> Result<RangeFetch, ProviderError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(RangeFetch::Exhausted)
    }
}
