use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::IgnoredAny;
use tracing::debug;

use crate::api::{ApiError, Gateway, RequestDescriptor};
use crate::cache::{CachePolicy, Pages, QueryCache};
use crate::models::{Document, DocumentCreateRequest, DocumentList, DocumentUpdateRequest};

use super::document_keys;

const DOCUMENTS_PATH: &str = "/documents";

/// Page size for paginated listings when the caller has no preference.
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Query parameters for listing documents, e.g. `spaceId` or `tag`.
pub type DocumentFilters = BTreeMap<String, String>;

/// Reads go through the query cache; writes invalidate the keys they touch.
pub struct DocumentService {
    gateway: Arc<Gateway>,
    cache: Arc<QueryCache>,
    policy: CachePolicy,
}

impl DocumentService {
    pub fn new(gateway: Arc<Gateway>, cache: Arc<QueryCache>) -> Self {
        Self {
            gateway,
            cache,
            policy: CachePolicy::fresh(),
        }
    }

    /// Serve reads from cache while younger than `policy`.
    pub fn with_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub async fn list(&self, filters: &DocumentFilters) -> Result<DocumentList, ApiError> {
        let key = document_keys::list(filters);
        self.cache
            .fetch(&key, self.policy, || {
                self.gateway
                    .send(RequestDescriptor::get(DOCUMENTS_PATH).query_pairs(filters.clone()))
            })
            .await
    }

    /// Load the next page of documents matching `filters`.
    ///
    /// Pages are requested with `offset` and `limit` query parameters and
    /// accumulate until the loaded documents reach the reported total or the
    /// server returns an empty page. Any document mutation restarts the
    /// listing from the first page.
    pub async fn list_next_page(
        &self,
        filters: &DocumentFilters,
        page_size: u64,
    ) -> Result<Pages<DocumentList, u64>, ApiError> {
        let limit = page_size.max(1);
        self.cache
            .fetch_next_page(
                &document_keys::pages(filters),
                0,
                |offset| {
                    self.gateway.send(
                        RequestDescriptor::get(DOCUMENTS_PATH)
                            .query_pairs(filters.clone())
                            .query("offset", offset)
                            .query("limit", limit),
                    )
                },
                |page: &DocumentList, earlier| {
                    let loaded = earlier
                        .iter()
                        .chain(std::iter::once(page))
                        .map(|p| p.documents.len() as u64)
                        .sum::<u64>();
                    (!page.documents.is_empty() && loaded < page.total).then_some(loaded)
                },
            )
            .await
    }

    pub async fn get(&self, id: &str) -> Result<Document, ApiError> {
        let key = document_keys::detail(id);
        let path = Self::document_path(id);
        self.cache
            .fetch(&key, self.policy, || self.gateway.get(&path))
            .await
    }

    pub async fn create(&self, request: &DocumentCreateRequest) -> Result<Document, ApiError> {
        let created: Document = self.gateway.post(DOCUMENTS_PATH, request).await?;
        self.cache.invalidate(&document_keys::lists());
        debug!(id = %created.id, "Document created");
        Ok(created)
    }

    pub async fn update(
        &self,
        id: &str,
        request: &DocumentUpdateRequest,
    ) -> Result<Document, ApiError> {
        let updated: Document = self.gateway.patch(&Self::document_path(id), request).await?;
        self.cache.invalidate(&document_keys::detail(&updated.id));
        self.cache.invalidate(&document_keys::lists());
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        // Whatever the server echoes back about the deletion is discarded
        let _: IgnoredAny = self.gateway.delete(&Self::document_path(id)).await?;
        self.cache.invalidate(&document_keys::detail(id));
        self.cache.invalidate(&document_keys::lists());
        debug!(id, "Document deleted");
        Ok(())
    }

    fn document_path(id: &str) -> String {
        format!("{}/{}", DOCUMENTS_PATH, urlencoding::encode(id))
    }
}
