//! In-memory query service used by the pipeline tests.

use std::sync::Mutex;

use async_trait::async_trait;
use config_export::{PageRequest, QueryError, QueryPage, ResourceQueryService, SelectField};

/// Serves a fixed list of pages, chaining them with synthetic tokens.
pub struct InMemoryService {
    pages: Vec<QueryPage>,
    requests: Mutex<Vec<PageRequest>>,
    reject_query: bool,
}

impl InMemoryService {
    /// Build a service from `(results, select_fields)` per page.
    pub fn new(pages: Vec<(Vec<&str>, Vec<&str>)>) -> Self {
        let count = pages.len();
        let pages = pages
            .into_iter()
            .enumerate()
            .map(|(i, (results, fields))| QueryPage {
                results: results.into_iter().map(str::to_string).collect(),
                select_fields: fields.into_iter().map(SelectField::new).collect(),
                next_token: (i + 1 < count).then(|| format!("page-{}", i + 1)),
            })
            .collect();
        Self {
            pages,
            requests: Mutex::new(Vec::new()),
            reject_query: false,
        }
    }

    /// A service that rejects every query as invalid.
    pub fn rejecting() -> Self {
        Self {
            reject_query: true,
            ..Self::new(vec![])
        }
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResourceQueryService for InMemoryService {
    async fn select_page(&self, request: &PageRequest) -> Result<QueryPage, QueryError> {
        self.requests.lock().unwrap().push(request.clone());

        if self.reject_query {
            return Err(QueryError::InvalidQuery {
                query: request.expression.clone(),
            });
        }

        let index = match request.next_token.as_deref() {
            None => 0,
            Some(token) => token
                .strip_prefix("page-")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| QueryError::Service(format!("unknown token {token}")))?,
        };

        // An empty service still answers the first request with an empty page.
        Ok(self.pages.get(index).cloned().unwrap_or_default())
    }
}
