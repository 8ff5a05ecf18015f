use tracing::debug;

use crate::client::{QueryError, ResourceQueryService};
use crate::page::{PageRequest, QueryPage};

/// Pulls the pages of one aggregate query strictly in sequence.
///
/// Each call to [`next_page`](Self::next_page) issues at most one request;
/// continuation tokens are followed until the service stops returning one.
pub struct QueryExecutor<'a, S: ResourceQueryService + ?Sized> {
    service: &'a S,
    request: PageRequest,
    pages_fetched: usize,
    exhausted: bool,
}

impl<'a, S: ResourceQueryService + ?Sized> QueryExecutor<'a, S> {
    pub fn new(service: &'a S, request: PageRequest) -> Self {
        Self {
            service,
            request,
            pages_fetched: 0,
            exhausted: false,
        }
    }

    /// Fetch the next page, or `None` once the stream is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<QueryPage>, QueryError> {
        if self.exhausted {
            return Ok(None);
        }

        let page = self.service.select_page(&self.request).await?;
        self.pages_fetched += 1;

        debug!(
            page = self.pages_fetched,
            results = page.len(),
            "Received query page"
        );

        match page.next_token.as_deref().filter(|t| !t.is_empty()) {
            Some(token) => self.request.next_token = Some(token.to_string()),
            None => self.exhausted = true,
        }

        Ok(Some(page))
    }

    /// Number of pages fetched so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }
}
