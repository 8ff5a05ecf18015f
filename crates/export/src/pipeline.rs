use std::path::PathBuf;

use tracing::{debug, info};

use crate::client::{QueryError, ResourceQueryService};
use crate::config::ExportConfig;
use crate::executor::QueryExecutor;
use crate::flatten::{flatten_result, FlattenError, FlattenOptions};
use crate::page::PageRequest;
use crate::table::{Table, TableError};

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Everything one export run needs besides the service itself.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    /// Query expression to run.
    pub query: String,
    /// Aggregator the query runs against.
    pub aggregator: String,
    /// Per-page result limit (`None` = service default).
    pub page_limit: Option<i32>,
    /// Destination CSV path.
    pub output: PathBuf,
}

impl ExportRequest {
    pub fn from_config(query: impl Into<String>, config: &ExportConfig) -> Self {
        Self {
            query: query.into(),
            aggregator: config.aggregator.clone(),
            page_limit: config.page_limit,
            output: config.output.clone(),
        }
    }

    fn page_request(&self) -> PageRequest {
        PageRequest {
            limit: self.page_limit,
            ..PageRequest::new(&self.query, &self.aggregator)
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome / errors
// ---------------------------------------------------------------------------

/// Statistics of a completed export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub rows: u64,
    pub columns: usize,
    pub pages: usize,
    /// Tag keys that collided with requested columns, one entry per occurrence.
    pub collisions: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// The query matched nothing; no file was written.
    NoResults,
    Written(ExportSummary),
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("result {index} on page {page} is malformed: {source}")]
    MalformedResult {
        page: usize,
        index: usize,
        #[source]
        source: FlattenError,
    },

    #[error(transparent)]
    Table(#[from] TableError),
}

impl ExportError {
    /// The rejected expression, if the service refused the query.
    pub fn invalid_query(&self) -> Option<&str> {
        match self {
            ExportError::Query(QueryError::InvalidQuery { query }) => Some(query),
            _ => None,
        }
    }
}

/// A fully assembled table plus what it took to build it.
#[derive(Debug, Clone)]
pub struct CollectedTable {
    pub table: Table,
    pub pages: usize,
    pub collisions: usize,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run the query to exhaustion and flatten every result into a [`Table`].
///
/// Fails fast: the first malformed result aborts the whole run.
pub async fn collect_table<S: ResourceQueryService + ?Sized>(
    service: &S,
    request: &ExportRequest,
    options: &FlattenOptions,
) -> Result<CollectedTable, ExportError> {
    let mut executor = QueryExecutor::new(service, request.page_request());
    let mut table = Table::new();
    let mut collisions = 0;

    while let Some(page) = executor.next_page().await? {
        let page_no = executor.pages_fetched();
        for (index, raw) in page.results.iter().enumerate() {
            let flattened = flatten_result(raw, &page.select_fields, options).map_err(|source| {
                ExportError::MalformedResult {
                    page: page_no,
                    index,
                    source,
                }
            })?;
            collisions += flattened.collisions.len();
            table.push(flattened.row);
        }
        debug!(page = page_no, rows = table.row_count(), "Flattened page");
    }

    Ok(CollectedTable {
        table,
        pages: executor.pages_fetched(),
        collisions,
    })
}

/// Run the query and write the flattened results to `request.output`.
///
/// Nothing is written when the query matches no resources or when any step
/// fails.
pub async fn export<S: ResourceQueryService + ?Sized>(
    service: &S,
    request: &ExportRequest,
    options: &FlattenOptions,
) -> Result<ExportOutcome, ExportError> {
    let collected = collect_table(service, request, options).await?;

    if collected.table.is_empty() {
        info!(pages = collected.pages, "Query returned no results");
        return Ok(ExportOutcome::NoResults);
    }

    let rows = collected.table.write_to_path(&request.output)?;

    info!(
        path = %request.output.display(),
        rows,
        columns = collected.table.column_count(),
        pages = collected.pages,
        collisions = collected.collisions,
        "Export complete"
    );

    Ok(ExportOutcome::Written(ExportSummary {
        path: request.output.clone(),
        rows,
        columns: collected.table.column_count(),
        pages: collected.pages,
        collisions: collected.collisions,
    }))
}
