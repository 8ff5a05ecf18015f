/// One requested output column as echoed back in page metadata.
///
/// Names may be dotted paths into nested configuration, e.g.
/// `configuration.instanceType`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectField {
    pub name: String,
}

impl SelectField {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Returns `true` if the name addresses a nested attribute.
    pub fn is_dotted(&self) -> bool {
        self.name.contains('.')
    }

    /// The top-level key a dotted path starts from.
    pub fn top_level(&self) -> &str {
        self.name.split('.').next().unwrap_or(&self.name)
    }
}

/// Parameters for fetching one page of an aggregate query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Query expression in the service's SQL dialect.
    pub expression: String,
    /// Configuration aggregator the query runs against.
    pub aggregator: String,
    /// Continuation token from the previous page, `None` for the first page.
    pub next_token: Option<String>,
    /// Maximum results per page (`None` = service default).
    pub limit: Option<i32>,
}

impl PageRequest {
    pub fn new(expression: impl Into<String>, aggregator: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            aggregator: aggregator.into(),
            next_token: None,
            limit: None,
        }
    }
}

/// One page of results from an aggregate query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPage {
    /// JSON-encoded objects, one per matched resource.
    pub results: Vec<String>,
    /// Output columns of the SELECT clause, in query order.
    pub select_fields: Vec<SelectField>,
    /// Token for the next page; `None` on the last page.
    pub next_token: Option<String>,
}

impl QueryPage {
    /// Returns the number of results on this page.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns `true` if the page carries no results.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Returns `true` if no further pages follow.
    pub fn is_last(&self) -> bool {
        self.next_token.as_deref().map_or(true, str::is_empty)
    }
}
