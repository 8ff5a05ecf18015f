//! AWS Config aggregate query client.
//!
//! Provides the [`ResourceQueryService`] seam used by the executor and its
//! production implementation [`AwsConfigService`], which calls
//! `SelectAggregateResourceConfig` one page at a time. Retries are delegated
//! to the SDK's standard retry mode.

use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::BehaviorVersion;
use aws_sdk_config::error::{DisplayErrorContext, SdkError};
use aws_sdk_config::operation::select_aggregate_resource_config::SelectAggregateResourceConfigError;
use tracing::{debug, info};

use crate::config::ExportConfig;
use crate::page::{PageRequest, QueryPage, SelectField};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Errors that can occur while querying the aggregator.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The service rejected the query expression as invalid.
    #[error("invalid Config SQL query: {query}")]
    InvalidQuery { query: String },

    /// Any other SDK or transport failure (stringified).
    #[error("AWS SDK error: {0}")]
    Service(String),
}

/// Map an SDK failure for `query` onto [`QueryError`].
///
/// Only `InvalidExpressionException` counts as an invalid query; everything
/// else, including other service errors, is a generic service failure.
fn classify_sdk_error(
    err: &SdkError<SelectAggregateResourceConfigError>,
    query: &str,
) -> QueryError {
    let invalid = err
        .as_service_error()
        .is_some_and(|se| se.is_invalid_expression_exception());
    if invalid {
        QueryError::InvalidQuery {
            query: query.to_string(),
        }
    } else {
        QueryError::Service(DisplayErrorContext(err).to_string())
    }
}

// ---------------------------------------------------------------------------
// Service seam
// ---------------------------------------------------------------------------

/// A paginated aggregate-query endpoint.
#[async_trait]
pub trait ResourceQueryService: Send + Sync {
    /// Fetch the page addressed by `request.next_token`.
    async fn select_page(&self, request: &PageRequest) -> Result<QueryPage, QueryError>;
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// [`ResourceQueryService`] backed by the AWS Config SDK client.
pub struct AwsConfigService {
    config_client: aws_sdk_config::Client,
}

impl AwsConfigService {
    /// Create a new [`AwsConfigService`] from the given configuration.
    ///
    /// Credentials come from the SDK's default provider chain. The region is
    /// taken from `config` when set.
    pub async fn new(config: &ExportConfig) -> Self {
        let retry = RetryConfig::standard().with_max_attempts(config.max_attempts.max(1));

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).retry_config(retry);
        if let Some(region) = &config.region {
            loader = loader.region(aws_sdk_config::config::Region::new(region.clone()));
        }
        let aws_cfg = loader.load().await;

        info!(
            region = ?aws_cfg.region(),
            aggregator = %config.aggregator,
            max_attempts = config.max_attempts,
            "AwsConfigService initialised"
        );

        Self {
            config_client: aws_sdk_config::Client::new(&aws_cfg),
        }
    }
}

#[async_trait]
impl ResourceQueryService for AwsConfigService {
    async fn select_page(&self, request: &PageRequest) -> Result<QueryPage, QueryError> {
        let mut call = self
            .config_client
            .select_aggregate_resource_config()
            .expression(&request.expression)
            .configuration_aggregator_name(&request.aggregator)
            .set_next_token(request.next_token.clone());
        if let Some(limit) = request.limit {
            call = call.limit(limit);
        }

        let output = call
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e, &request.expression))?;

        let select_fields: Vec<SelectField> = output
            .query_info()
            .map(|info| {
                info.select_fields()
                    .iter()
                    .filter_map(|f| f.name())
                    .map(SelectField::new)
                    .collect()
            })
            .unwrap_or_default();

        let page = QueryPage {
            results: output.results().to_vec(),
            select_fields,
            next_token: output.next_token().map(str::to_string),
        };

        debug!(
            results = page.len(),
            fields = page.select_fields.len(),
            last = page.is_last(),
            "Fetched aggregate query page"
        );

        Ok(page)
    }
}
