pub mod config;
pub mod page;
pub mod client;
pub mod executor;
pub mod flatten;
pub mod table;
pub mod pipeline;

pub use config::ExportConfig;
pub use page::{PageRequest, QueryPage, SelectField};
pub use client::{AwsConfigService, QueryError, ResourceQueryService};
pub use executor::QueryExecutor;
pub use flatten::{flatten_result, FlatRow, FlattenError, FlattenOptions, Flattened};
pub use table::{Table, TableError};
pub use pipeline::{collect_table, export, CollectedTable, ExportError, ExportOutcome, ExportRequest, ExportSummary};
