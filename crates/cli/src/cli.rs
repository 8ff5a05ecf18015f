use std::io::{self, BufRead};
use std::path::PathBuf;

use clap::Parser;
use config_export::ExportConfig;

/// Export an AWS Config aggregate query to CSV, with tags as separate columns.
///
/// Nested SELECT fields such as `configuration.instanceType` get their own
/// column, and every resource tag becomes a column named after its key.
#[derive(Parser, Debug)]
#[command(name = "config-export", version, about)]
pub struct CliArgs {
    /// The Config query to run. Read from stdin until EOF when omitted.
    #[arg(long)]
    pub query: Option<String>,

    /// Name of the Config aggregator to run the query against
    /// (default: aws-controltower-GuardrailsComplianceAggregator)
    #[arg(long)]
    pub aggregator: Option<String>,

    /// Output CSV file (default: results.csv)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Comma-separated list of tag keys to keep as columns
    #[arg(long, env = "CONFIG_EXPORT_TAGS")]
    pub tags: Option<String>,

    /// AWS region override
    #[arg(long)]
    pub region: Option<String>,

    /// Max attempts for the standard retry mode
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Max results requested per page
    #[arg(long)]
    pub page_limit: Option<i32>,
}

impl CliArgs {
    /// The `--query` value, unless it is missing or blank.
    pub fn given_query(&self) -> Option<&str> {
        self.query.as_deref().filter(|q| !q.trim().is_empty())
    }

    /// Layer explicit flags over an env-derived config.
    pub fn apply(&self, mut config: ExportConfig) -> ExportConfig {
        if let Some(aggregator) = &self.aggregator {
            config.aggregator = aggregator.clone();
        }
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if let Some(region) = &self.region {
            config.region = Some(region.clone());
        }
        if let Some(attempts) = self.max_attempts {
            config.max_attempts = attempts.max(1);
        }
        if let Some(limit) = self.page_limit.filter(|l| *l > 0) {
            config.page_limit = Some(limit);
        }
        config
    }
}

/// Read a query from `reader` until EOF, joining lines with single spaces.
pub fn read_query<R: BufRead>(reader: R) -> io::Result<String> {
    let lines = reader.lines().collect::<io::Result<Vec<String>>>()?;
    Ok(lines.join(" "))
}
