mod cli;

use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use config_export::{
    export, AwsConfigService, ExportConfig, ExportOutcome, ExportRequest, FlattenOptions,
};

use crate::cli::{read_query, CliArgs};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    config_export::config::load_dotenv();

    let args = CliArgs::parse();
    let config = args.apply(ExportConfig::from_env());
    debug!(?config, "Resolved configuration");

    // If the query wasn't given, ask for it interactively
    let query = match args.given_query() {
        Some(query) => query.to_string(),
        None => {
            println!("Enter/Paste your Config query. Ctrl-D when done\n");
            read_query(io::stdin().lock()).context("failed to read query from stdin")?
        }
    };
    if query.trim().is_empty() {
        println!("No query given.");
        return Ok(());
    }

    let options = FlattenOptions::from_tag_list(args.tags.as_deref());
    let request = ExportRequest::from_config(query, &config);

    println!("Running query...");
    let service = AwsConfigService::new(&config).await;

    match export(&service, &request, &options).await {
        Ok(ExportOutcome::Written(summary)) => {
            println!(
                "...query finished successfully. Results written to {}",
                summary.path.display()
            );
        }
        Ok(ExportOutcome::NoResults) => println!("No results found."),
        Err(e) => match e.invalid_query() {
            Some(query) => println!("Error: invalid Config SQL query: {query}"),
            None => return Err(e).context("export failed"),
        },
    }

    Ok(())
}
