use anyhow::Result;
use clap::Parser;
use invest_api::core::log::init_logging;

/// Investment client portfolio API server. All runtime knobs come from the
/// environment (YAHOO_*, CACHE_*, BIND_ADDR).
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = invest_api::run().await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "Server failed");
    }
    result
}
