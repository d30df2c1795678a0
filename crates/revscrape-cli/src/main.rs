mod run;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use revscrape_core::GoogleProvider;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "revscrape-cli")]
#[command(about = "Collect filtered Trustpilot and Google reviews into spreadsheets")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Collect reviews from a Trustpilot company page
    Trustpilot {
        /// Company page, e.g. <https://www.trustpilot.com/review/example.com>
        company_url: String,

        #[command(flatten)]
        filter: FilterArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Collect Google reviews for a business name or address
    Google {
        /// Business name or address to look up
        query: String,

        /// Extra location context, e.g. a city
        #[arg(long)]
        location: Option<String>,

        /// Override `REVSCRAPE_GOOGLE_PROVIDER` (serpapi, dataforseo, places)
        #[arg(long)]
        provider: Option<GoogleProvider>,

        #[command(flatten)]
        filter: FilterArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Debug, Clone, Default, Args)]
struct FilterArgs {
    /// Comma-separated star ratings to keep, e.g. "5,4"
    #[arg(long, default_value = "")]
    ratings: String,

    /// Comma-separated keywords; a review must mention at least one
    #[arg(long, default_value = "")]
    keywords: String,
}

#[derive(Debug, Clone, Default, Args)]
struct OutputArgs {
    /// Directory for the spreadsheet [default: REVSCRAPE_EXPORT_DIR]
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Preferred file name; a numbered suffix is added if it is taken
    #[arg(long)]
    file_name: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = revscrape_core::load_app_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Trustpilot {
            company_url,
            filter,
            output,
        } => run::run_trustpilot(&config, &company_url, &filter, &output).await,
        Commands::Google {
            query,
            location,
            provider,
            filter,
            output,
        } => {
            let provider = provider.unwrap_or(config.google_provider);
            run::run_google(
                &config,
                provider,
                &query,
                location.as_deref(),
                &filter,
                &output,
            )
            .await
        }
    }
}

#[cfg(test)]
mod tests;
