//! Command handlers. Each run builds its own fetcher, collects, and exports.

use std::path::PathBuf;

use revscrape_core::{AppConfig, CollectionResult, FilterCriteria, GoogleProvider};
use revscrape_export::{default_file_name, export_xlsx};
use revscrape_scraper::{collect, CollectOptions, GoogleFetcher, HttpConfig, TrustpilotFetcher};

use crate::{FilterArgs, OutputArgs};

const XLSX_EXTENSION: &str = ".xlsx";

impl FilterArgs {
    pub(crate) fn criteria(&self) -> anyhow::Result<FilterCriteria> {
        Ok(FilterCriteria::parse(&self.ratings, &self.keywords)?)
    }
}

pub(crate) async fn run_trustpilot(
    config: &AppConfig,
    company_url: &str,
    filter: &FilterArgs,
    output: &OutputArgs,
) -> anyhow::Result<()> {
    let criteria = filter.criteria()?;
    let mut fetcher = TrustpilotFetcher::new(company_url, &HttpConfig::from_app_config(config))?;

    tracing::info!(company_url, "collecting trustpilot reviews");
    let result = collect(
        &mut fetcher,
        &criteria,
        CollectOptions::from_app_config(config),
    )
    .await;
    drop(fetcher);

    report(config, &result, output)
}

pub(crate) async fn run_google(
    config: &AppConfig,
    provider: GoogleProvider,
    query: &str,
    location: Option<&str>,
    filter: &FilterArgs,
    output: &OutputArgs,
) -> anyhow::Result<()> {
    let criteria = filter.criteria()?;
    let fetcher = GoogleFetcher::from_app_config(config, provider, query, location)?;

    tracing::info!(%provider, query, "collecting google reviews");
    let result = fetcher
        .collect(&criteria, CollectOptions::from_app_config(config))
        .await;

    report(config, &result, output)
}

/// Prints the written path, or a notice when nothing matched.
fn report(
    config: &AppConfig,
    result: &CollectionResult,
    output: &OutputArgs,
) -> anyhow::Result<()> {
    if result.terminated_early() {
        eprintln!(
            "warning: collection stopped early ({:?}); results may be incomplete",
            result.termination()
        );
    }
    if result.skipped() > 0 {
        tracing::warn!(skipped = result.skipped(), "some reviews could not be read");
    }

    if result.is_empty() {
        println!("no matching reviews found");
        return Ok(());
    }

    let dir = output_dir(config, output);
    let file_name = output.file_name.as_deref().map_or_else(
        || default_file_name(result.platform()).to_owned(),
        with_xlsx_extension,
    );
    let path = export_xlsx(result, &dir, &file_name)?;
    println!("{}", path.display());
    Ok(())
}

fn output_dir(config: &AppConfig, output: &OutputArgs) -> PathBuf {
    output
        .output_dir
        .clone()
        .unwrap_or_else(|| config.export_dir.clone())
}

pub(crate) fn with_xlsx_extension(name: &str) -> String {
    let name = name.trim();
    if name.to_ascii_lowercase().ends_with(XLSX_EXTENSION) {
        name.to_owned()
    } else {
        format!("{name}{XLSX_EXTENSION}")
    }
}
