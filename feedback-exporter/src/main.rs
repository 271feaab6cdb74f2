//! Export every feedback item and reply of a product into a ZIP archive.
use std::fs;
use std::io::{self, Write};

use anyhow::Context;
use envconfig::Envconfig;
use feedback_common::signature::Secret;
use feedback_common::time::SystemTime;
use tracing::info;
use tracing_subscriber::EnvFilter;

use feedback_exporter::archive::write_archive;
use feedback_exporter::config::Config;
use feedback_exporter::fetcher::HttpPageFetcher;
use feedback_exporter::pipeline::Exporter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::init_from_env().context("Invalid configuration")?;

    let fetcher = HttpPageFetcher::new(config.request_timeout.0)?;
    let exporter = Exporter::new(fetcher, SystemTime {}, config.export_options());
    let secret = Secret::new(config.private_key.as_str());

    let result = exporter
        .export(config.product_id.as_str(), &secret, |fetched| {
            info!(fetched, "downloading feedback");
        })
        .await?;

    let file = fs::File::create(&config.output_path)
        .with_context(|| format!("failed to create {}", config.output_path))?;
    let mut writer = write_archive(&result, io::BufWriter::new(file))?;
    writer.flush()?;

    info!(
        path = %config.output_path,
        feedback = result.feedback.len(),
        replies = result.replies.len(),
        raw = result.raw_feedback.len(),
        "archive written"
    );

    Ok(())
}
