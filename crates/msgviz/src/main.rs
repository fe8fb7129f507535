mod bootstrap;

use anyhow::Result;
use msgviz_core::error::ArchiveError;
use msgviz_core::settings::{default_archive_dir, Settings};
use msgviz_core::time_utils::resolve_timezone;
use msgviz_data::analyzer::MonthBucketAnalyzer;
use msgviz_data::connector::{pull_all, Connector};
use msgviz_data::reader::JsonlConnector;

fn main() -> Result<()> {
    let settings = Settings::load();

    bootstrap::setup_logging(&settings.log_level)?;

    tracing::info!("msgviz v{} starting", env!("CARGO_PKG_VERSION"));

    let tz = resolve_timezone(&settings.timezone);
    tracing::info!("Cutting months in {}", tz);

    let default_dir = default_archive_dir();
    let paths = settings.input_paths(default_dir.as_deref());
    if paths.is_empty() {
        return Err(ArchiveError::Config(
            "no archive inputs given and no home directory to default to".to_string(),
        )
        .into());
    }

    let connectors: Vec<Box<dyn Connector>> = JsonlConnector::discover(&paths, tz)
        .into_iter()
        .map(|c| Box::new(c) as Box<dyn Connector>)
        .collect();
    if connectors.is_empty() {
        tracing::warn!("No archive files found");
    }

    let archive = pull_all(&connectors);

    match archive.age_in_months_in(&tz) {
        Ok(age) => tracing::info!(
            "{} messages with {} correspondents over {} months",
            archive.len(),
            archive.correspondents().len(),
            age
        ),
        Err(ArchiveError::EmptyArchive) => {
            tracing::info!("No messages loaded; writing an empty report")
        }
        Err(e) => return Err(e.into()),
    }

    let report = MonthBucketAnalyzer::new()
        .with_timezone(tz)
        .analyze(&archive)?;

    bootstrap::write_report(&report, settings.output.as_deref(), settings.pretty)?;

    Ok(())
}
