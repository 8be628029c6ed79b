use anyhow::{Context, Result};
use clap::Parser;
use hostscore::config::{init_tracing, Settings};
use hostscore::models::DebugArtifacts;
use hostscore::{AssessOptions, Assessor};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Score an Airbnb listing's conversion readiness
#[derive(Parser, Debug)]
#[command(name = "hostscore", version, about)]
struct Cli {
    /// Listing URL, e.g. https://www.airbnb.com/rooms/12345
    url: String,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Concurrent browser sessions
    #[arg(long, value_name = "N")]
    max_concurrency: Option<usize>,

    /// Skip LLM refinement even when a key is configured
    #[arg(long)]
    no_llm: bool,

    /// Ask for an owner-facing overview
    #[arg(long)]
    overview: bool,

    /// Capture raw page artifacts
    #[arg(long)]
    debug: bool,

    /// Write the result JSON here instead of stdout
    #[arg(long, short, value_name = "PATH")]
    output: Option<PathBuf>,

    #[arg(long, value_name = "PATH")]
    dump_html: Option<PathBuf>,

    #[arg(long, value_name = "PATH")]
    dump_photo_modal: Option<PathBuf>,

    #[arg(long, value_name = "PATH")]
    dump_amenities_modal: Option<PathBuf>,

    #[arg(long, value_name = "PATH")]
    dump_state: Option<PathBuf>,
}

impl Cli {
    fn wants_artifacts(&self) -> bool {
        self.debug
            || self.dump_html.is_some()
            || self.dump_photo_modal.is_some()
            || self.dump_amenities_modal.is_some()
            || self.dump_state.is_some()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::from_env().context("Failed to load configuration")?;
    init_tracing(&settings.log_level);

    if cli.headed {
        settings.browser.headless = false;
    }
    if let Some(n) = cli.max_concurrency {
        settings.browser.max_concurrency = n;
    }
    if cli.no_llm {
        settings.llm = None;
    }

    info!(
        refinement = settings.llm.is_some(),
        overview = settings.overview.is_some(),
        embeddings = settings.embedding.is_some(),
        "hostscore starting"
    );

    let assessor = Assessor::from_settings(&settings)?;
    let options = AssessOptions {
        force: true,
        with_overview: cli.overview,
        capture_debug: cli.wants_artifacts(),
    };

    let assessment = assessor
        .assess(&cli.url, &options)
        .await
        .with_context(|| format!("Could not assess {}", cli.url))?;

    if let Some(debug) = assessment.listing.as_ref().and_then(|l| l.debug.as_ref()) {
        dump_artifacts(&cli, debug).await?;
    }

    let json = serde_json::to_string_pretty(&assessment.result)?;
    match &cli.output {
        Some(path) => {
            tokio::fs::write(path, json).await?;
            info!(path = %path.display(), "saved assessment");
        }
        None => println!("{json}"),
    }

    Ok(())
}

async fn dump_artifacts(cli: &Cli, artifacts: &DebugArtifacts) -> Result<()> {
    if cli.debug {
        info!(
            photo_modal = artifacts.has_photo_modal(),
            amenities_modal = artifacts.has_amenities_modal(),
            preloaded_state = artifacts.has_preloaded_state(),
            amenity_items = artifacts.amenities_items.len(),
            responses = artifacts.responses.len(),
            "capture summary"
        );
        for response in &artifacts.responses {
            info!(response = response.as_str(), "network");
        }
    }

    if let Some(path) = &cli.dump_html {
        write_dump(path, Some(artifacts.raw_html.as_str())).await?;
    }
    if let Some(path) = &cli.dump_photo_modal {
        write_dump(path, artifacts.photo_modal_html.as_deref()).await?;
    }
    if let Some(path) = &cli.dump_amenities_modal {
        write_dump(path, artifacts.amenities_modal_html.as_deref()).await?;
    }
    if let Some(path) = &cli.dump_state {
        let state = artifacts
            .preloaded_state
            .as_ref()
            .map(serde_json::to_string_pretty)
            .transpose()?;
        write_dump(path, state.as_deref()).await?;
    }
    Ok(())
}

async fn write_dump(path: &Path, contents: Option<&str>) -> Result<()> {
    match contents {
        Some(contents) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(path, contents)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), bytes = contents.len(), "wrote debug artifact");
        }
        None => warn!(path = %path.display(), "nothing captured, skipping dump"),
    }
    Ok(())
}
