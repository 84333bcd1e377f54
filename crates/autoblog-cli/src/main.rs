use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use autoblog_config::Config;
use autoblog_engine::{Article, HighlightController, HighlightStore, slugify};
use autoblog_store_client::HttpHighlightStore;
use clap::{Parser, Subcommand};

/// Render autoblog posts together with their reader highlights.
#[derive(Parser, Debug)]
#[command(name = "autoblog", version, about)]
struct Cli {
    /// Interactions service base URL; overrides `api_base_url` from the config file.
    #[arg(long, global = true)]
    api: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a markdown post to HTML with its stored highlights applied.
    Render {
        file: PathBuf,
        /// Post slug; defaults to the slugified file name.
        #[arg(long)]
        slug: Option<String>,
    },
    /// Print the highlights stored for a post as JSON.
    Highlights { slug: String },
    /// Write a config file with default settings.
    Init {
        /// Replace an existing config file.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Render { file, slug } => {
            let slug = match slug {
                Some(slug) => slug,
                None => default_slug(&file)?,
            };
            let html = render_post(&file, &slug, connect(cli.api)?).await?;
            println!("{html}");
        }
        Command::Highlights { slug } => {
            let highlights = connect(cli.api)?.list_highlights(&slug).await?;
            println!("{}", serde_json::to_string_pretty(&highlights)?);
        }
        Command::Init { force } => {
            let config_path = Config::config_path();
            init_config(&config_path, cli.api, force)?;
            println!("Wrote {}", config_path.display());
        }
    }

    Ok(())
}

/// Store client from the config file, with `api` taking precedence.
fn connect(api: Option<String>) -> Result<HttpHighlightStore> {
    let mut config = Config::load_or_default()?;
    if let Some(api) = api {
        config.api_base_url = api;
    }
    Ok(HttpHighlightStore::from_config(&config)?)
}

/// Save a default config to `config_path`, optionally pointing at `api`.
fn init_config(config_path: &Path, api: Option<String>, force: bool) -> Result<Config> {
    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists; pass --force to replace it",
            config_path.display()
        );
    }

    let mut config = Config::default();
    if let Some(api) = api {
        config.api_base_url = api;
    }
    config.save_to_path(config_path)?;
    log::info!("Saved config to {}", config_path.display());
    Ok(config)
}

fn default_slug(file: &Path) -> Result<String> {
    let stem = file
        .file_stem()
        .with_context(|| format!("No file name in {}", file.display()))?;
    Ok(slugify(&stem.to_string_lossy()))
}

/// Render `file` and replay the highlights stored for `slug` onto it.
async fn render_post<S: HighlightStore>(file: &Path, slug: &str, store: S) -> Result<String> {
    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let article = Article::from_bytes(&bytes)
        .with_context(|| format!("{} is not valid UTF-8", file.display()))?;

    let mut controller = HighlightController::new(slug, article, store);
    let report = controller.load().await;
    for (id, reason) in &report.skipped {
        log::warn!("Skipped highlight {id}: {reason}");
    }

    Ok(controller.article().to_html())
}
