//! Portfolio content tool: binary entrypoint.
//! Prints aggregated content, copies article images, or serves the JSON API.

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use portfolio_content::config::cli::{CliArgs, Command};
use portfolio_content::content::assets::copy_article_images;
use portfolio_content::metrics::Metrics;
use portfolio_content::{create_router, SiteConfig, SiteContext};

const DEFAULT_FILTER: &str = "portfolio_content=info,content=info,cache=info,pwa=info,api=info,warn";

/// Logs go to stderr so JSON on stdout stays machine-readable.
/// `LOG_FORMAT=json` switches to structured output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let json = std::env::var("LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("serializing output")?;
    println!("{out}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let args = CliArgs::parse();
    let config = SiteConfig::load(args.config_file.as_deref())?;

    match args.command {
        Command::CopyImages => {
            let copied = copy_article_images(&config.content.submodule_dir, &config.content.assets_dir())?;
            tracing::info!(count = copied.len(), "article images copied");
            print_json(&copied)?;
        }
        Command::List => {
            let ctx = SiteContext::new(config)?;
            print_json(&ctx.aggregator().list_entries().await)?;
        }
        Command::Show(show) => {
            let ctx = SiteContext::new(config)?;
            let lookup = ctx.aggregator().find_by_slug(&show.slug).await;
            if !lookup.is_found() {
                anyhow::bail!("no entry with slug {:?}", show.slug);
            }
            print_json(&lookup)?;
        }
        Command::Works => {
            let ctx = SiteContext::new(config)?;
            print_json(&ctx.works().await?)?;
        }
        Command::Slugs => {
            let ctx = SiteContext::new(config)?;
            print_json(&ctx.aggregator().detail_slugs().await)?;
        }
        Command::Serve(serve) => {
            let metrics = Metrics::init()?;
            let ctx = SiteContext::new(config)?;
            let app = create_router(ctx).merge(metrics.router());

            let listener = tokio::net::TcpListener::bind(serve.addr)
                .await
                .with_context(|| format!("binding {}", serve.addr))?;
            tracing::info!(addr = %serve.addr, "serving");
            axum::serve(listener, app).await.context("server error")?;
        }
    }
    Ok(())
}
