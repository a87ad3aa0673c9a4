use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Command-line arguments for the portfolio content tool.
#[derive(Debug, Parser)]
#[command(
    name = "portfolio-content",
    version,
    about = "Aggregate blog content and serve it as a JSON API"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "SITE_CONFIG_PATH", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Print the merged blog timeline as JSON.
    List,
    /// Print one entry with its previous/next slugs.
    Show(ShowArgs),
    /// Print the works list as JSON.
    Works,
    /// Print every slug that has a detail page.
    Slugs,
    /// Copy article images from the submodule into the public tree.
    #[command(name = "copy-images")]
    CopyImages,
    /// Serve the aggregated content over HTTP.
    Serve(ServeArgs),
}

#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    pub slug: String,
}

#[derive(Debug, Args, Clone)]
pub struct ServeArgs {
    /// Listen address.
    #[arg(long, env = "LISTEN_ADDR", default_value = "127.0.0.1:8080")]
    pub addr: SocketAddr,
}
