//! Argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use marginalia_core::HighlightColor;

#[derive(Debug, Parser)]
#[command(name = "marginalia")]
#[command(author, version, about = "Persistent text highlights for HTML pages")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Highlight the N-th occurrence of some text and store it
    Highlight(HighlightArgs),

    /// Render every stored highlight for a page
    Restore(RestoreArgs),

    /// Print stored highlights as JSON
    List(ListArgs),

    /// Remove one highlight from a page and from the store
    Remove(RemoveArgs),
}

#[derive(Debug, Args)]
pub struct HighlightArgs {
    /// HTML file standing in for the page
    #[arg(long)]
    pub html: PathBuf,

    /// Page URL the highlight belongs to
    #[arg(long)]
    pub url: String,

    /// Text to highlight, as rendered
    #[arg(long)]
    pub text: String,

    /// Which occurrence of the text to use (0-based)
    #[arg(long, default_value_t = 0)]
    pub occurrence: usize,

    /// Highlight color
    #[arg(long, default_value = "yellow")]
    pub color: HighlightColor,

    /// Optional note
    #[arg(long)]
    pub note: Option<String>,

    /// Directory holding the highlight store
    #[arg(long)]
    pub store: PathBuf,

    /// Write the highlighted HTML here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RestoreArgs {
    /// HTML file standing in for the page
    #[arg(long)]
    pub html: PathBuf,

    /// Page URL whose highlights are restored
    #[arg(long)]
    pub url: String,

    /// Directory holding the highlight store
    #[arg(long)]
    pub store: PathBuf,

    /// Write the highlighted HTML here
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Directory holding the highlight store
    #[arg(long)]
    pub store: PathBuf,

    /// Only list highlights for this page
    #[arg(long)]
    pub url: Option<String>,
}

#[derive(Debug, Args)]
pub struct RemoveArgs {
    /// HTML file standing in for the page
    #[arg(long)]
    pub html: PathBuf,

    /// Page URL the highlight belongs to
    #[arg(long)]
    pub url: String,

    /// Highlight id
    #[arg(long)]
    pub id: String,

    /// Directory holding the highlight store
    #[arg(long)]
    pub store: PathBuf,

    /// Write the resulting HTML here
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
