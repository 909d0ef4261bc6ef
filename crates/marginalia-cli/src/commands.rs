//! Subcommand implementations. Each returns the text to print on stdout.

use std::path::Path;

use anyhow::{bail, Context};
use marginalia_coordinator::{CoordinatorConfig, HighlightCoordinator, RestoreReport};
use marginalia_core::ids::id_timestamp;
use marginalia_core::{is_highlight_id, Highlight};
use marginalia_dom::Document;
use marginalia_store::{FilesystemBackend, HighlightStore, StoreConfig};
use tracing::info;

use crate::cli::{Commands, HighlightArgs, ListArgs, RemoveArgs, RestoreArgs};

/// Run one subcommand.
pub async fn run(command: Commands) -> anyhow::Result<String> {
    match command {
        Commands::Highlight(args) => highlight(args).await,
        Commands::Restore(args) => restore(args).await,
        Commands::List(args) => list(args).await,
        Commands::Remove(args) => remove(args).await,
    }
}

fn open_store(dir: &Path) -> HighlightStore {
    HighlightStore::new(FilesystemBackend::new(dir), StoreConfig::from_env())
}

fn coordinator_config() -> anyhow::Result<CoordinatorConfig> {
    let config = CoordinatorConfig::from_env();
    config.validate()?;
    Ok(config)
}

async fn load_page(path: &Path) -> anyhow::Result<Document> {
    let html = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(Document::parse_html(&html))
}

/// Write the page to `output` and return `summary`. Without an output file
/// the page goes to stdout and the summary to stderr.
async fn emit(doc: &Document, output: Option<&Path>, summary: String) -> anyhow::Result<String> {
    match output {
        Some(path) => {
            tokio::fs::write(path, doc.to_html())
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Ok(summary)
        }
        None => {
            eprintln!("{}", summary);
            Ok(doc.to_html())
        }
    }
}

fn describe(report: &RestoreReport) -> String {
    let mut out = format!(
        "restored {}, orphaned {}, already rendered {}",
        report.restored, report.orphaned, report.already_rendered
    );
    for id in &report.orphaned_ids {
        out.push_str(&format!("\norphaned: {}", id));
    }
    if let Some(warning) = &report.warning {
        out.push_str(&format!("\nwarning: {}", warning));
    }
    out
}

async fn highlight(args: HighlightArgs) -> anyhow::Result<String> {
    let mut doc = load_page(&args.html).await?;
    let mut coordinator =
        HighlightCoordinator::new(&args.url, open_store(&args.store), coordinator_config()?);
    // existing highlights first, so the output page shows all of them
    coordinator.restore_all_for_url(&mut doc, &args.url).await;

    let Some(selection) = doc.select(&args.text, args.occurrence) else {
        bail!(
            "Text {:?} (occurrence {}) not found in {}",
            args.text,
            args.occurrence,
            args.html.display()
        );
    };
    let applied = coordinator
        .apply_highlight(&mut doc, &selection, args.color, args.note)
        .await?;

    let mut summary = format!(
        "{} ({} marker(s), {})",
        applied.highlight.id,
        applied.markers.len(),
        applied.method.as_str()
    );
    if let Some(warning) = &applied.warning {
        summary.push_str(&format!("\nwarning: {}", warning));
    }
    emit(&doc, args.output.as_deref(), summary).await
}

async fn restore(args: RestoreArgs) -> anyhow::Result<String> {
    let mut doc = load_page(&args.html).await?;
    let mut coordinator =
        HighlightCoordinator::new(&args.url, open_store(&args.store), coordinator_config()?);
    let report = coordinator.restore_all_for_url(&mut doc, &args.url).await;
    info!(
        subsystem = "cli",
        restored = report.restored,
        orphaned = report.orphaned,
        "Page restored"
    );
    emit(&doc, args.output.as_deref(), describe(&report)).await
}

async fn list(args: ListArgs) -> anyhow::Result<String> {
    let store = open_store(&args.store);
    let mut highlights = match &args.url {
        Some(url) => store.list(url).await?,
        None => store.list_all().await?,
    };
    sort_by_creation(&mut highlights);
    Ok(serde_json::to_string_pretty(&highlights)?)
}

/// Oldest first. Ids carry their creation time; fall back to `created_at`.
fn sort_by_creation(highlights: &mut [Highlight]) {
    highlights.sort_by_key(|h| id_timestamp(&h.id).unwrap_or(h.created_at));
}

async fn remove(args: RemoveArgs) -> anyhow::Result<String> {
    if !is_highlight_id(&args.id) {
        bail!("{:?} is not a highlight id", args.id);
    }
    let mut doc = load_page(&args.html).await?;
    let mut coordinator =
        HighlightCoordinator::new(&args.url, open_store(&args.store), coordinator_config()?);
    coordinator.restore_all_for_url(&mut doc, &args.url).await;

    let Some(marker) = coordinator.marker_for(&doc, &args.id) else {
        bail!("Highlight {} is not rendered on {}", args.id, args.url);
    };
    if !coordinator.remove_highlight(&mut doc, marker).await {
        bail!("Highlight {} could not be removed", args.id);
    }
    emit(&doc, args.output.as_deref(), format!("removed {}", args.id)).await
}
