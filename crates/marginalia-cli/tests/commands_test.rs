//! Subcommands against real files in a temporary directory.

use clap::Parser;
use marginalia_cli::{run, Cli};
use tempfile::TempDir;

const PAGE: &str = "<html><body><article><p>The keeper said the quick brown fox jumped.</p><p>It slept under the old oak.</p></article></body></html>";
const URL: &str = "https://example.com/notes";

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("marginalia").chain(args.iter().copied()))
        .expect("arguments should parse")
}

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::write(dir.path().join("page.html"), PAGE).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> String {
        self.dir.path().join(name).display().to_string()
    }

    async fn run(&self, args: &[&str]) -> anyhow::Result<String> {
        run(parse(args).command).await
    }
}

#[tokio::test]
async fn test_highlight_then_restore_and_list() {
    let ws = Workspace::new();
    let (html, store) = (ws.path("page.html"), ws.path("store"));
    let (out, restored) = (ws.path("out.html"), ws.path("restored.html"));

    let summary = ws
        .run(&[
            "highlight", "--html", &html, "--url", URL, "--text", "quick brown fox",
            "--color", "green", "--note", "sly", "--store", &store, "--output", &out,
        ])
        .await
        .unwrap();
    let id = summary.split_whitespace().next().unwrap().to_string();
    assert!(summary.contains("1 marker(s), direct"));
    let written = std::fs::read_to_string(&out).unwrap();
    assert!(written.contains(&format!("data-highlight-id=\"{}\"", id)));
    assert!(written.contains("marginalia-highlight--green"));

    let summary = ws
        .run(&["restore", "--html", &html, "--url", URL, "--store", &store, "--output", &restored])
        .await
        .unwrap();
    assert!(summary.starts_with("restored 1, orphaned 0"));
    assert!(std::fs::read_to_string(&restored).unwrap().contains(&id));

    let listed = ws.run(&["list", "--store", &store, "--url", URL]).await.unwrap();
    let records: serde_json::Value = serde_json::from_str(&listed).unwrap();
    assert_eq!(records.as_array().unwrap().len(), 1);
    assert_eq!(records[0]["id"], id.as_str());
    assert_eq!(records[0]["text"], "quick brown fox");
    assert_eq!(records[0]["note"], "sly");
}

#[tokio::test]
async fn test_remove_deletes_record_and_markers() {
    let ws = Workspace::new();
    let (html, store, out) = (ws.path("page.html"), ws.path("store"), ws.path("out.html"));

    let summary = ws
        .run(&[
            "highlight", "--html", &html, "--url", URL, "--text", "old oak", "--store", &store,
            "--output", &out,
        ])
        .await
        .unwrap();
    let id = summary.split_whitespace().next().unwrap().to_string();

    let removed = ws
        .run(&[
            "remove", "--html", &out, "--url", URL, "--id", &id, "--store", &store, "--output", &out,
        ])
        .await
        .unwrap();
    assert_eq!(removed, format!("removed {}", id));
    assert!(!std::fs::read_to_string(&out).unwrap().contains(&id));

    let listed = ws.run(&["list", "--store", &store]).await.unwrap();
    assert_eq!(listed.trim(), "[]");

    let again = ws
        .run(&["remove", "--html", &out, "--url", URL, "--id", &id, "--store", &store])
        .await;
    assert!(again.is_err());
}

#[tokio::test]
async fn test_missing_text_is_an_error() {
    let ws = Workspace::new();
    let err = ws
        .run(&[
            "highlight", "--html", &ws.path("page.html"), "--url", URL, "--text", "purple cow",
            "--store", &ws.path("store"),
        ])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[tokio::test]
async fn test_missing_page_is_an_error() {
    let ws = Workspace::new();
    let err = ws
        .run(&["restore", "--html", &ws.path("absent.html"), "--url", URL, "--store", &ws.path("store")])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Failed to read"));
}

#[tokio::test]
async fn test_remove_rejects_malformed_id() {
    let ws = Workspace::new();
    let err = ws
        .run(&[
            "remove", "--html", &ws.path("absent.html"), "--url", URL, "--id", "h1", "--store",
            &ws.path("store"),
        ])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("is not a highlight id"));
    assert!(!ws.dir.path().join("store").exists());
}
