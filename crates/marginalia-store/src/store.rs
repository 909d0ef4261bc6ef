//! Highlight persistence façade.
//!
//! Records live as one JSON array under a single backend key. Records that
//! fail to parse are skipped when reading but kept verbatim when the array
//! is rewritten, so a bad record never causes data loss for the others.

use std::future::Future;

use marginalia_core::{page_key, Error, Highlight, HighlightPatch, Result};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::backend::StorageBackend;
use crate::config::StoreConfig;

pub struct HighlightStore {
    backend: Box<dyn StorageBackend>,
    config: StoreConfig,
    // serializes read-modify-write cycles issued through this store
    write_lock: Mutex<()>,
}

impl HighlightStore {
    pub fn new(backend: impl StorageBackend + 'static, config: StoreConfig) -> Self {
        Self {
            backend: Box::new(backend),
            config,
            write_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Highlights for one page.
    #[instrument(skip(self), fields(subsystem = "store", component = "highlight_store", op = "list"))]
    pub async fn list(&self, url: &str) -> Result<Vec<Highlight>> {
        let key = page_key(url);
        let all = self.list_all().await?;
        Ok(all.into_iter().filter(|h| h.url == key).collect())
    }

    /// Every stored highlight, skipping malformed records.
    pub async fn list_all(&self) -> Result<Vec<Highlight>> {
        let raw = self.read_raw().await?;
        Ok(parse_records(raw))
    }

    /// Insert `highlight`, replacing any record with the same id.
    #[instrument(skip(self, highlight), fields(
        subsystem = "store",
        component = "highlight_store",
        op = "save",
        highlight_id = %highlight.id,
    ))]
    pub async fn save(&self, highlight: &Highlight) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut raw = self.read_raw().await?;
        let value = serde_json::to_value(highlight)?;
        match raw.iter().position(|r| record_id(r) == Some(highlight.id.as_str())) {
            Some(i) => raw[i] = value,
            None => raw.push(value),
        }
        self.write_raw(&raw).await?;
        info!(record_count = raw.len(), "Highlight saved");
        Ok(())
    }

    /// Apply `patch` to the record `id`, returning the updated highlight.
    #[instrument(skip(self, patch), fields(subsystem = "store", component = "highlight_store", op = "update"))]
    pub async fn update(&self, id: &str, patch: &HighlightPatch) -> Result<Highlight> {
        let _guard = self.write_lock.lock().await;
        let mut raw = self.read_raw().await?;
        let index = raw
            .iter()
            .position(|r| record_id(r) == Some(id))
            .ok_or_else(|| Error::NotFound(format!("highlight {}", id)))?;
        let mut highlight: Highlight = serde_json::from_value(raw[index].clone())?;
        highlight.apply_patch(patch);
        raw[index] = serde_json::to_value(&highlight)?;
        self.write_raw(&raw).await?;
        info!("Highlight updated");
        Ok(highlight)
    }

    /// Remove the record `id`. Returns false when there was none.
    #[instrument(skip(self), fields(subsystem = "store", component = "highlight_store", op = "delete"))]
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut raw = self.read_raw().await?;
        let before = raw.len();
        raw.retain(|r| record_id(r) != Some(id));
        if raw.len() == before {
            debug!("No record to delete");
            return Ok(false);
        }
        self.write_raw(&raw).await?;
        info!(record_count = raw.len(), "Highlight deleted");
        Ok(true)
    }

    async fn read_raw(&self) -> Result<Vec<Value>> {
        let key = self.config.key.as_str();
        let bytes = self.retrying("get", || self.backend.get(key)).await?;
        let Some(bytes) = bytes else {
            return Ok(Vec::new());
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        match serde_json::from_slice::<Value>(&bytes)? {
            Value::Array(items) => Ok(items),
            other => Err(Error::Serialization(format!(
                "expected an array under {}, found {}",
                key,
                json_kind(&other)
            ))),
        }
    }

    async fn write_raw(&self, raw: &[Value]) -> Result<()> {
        let key = self.config.key.as_str();
        let bytes = serde_json::to_vec(raw)?;
        self.retrying("set", || self.backend.set(key, &bytes)).await
    }

    /// Run a backend call, retrying up to the configured count.
    async fn retrying<T, F, Fut>(&self, op: &str, call: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.config.attempts();
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts => {
                    warn!(
                        subsystem = "store",
                        op,
                        attempt,
                        error = %e,
                        "Backend call failed, retrying"
                    );
                    attempt += 1;
                }
                Err(e) => {
                    return Err(Error::Storage(format!(
                        "{} failed after {} attempt(s): {}",
                        op, attempts, e
                    )))
                }
            }
        }
    }
}

fn record_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn parse_records(raw: Vec<Value>) -> Vec<Highlight> {
    raw.into_iter()
        .enumerate()
        .filter_map(|(i, value)| match serde_json::from_value::<Highlight>(value) {
            Ok(h) if h.anchor.validate().is_ok() => Some(h),
            Ok(h) => {
                warn!(index = i, highlight_id = %h.id, "Skipping record with invalid anchor");
                None
            }
            Err(e) => {
                warn!(index = i, error = %e, "Skipping malformed highlight record");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use marginalia_core::{AnchorDescriptor, HighlightColor};

    fn highlight(url: &str, text: &str) -> Highlight {
        Highlight::new(
            url,
            HighlightColor::Yellow,
            None,
            AnchorDescriptor {
                exact_text: text.to_string(),
                text_before: String::new(),
                text_after: String::new(),
                start: Some(0),
                end: Some(text.chars().count()),
                structural_path: Vec::new(),
                node_index: None,
            },
        )
    }

    fn store() -> HighlightStore {
        HighlightStore::new(MemoryBackend::new(), StoreConfig::default())
    }

    #[tokio::test]
    async fn test_empty_store_lists_nothing() {
        let store = store();
        assert!(store.list_all().await.unwrap().is_empty());
        assert!(!store.delete("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_save_is_upsert() {
        let store = store();
        let mut h = highlight("https://example.com/a", "alpha");
        store.save(&h).await.unwrap();
        h.note = Some("edited".to_string());
        store.save(&h).await.unwrap();
        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].note.as_deref(), Some("edited"));
    }

    #[tokio::test]
    async fn test_list_filters_by_page_key() {
        let store = store();
        store.save(&highlight("https://example.com/a", "one")).await.unwrap();
        store.save(&highlight("https://example.com/a#section", "two")).await.unwrap();
        store.save(&highlight("https://example.com/b", "three")).await.unwrap();
        assert_eq!(store.list("https://example.com/a").await.unwrap().len(), 2);
        assert_eq!(store.list("https://example.com/b#x").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = store();
        let err = store
            .update("nope", &HighlightPatch::color(HighlightColor::Blue))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_json_kind() {
        assert_eq!(json_kind(&Value::Null), "null");
        assert_eq!(json_kind(&serde_json::json!({})), "an object");
    }
}
