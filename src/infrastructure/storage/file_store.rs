use std::{collections::BTreeMap, path::PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::{fs, sync::Mutex};
use tracing::debug;

use crate::application::ports::KeyValueStore;
use crate::shared::error::AppError;

const STORE_FILE: &str = "store.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreDocument {
    entries: BTreeMap<String, String>,
}

/// 1 つの JSON ドキュメントに全エントリを保存するストア
///
/// 変更のたびにドキュメント全体を一時ファイルへ書き出し、リネームで置き換える。
pub struct FileKeyValueStore {
    doc_path: PathBuf,
    document: Mutex<StoreDocument>,
}

impl FileKeyValueStore {
    pub async fn new(root_dir: PathBuf) -> Result<Self, AppError> {
        fs::create_dir_all(&root_dir).await.map_err(|err| {
            AppError::Storage(format!("Failed to create cache storage dir: {err}"))
        })?;

        let doc_path = root_dir.join(STORE_FILE);
        let document = if fs::metadata(&doc_path).await.is_ok() {
            let bytes = fs::read(&doc_path)
                .await
                .map_err(|err| AppError::Storage(format!("Failed to read cache store: {err}")))?;
            if bytes.is_empty() {
                StoreDocument::default()
            } else {
                serde_json::from_slice(&bytes).map_err(|err| {
                    AppError::DeserializationError(format!("Failed to parse cache store: {err}"))
                })?
            }
        } else {
            StoreDocument::default()
        };

        debug!(
            path = %doc_path.display(),
            entries = document.entries.len(),
            "Opened photo cache store"
        );

        Ok(Self {
            doc_path,
            document: Mutex::new(document),
        })
    }

    pub async fn keys(&self) -> Vec<String> {
        let document = self.document.lock().await;
        document.entries.keys().cloned().collect()
    }

    async fn persist(&self, document: &StoreDocument) -> Result<(), AppError> {
        let json = serde_json::to_vec_pretty(document).map_err(|err| {
            AppError::SerializationError(format!("Failed to serialize cache store: {err}"))
        })?;
        let tmp_path = self.doc_path.with_extension("json.tmp");
        fs::write(&tmp_path, json)
            .await
            .map_err(|err| AppError::Storage(format!("Failed to write cache store: {err}")))?;
        fs::rename(&tmp_path, &self.doc_path)
            .await
            .map_err(|err| AppError::Storage(format!("Failed to persist cache store: {err}")))
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let document = self.document.lock().await;
        Ok(document.entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let mut document = self.document.lock().await;
        let previous = document.entries.insert(key.to_string(), value.to_string());
        if let Err(err) = self.persist(&document).await {
            // ディスクと食い違わないようメモリ上の変更を戻す
            match previous {
                Some(previous) => document.entries.insert(key.to_string(), previous),
                None => document.entries.remove(key),
            };
            return Err(err);
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), AppError> {
        let mut document = self.document.lock().await;
        let Some(previous) = document.entries.remove(key) else {
            return Ok(());
        };
        if let Err(err) = self.persist(&document).await {
            document.entries.insert(key.to_string(), previous);
            return Err(err);
        }
        Ok(())
    }
}
