use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::DataUrl;

/// ローカルに保存するプロフィール写真のメタデータ
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PhotoMetadata {
    pub user_id: String,
    pub mime_type: String,
    pub file_size_bytes: u64,
    /// サーバー側の更新時刻。比較は等価判定のみ
    pub last_updated_at: String,
    pub cached_at: DateTime<Utc>,
}

/// ユーザーごとに 1 件だけ保持されるキャッシュエントリ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPhotoEntry {
    pub image_data_url: String,
    pub metadata: PhotoMetadata,
}

impl CachedPhotoEntry {
    pub fn from_remote(photo: &RemotePhoto, cached_at: DateTime<Utc>) -> Self {
        let image_data_url = DataUrl::from_base64(&photo.mime_type, &photo.base64_image);
        Self {
            image_data_url: image_data_url.to_string(),
            metadata: PhotoMetadata {
                user_id: photo.user_id.clone(),
                mime_type: photo.mime_type.clone(),
                file_size_bytes: photo.file_size,
                last_updated_at: photo.last_updated.clone(),
                cached_at,
            },
        }
    }

    /// `now - cached_at < ttl` の間だけ有効
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let ttl = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
        let age = now.signed_duration_since(self.metadata.cached_at);
        // 時計が巻き戻った場合も TTL 以内のずれなら有効とみなす
        age.abs() < ttl
    }
}

/// リモートサービスが返す写真本体
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemotePhoto {
    pub base64_image: String,
    pub mime_type: String,
    pub file_size: u64,
    pub last_updated: String,
    pub user_id: String,
}

/// 画像を含まない軽量なメタデータ
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemotePhotoMetadata {
    pub mime_type: String,
    pub file_size: u64,
    pub last_updated: String,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoFetch {
    Found(RemotePhoto),
    /// サーバーに写真が存在しない
    NotFound,
}

/// アップロード対象のファイル
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl PhotoUpload {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn to_data_url(&self) -> DataUrl {
        DataUrl::encode(&self.mime_type, &self.bytes)
    }
}

/// 呼び出し側から観測できる状態
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhotoState {
    pub photo: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
    pub metadata: Option<PhotoMetadata>,
}
