#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};

use profile_photo_cache::infrastructure::storage::MemoryKeyValueStore;
use profile_photo_cache::{
    AppError, Clock, KeyValueStore, PhotoFetch, PhotoGateway, PhotoUpload, ProfilePhotoCache,
    RemotePhoto, RemotePhotoMetadata, UserId,
};

/// 手動で進める時計
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        let start = Utc
            .with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
            .single()
            .expect("valid start time");
        Arc::new(Self {
            now: Mutex::new(start),
        })
    }

    pub fn advance(&self, delta: TimeDelta) {
        *self.now.lock().unwrap() += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// 写真サービスのインメモリ実装。呼び出し回数を記録する
#[derive(Default)]
pub struct FakePhotoServer {
    photo: Mutex<Option<RemotePhoto>>,
    version: AtomicUsize,
    fetch_delay: Mutex<Duration>,
    fail_fetches: AtomicBool,
    fail_uploads: AtomicBool,
    fetches: AtomicUsize,
    metadata_fetches: AtomicUsize,
    uploads: AtomicUsize,
    deletes: AtomicUsize,
}

impl FakePhotoServer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_photo(user: &str, base64_image: &str, last_updated: &str) -> Arc<Self> {
        let server = Self::new();
        server.put_photo(user, base64_image, "image/png", last_updated);
        server
    }

    /// クライアントを経由せずにサーバー側の写真を差し替える
    pub fn put_photo(&self, user: &str, base64_image: &str, mime_type: &str, last_updated: &str) {
        *self.photo.lock().unwrap() = Some(RemotePhoto {
            base64_image: base64_image.to_string(),
            mime_type: mime_type.to_string(),
            file_size: (base64_image.len() * 3 / 4) as u64,
            last_updated: last_updated.to_string(),
            user_id: user.to_string(),
        });
    }

    pub fn drop_photo(&self) {
        *self.photo.lock().unwrap() = None;
    }

    pub fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock().unwrap() = delay;
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn metadata_fetches(&self) -> usize {
        self.metadata_fetches.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PhotoGateway for FakePhotoServer {
    async fn fetch_photo(&self, _user: &UserId) -> Result<PhotoFetch, AppError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        // 応答内容は遅延の前に確定させる（送信済みのレスポンスを模す）
        let snapshot = self.photo.lock().unwrap().clone();
        let delay = *self.fetch_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(AppError::Network("photo service unavailable".to_string()));
        }
        Ok(match snapshot {
            Some(photo) => PhotoFetch::Found(photo),
            None => PhotoFetch::NotFound,
        })
    }

    async fn fetch_photo_metadata(
        &self,
        _user: &UserId,
    ) -> Result<Option<RemotePhotoMetadata>, AppError> {
        self.metadata_fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(AppError::Network("photo service unavailable".to_string()));
        }
        let photo = self.photo.lock().unwrap().clone();
        Ok(photo.map(|photo| RemotePhotoMetadata {
            mime_type: photo.mime_type,
            file_size: photo.file_size,
            last_updated: photo.last_updated,
            user_id: photo.user_id,
        }))
    }

    async fn upload_photo(
        &self,
        user: &UserId,
        base64_image: &str,
        mime_type: &str,
    ) -> Result<RemotePhotoMetadata, AppError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(AppError::Network("upload rejected".to_string()));
        }
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        let last_updated = format!("upload-{version}");
        self.put_photo(user.as_str(), base64_image, mime_type, &last_updated);
        Ok(RemotePhotoMetadata {
            mime_type: mime_type.to_string(),
            file_size: (base64_image.len() * 3 / 4) as u64,
            last_updated,
            user_id: user.to_string(),
        })
    }

    async fn delete_photo(&self, _user: &UserId) -> Result<(), AppError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.drop_photo();
        Ok(())
    }
}

/// 書き込みだけを失敗させられるストア
#[derive(Clone, Default)]
pub struct FlakyStore {
    inner: MemoryKeyValueStore,
    fail_writes: Arc<AtomicBool>,
    fail_metadata_sets: Arc<AtomicBool>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// メタデータキーへの `set` だけを失敗させる
    pub fn fail_metadata_sets(&self, fail: bool) {
        self.fail_metadata_sets.store(fail, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &MemoryKeyValueStore {
        &self.inner
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Storage("quota exceeded".to_string()));
        }
        if self.fail_metadata_sets.load(Ordering::SeqCst)
            && key.starts_with("profile_photo_metadata_")
        {
            return Err(AppError::Storage("quota exceeded".to_string()));
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), AppError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Storage("storage is read-only".to_string()));
        }
        self.inner.remove(key).await
    }
}

pub fn user(id: &str) -> UserId {
    UserId::new(id).expect("valid user id")
}

pub fn cache_for(
    id: &str,
    server: &Arc<FakePhotoServer>,
    store: Arc<dyn KeyValueStore>,
    clock: &Arc<ManualClock>,
) -> ProfilePhotoCache {
    ProfilePhotoCache::new(user(id), server.clone(), store).with_clock(clock.clone())
}

pub fn png(bytes: &[u8]) -> PhotoUpload {
    PhotoUpload {
        file_name: "avatar.png".to_string(),
        mime_type: "image/png".to_string(),
        bytes: bytes.to_vec(),
    }
}
