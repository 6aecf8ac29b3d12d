use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use futures::future::FutureExt;
use tracing::{debug, info, warn};

use crate::application::ports::{Clock, ImageValidator, KeyValueStore, PhotoGateway, SystemClock};
use crate::application::services::image_validator::DefaultImageValidator;
use crate::application::services::in_flight::{InFlightLoads, RefreshOutcome};
use crate::domain::entities::{
    CachedPhotoEntry, PhotoFetch, PhotoMetadata, PhotoState, PhotoUpload, RemotePhotoMetadata,
};
use crate::domain::value_objects::{DataUrl, UserId};
use crate::shared::config::DEFAULT_TTL_SECS;
use crate::shared::error::AppError;

const PHOTO_KEY_PREFIX: &str = "profile_photo_";
const METADATA_KEY_PREFIX: &str = "profile_photo_metadata_";

pub fn photo_key(user: &UserId) -> String {
    format!("{PHOTO_KEY_PREFIX}{user}")
}

pub fn metadata_key(user: &UserId) -> String {
    format!("{METADATA_KEY_PREFIX}{user}")
}

/// リフレッシュ用フューチャーが所有する依存関係
#[derive(Clone)]
struct RefreshContext {
    user: UserId,
    gateway: Arc<dyn PhotoGateway>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    in_flight: InFlightLoads,
}

/// ユーザーごとのプロフィール写真キャッシュ
///
/// 読み込みはリードスルー、書き込み（アップロード・削除）はローカルエントリを無効化する。
/// ローカルエントリは `cached_at` から TTL の間だけ信頼され、それ以降は再取得される。
pub struct ProfilePhotoCache {
    user: UserId,
    gateway: Arc<dyn PhotoGateway>,
    store: Arc<dyn KeyValueStore>,
    validator: Arc<dyn ImageValidator>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    in_flight: InFlightLoads,
    state: RwLock<PhotoState>,
    busy: AtomicUsize,
    /// アップロード・削除・クリアのたびに増える世代番号
    generation: AtomicU64,
}

impl ProfilePhotoCache {
    pub fn new(
        user: UserId,
        gateway: Arc<dyn PhotoGateway>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            user,
            gateway,
            store,
            validator: Arc::new(DefaultImageValidator::default()),
            clock: Arc::new(SystemClock),
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            in_flight: InFlightLoads::new(),
            state: RwLock::new(PhotoState::default()),
            busy: AtomicUsize::new(0),
            generation: AtomicU64::new(0),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn ImageValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// 同じレジストリを共有するキャッシュ間で重複取得をまとめる
    pub fn with_in_flight(mut self, in_flight: InFlightLoads) -> Self {
        self.in_flight = in_flight;
        self
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn state(&self) -> PhotoState {
        let mut snapshot = self.read_state().clone();
        snapshot.loading = self.is_loading();
        snapshot
    }

    pub fn is_loading(&self) -> bool {
        self.busy.load(Ordering::SeqCst) > 0
    }

    /// キャッシュから写真を読み込む。必要な場合のみリモートから取得する
    ///
    /// 写真が存在しない場合は `Ok(None)` を返し、エラー状態にはしない。
    pub async fn load(&self, force_refresh: bool) -> Result<Option<CachedPhotoEntry>, AppError> {
        let _busy = self.begin();
        match self.load_inner(force_refresh).await {
            Ok(entry) => Ok(entry),
            Err(err) => {
                self.record_error(&err);
                Err(err)
            }
        }
    }

    pub async fn upload(&self, upload: PhotoUpload) -> Result<RemotePhotoMetadata, AppError> {
        if let Err(err) = self.validator.validate(&upload) {
            warn!(user = %self.user, file = %upload.file_name, error = %err, "Rejected profile photo upload");
            self.record_error(&err);
            return Err(err);
        }

        let _busy = self.begin();
        let data_url = upload.to_data_url();
        info!(
            user = %self.user,
            file = %upload.file_name,
            mime_type = %data_url.mime_type(),
            size = upload.size(),
            "Uploading profile photo"
        );

        let confirmed = match self
            .gateway
            .upload_photo(&self.user, data_url.payload(), data_url.mime_type())
            .await
        {
            Ok(metadata) => metadata,
            Err(err) => {
                self.record_error(&err);
                return Err(err);
            }
        };

        self.in_flight.invalidate(&self.user).await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Err(err) = self.discard_entry().await {
            warn!(user = %self.user, error = %err, "Failed to invalidate cached photo after upload");
        }
        self.reset_state();

        if let Err(err) = self.load_inner(true).await {
            warn!(user = %self.user, error = %err, "Failed to reload profile photo after upload");
            self.record_error(&err);
        }

        Ok(confirmed)
    }

    pub async fn remove(&self) -> Result<(), AppError> {
        let _busy = self.begin();
        if let Err(err) = self.gateway.delete_photo(&self.user).await {
            self.record_error(&err);
            return Err(err);
        }

        if let Err(err) = self.clear_local().await {
            self.record_error(&err);
            return Err(err);
        }

        info!(user = %self.user, "Removed profile photo");
        Ok(())
    }

    /// サーバーのメタデータと比較し、差分があれば再取得する
    ///
    /// 失敗はログに残すだけで呼び出し側には返さない。
    pub async fn reconcile(&self) {
        if let Err(err) = self.try_reconcile().await {
            warn!(user = %self.user, error = %err, "Profile photo reconciliation failed");
        }
    }

    /// ローカルエントリと状態を破棄する
    pub async fn clear(&self) -> Result<(), AppError> {
        self.clear_local().await
    }

    /// ネットワークを使わずにローカルエントリを参照する（TTL は考慮しない）
    pub async fn cached_entry(&self) -> Result<Option<CachedPhotoEntry>, AppError> {
        self.read_entry().await
    }

    async fn load_inner(
        &self,
        force_refresh: bool,
    ) -> Result<Option<CachedPhotoEntry>, AppError> {
        let generation = self.generation.load(Ordering::SeqCst);
        if !force_refresh {
            match self.read_entry().await {
                Ok(Some(entry)) if entry.is_fresh(self.clock.now(), self.ttl) => {
                    debug!(user = %self.user, "Profile photo cache hit");
                    self.apply_entry(&entry);
                    return Ok(Some(entry));
                }
                Ok(Some(entry)) => {
                    debug!(
                        user = %self.user,
                        cached_at = %entry.metadata.cached_at,
                        "Profile photo cache entry expired"
                    );
                }
                Ok(None) => debug!(user = %self.user, "Profile photo cache miss"),
                Err(err) => {
                    warn!(user = %self.user, error = %err, "Failed to read cached profile photo");
                }
            }
        }

        let refreshed = self.refresh().await?;
        if self.generation.load(Ordering::SeqCst) != generation {
            // 取得中に書き込みがあった。新しい状態を上書きしない
            debug!(user = %self.user, "Profile photo changed during refresh, keeping newer state");
            return Ok(refreshed);
        }

        match refreshed {
            Some(entry) => {
                self.apply_entry(&entry);
                Ok(Some(entry))
            }
            None => {
                debug!(user = %self.user, "No profile photo on server");
                self.reset_state();
                Ok(None)
            }
        }
    }

    async fn try_reconcile(&self) -> Result<(), AppError> {
        let remote = self.gateway.fetch_photo_metadata(&self.user).await?;
        let local = self.read_entry().await?;

        match (remote, local) {
            (Some(remote), Some(local))
                if remote.last_updated == local.metadata.last_updated_at =>
            {
                debug!(user = %self.user, "Profile photo is up to date");
            }
            (Some(remote), local) => {
                debug!(
                    user = %self.user,
                    remote = %remote.last_updated,
                    local = ?local.map(|entry| entry.metadata.last_updated_at),
                    "Profile photo changed on server, refreshing"
                );
                self.load_inner(true).await?;
            }
            (None, Some(_)) => {
                debug!(user = %self.user, "Profile photo removed on server, clearing cache");
                self.clear_local().await?;
            }
            (None, None) => {}
        }
        Ok(())
    }

    async fn refresh(&self) -> RefreshOutcome {
        let ctx = RefreshContext {
            user: self.user.clone(),
            gateway: Arc::clone(&self.gateway),
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            in_flight: self.in_flight.clone(),
        };
        self.in_flight
            .join_or_start(&self.user, move |ticket| {
                fetch_and_store(ctx, ticket).boxed()
            })
            .await
    }

    async fn read_entry(&self) -> Result<Option<CachedPhotoEntry>, AppError> {
        let Some(raw_metadata) = self.store.get(&metadata_key(&self.user)).await? else {
            return Ok(None);
        };

        let metadata: PhotoMetadata = match serde_json::from_str(&raw_metadata) {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(user = %self.user, error = %err, "Discarding unreadable photo metadata");
                self.discard_entry().await?;
                return Ok(None);
            }
        };

        let Some(image_data_url) = self.store.get(&photo_key(&self.user)).await? else {
            warn!(user = %self.user, "Discarding photo metadata without image");
            self.discard_entry().await?;
            return Ok(None);
        };

        if let Err(err) = DataUrl::parse(&image_data_url) {
            warn!(user = %self.user, error = %err, "Discarding unreadable cached photo");
            self.discard_entry().await?;
            return Ok(None);
        }

        Ok(Some(CachedPhotoEntry {
            image_data_url,
            metadata,
        }))
    }

    async fn discard_entry(&self) -> Result<(), AppError> {
        remove_entry(self.store.as_ref(), &self.user).await
    }

    async fn clear_local(&self) -> Result<(), AppError> {
        self.in_flight.invalidate(&self.user).await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.discard_entry().await?;
        self.reset_state();
        Ok(())
    }

    fn begin(&self) -> BusyGuard<'_> {
        self.busy.fetch_add(1, Ordering::SeqCst);
        BusyGuard { busy: &self.busy }
    }

    fn apply_entry(&self, entry: &CachedPhotoEntry) {
        let mut state = self.write_state();
        state.photo = Some(entry.image_data_url.clone());
        state.metadata = Some(entry.metadata.clone());
        state.error = None;
    }

    fn reset_state(&self) {
        let mut state = self.write_state();
        state.photo = None;
        state.metadata = None;
        state.error = None;
    }

    fn record_error(&self, err: &AppError) {
        self.write_state().error = Some(err.to_string());
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, PhotoState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, PhotoState> {
        self.state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

struct BusyGuard<'a> {
    busy: &'a AtomicUsize,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.busy.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn fetch_and_store(ctx: RefreshContext, ticket: u64) -> RefreshOutcome {
    let entry = match ctx.gateway.fetch_photo(&ctx.user).await? {
        PhotoFetch::Found(photo) => Some(CachedPhotoEntry::from_remote(&photo, ctx.clock.now())),
        PhotoFetch::NotFound => None,
    };

    let persisted = ctx
        .in_flight
        .run_if_current(&ctx.user, ticket, persist(ctx.store.as_ref(), &ctx.user, entry.as_ref()))
        .await;
    match persisted {
        Some(result) => result?,
        None => debug!(user = %ctx.user, ticket, "Photo refresh superseded, skipping write"),
    }

    Ok(entry)
}

async fn persist(
    store: &dyn KeyValueStore,
    user: &UserId,
    entry: Option<&CachedPhotoEntry>,
) -> Result<(), AppError> {
    let Some(entry) = entry else {
        return remove_entry(store, user).await;
    };

    // 古いメタデータを消してから画像 → メタデータの順に書き込む。失敗時はエントリごと削除する
    let written = async {
        let metadata = serde_json::to_string(&entry.metadata)
            .map_err(|err| AppError::SerializationError(err.to_string()))?;
        store.remove(&metadata_key(user)).await?;
        store.set(&photo_key(user), &entry.image_data_url).await?;
        store.set(&metadata_key(user), &metadata).await
    }
    .await;

    if let Err(err) = written {
        warn!(user = %user, error = %err, "Failed to persist profile photo cache entry");
        if let Err(err) = remove_entry(store, user).await {
            warn!(user = %user, error = %err, "Failed to drop partially written photo cache entry");
        }
    }
    Ok(())
}

async fn remove_entry(store: &dyn KeyValueStore, user: &UserId) -> Result<(), AppError> {
    store.remove(&metadata_key(user)).await?;
    store.remove(&photo_key(user)).await
}
