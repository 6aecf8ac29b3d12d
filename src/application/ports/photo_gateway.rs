use crate::domain::entities::{PhotoFetch, RemotePhotoMetadata};
use crate::domain::value_objects::UserId;
use crate::shared::error::AppError;
use async_trait::async_trait;

/// プロフィール写真を保持するリモートサービスのポート
#[async_trait]
pub trait PhotoGateway: Send + Sync {
    /// 写真本体を取得。写真が無い場合は `PhotoFetch::NotFound`
    async fn fetch_photo(&self, user: &UserId) -> Result<PhotoFetch, AppError>;

    /// メタデータのみ取得。写真が無い場合は `None`
    async fn fetch_photo_metadata(
        &self,
        user: &UserId,
    ) -> Result<Option<RemotePhotoMetadata>, AppError>;

    async fn upload_photo(
        &self,
        user: &UserId,
        base64_image: &str,
        mime_type: &str,
    ) -> Result<RemotePhotoMetadata, AppError>;

    async fn delete_photo(&self, user: &UserId) -> Result<(), AppError>;
}
