use crate::shared::error::AppError;
use async_trait::async_trait;

/// 文字列キー・文字列値の永続ストア
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), AppError>;
    /// 存在しないキーの削除は成功扱い
    async fn remove(&self, key: &str) -> Result<(), AppError>;
}
