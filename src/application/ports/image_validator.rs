use crate::domain::entities::PhotoUpload;
use crate::shared::error::AppError;

/// アップロード前にファイルの種類とサイズを検査する
pub trait ImageValidator: Send + Sync {
    fn validate(&self, upload: &PhotoUpload) -> Result<(), AppError>;
}
