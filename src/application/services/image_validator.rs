use crate::application::ports::ImageValidator;
use crate::domain::entities::PhotoUpload;
use crate::shared::config::UploadConfig;
use crate::shared::error::AppError;
use crate::shared::validation::ValidationFailureKind;

#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub allowed_mime_types: Vec<String>,
    pub max_bytes: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        UploadConfig::default().into()
    }
}

impl From<UploadConfig> for UploadPolicy {
    fn from(config: UploadConfig) -> Self {
        Self {
            allowed_mime_types: config.allowed_mime_types,
            max_bytes: config.max_bytes,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DefaultImageValidator {
    policy: UploadPolicy,
}

impl DefaultImageValidator {
    pub fn new(policy: UploadPolicy) -> Self {
        Self { policy }
    }
}

impl ImageValidator for DefaultImageValidator {
    fn validate(&self, upload: &PhotoUpload) -> Result<(), AppError> {
        validate_format(&upload.mime_type, &self.policy.allowed_mime_types)?;
        validate_size(upload.size(), self.policy.max_bytes)
    }
}

fn validate_format(mime_type: &str, allowed: &[String]) -> Result<(), AppError> {
    let normalized = mime_type.trim().to_ascii_lowercase();
    if !normalized.starts_with("image/") {
        return Err(AppError::validation(
            ValidationFailureKind::UnsupportedMimeType,
            format!("Profile photo must be an image (got {mime_type})"),
        ));
    }
    if !allowed.iter().any(|candidate| candidate == &normalized) {
        return Err(AppError::validation(
            ValidationFailureKind::UnsupportedMimeType,
            format!(
                "Unsupported image type {normalized}; allowed: {}",
                allowed.join(", ")
            ),
        ));
    }
    Ok(())
}

fn validate_size(size: usize, max_bytes: u64) -> Result<(), AppError> {
    if size == 0 {
        return Err(AppError::validation(
            ValidationFailureKind::EmptyContent,
            "Profile photo file is empty",
        ));
    }
    if size as u64 > max_bytes {
        return Err(AppError::validation(
            ValidationFailureKind::ContentTooLarge,
            format!("Profile photo size exceeds limit ({size} bytes > {max_bytes} bytes)"),
        ));
    }
    Ok(())
}
