pub mod image_validator;
pub mod in_flight;
pub mod profile_photo_cache;

pub use image_validator::{DefaultImageValidator, UploadPolicy};
pub use in_flight::{InFlightLoads, RefreshOutcome};
pub use profile_photo_cache::{metadata_key, photo_key, ProfilePhotoCache};
