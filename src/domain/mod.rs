pub mod entities;
pub mod value_objects;

pub use entities::{CachedPhotoEntry, PhotoFetch, PhotoMetadata, PhotoState, PhotoUpload};
pub use value_objects::{DataUrl, UserId};
