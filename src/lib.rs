//! Per-user profile photo cache.
//!
//! A [`ProfilePhotoCache`] keeps one photo per user in a [`KeyValueStore`],
//! trusts it for a fixed TTL, and refetches from a [`PhotoGateway`] on miss,
//! expiry, upload or a detected server-side change.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;

pub use application::ports::{Clock, ImageValidator, KeyValueStore, PhotoGateway, SystemClock};
pub use application::services::{
    metadata_key, photo_key, DefaultImageValidator, InFlightLoads, ProfilePhotoCache,
    UploadPolicy,
};
pub use domain::entities::{
    CachedPhotoEntry, PhotoFetch, PhotoMetadata, PhotoState, PhotoUpload, RemotePhoto,
    RemotePhotoMetadata,
};
pub use domain::value_objects::{DataUrl, UserId};
pub use shared::{AppError, PhotoCacheConfig, Result};
