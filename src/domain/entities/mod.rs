pub mod profile_photo;

pub use profile_photo::{
    CachedPhotoEntry, PhotoFetch, PhotoMetadata, PhotoState, PhotoUpload, RemotePhoto,
    RemotePhotoMetadata,
};
