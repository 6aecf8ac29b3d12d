pub mod photo_api_client;

pub use photo_api_client::HttpPhotoGateway;
