pub mod clock;
pub mod image_validator;
pub mod key_value_store;
pub mod photo_gateway;

pub use clock::{Clock, SystemClock};
pub use image_validator::ImageValidator;
pub use key_value_store::KeyValueStore;
pub use photo_gateway::PhotoGateway;
