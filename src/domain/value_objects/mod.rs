pub mod data_url;
pub mod user_id;

pub use data_url::DataUrl;
pub use user_id::UserId;
