pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod models;
pub mod store;

pub use config::QuillConfig;
pub use error::QuillError;
pub use identity::{HttpIdentityClient, Identity, IdentityConfig, IdentityError, IdentityProvider};
pub use models::{Record, Resource};
pub use store::RecordStore;
