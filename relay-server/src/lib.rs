mod app;
pub mod config;
pub mod local_store;

pub use app::{build, open_store, verify_storage};
pub use config::ServerConfig;
pub use local_store::LocalStore;
