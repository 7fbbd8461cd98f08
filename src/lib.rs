pub mod bottle;
pub mod config;
pub mod cors;
pub mod error;
pub mod models;
pub mod openapi;
pub mod password;
pub mod repo;
pub mod routes;
pub mod storage; // S3-compatible object store for uploads

// Re-export commonly used items for tests / the binary
pub use cors::CorsHeaders;
pub use routes::{config, AppState};
