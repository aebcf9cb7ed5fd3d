pub mod app_state;
pub mod cache;
pub mod config;
pub mod http_client;
pub mod models;
pub mod notify;
pub mod s3;
pub mod scheduler;
pub mod sources;
pub mod sync;
