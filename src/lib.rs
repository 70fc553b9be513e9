pub mod advisor;
pub mod app;
pub mod billing;
pub mod config;
pub mod quotes;
