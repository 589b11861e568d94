pub mod auth;
pub mod config;
pub mod error;
pub mod import;
pub mod models;
pub mod persist;
pub mod photos;
pub mod scanner;
pub mod search;
pub mod server;
