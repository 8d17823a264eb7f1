pub mod app;
pub mod config;
pub mod domain;
pub mod download;
pub mod error;
pub mod output;
pub mod resolver;
pub mod storage;
pub mod store;
