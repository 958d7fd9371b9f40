pub mod chain;
pub mod config;
pub mod db;
pub mod decoder;
pub mod etherscan;
pub mod extractor;
pub mod metrics;
pub mod models;
