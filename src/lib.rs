pub mod catalog;
pub mod config;
pub mod credentials;
pub mod detector;
pub mod error;
pub mod export;
pub mod fake_source;
pub mod http_client;
pub mod remote;
pub mod report;
pub mod store;
pub mod timefmt;
pub mod ubi_client;
pub mod writer;
