pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod server;
pub mod store;
pub mod testing;
