pub mod cli;
pub mod client;
pub mod config;
pub mod core;
pub mod error;
pub mod messaging;
pub mod scheduler;
pub mod storage;
pub mod utils;
