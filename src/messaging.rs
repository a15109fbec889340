pub mod console;
pub mod models;
pub mod service;
pub mod templates;
