pub mod analysis;
pub mod config;
pub mod data_models;
pub mod discovery;
pub mod errors;
pub mod export;
pub mod file_processor;
pub mod metrics;
pub mod parsers;
pub mod periods;
pub mod schema;
pub mod utils;
pub mod validation;
pub mod window;

#[cfg(test)]
mod tests;
