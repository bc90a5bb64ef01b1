pub mod cli;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod keystore;
pub mod properties;
pub mod property_source;
pub mod vault;
