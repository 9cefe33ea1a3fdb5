/// Database configuration and connection management
pub mod database;

/// Process settings loading from config.toml
pub mod settings;
