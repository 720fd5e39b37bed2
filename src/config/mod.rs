/// Database configuration and connection management
pub mod database;

/// Member seed configuration loading from mess.toml
pub mod members;
