//! Configuration module for sdistfetch
//!
//! Loads config from `$XDG_CONFIG_HOME/sdistfetch/config.toml` or `~/.config/sdistfetch/config.toml`.
//! Falls back to embedded defaults if file doesn't exist.
//! Partial configs are merged with defaults using serde's default attributes.
//!
//! # Example
//!
//! ```no_run
//! use sdistfetch::config::Config;
//!
//! let config = Config::load().expect("Failed to load config");
//! println!("Avoid binary packages: {}", config.download.avoid_binary);
//! ```

pub mod schema;

pub use schema::Config;
