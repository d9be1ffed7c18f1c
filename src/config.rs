//! Configuration Module
//!
//! This module reads the archive-extraction limits from environment variables,
//! provides defaults, and rejects values that would disable the size guard.
//! The decoders themselves take no configuration.

use anyhow::Result;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub max_file_size: usize,
    pub max_decompressed_size: usize,
    pub max_files_in_zip: usize,
    pub max_compression_ratio: f64,
    pub max_filename_length: usize,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Creates a new configuration by reading environment variables.
    /// If a variable is missing or unparsable, the default is used.
    pub fn new() -> Result<Self> {
        let max_file_size = env_or("DMARC_MAX_FILE_SIZE", 10 * 1024 * 1024);
        if max_file_size > 500_000_000 {
            return Err(anyhow::anyhow!("Max file size too large (500MB limit)"));
        }

        let max_compression_ratio = env_or("DMARC_MAX_COMPRESSION_RATIO", 1000.0);
        if max_compression_ratio <= 0.0 {
            return Err(anyhow::anyhow!("Max compression ratio must be positive"));
        }

        Ok(Config {
            max_file_size,
            max_decompressed_size: env_or("DMARC_MAX_DECOMPRESSED_SIZE", 100 * 1024 * 1024),
            max_files_in_zip: env_or("DMARC_MAX_FILES_IN_ZIP", 1000),
            max_compression_ratio,
            max_filename_length: env_or("DMARC_MAX_FILENAME_LENGTH", 256),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_file_size: 10 * 1024 * 1024,
            max_decompressed_size: 100 * 1024 * 1024,
            max_files_in_zip: 1000,
            max_compression_ratio: 1000.0,
            max_filename_length: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    // Both cases touch the same process environment, so they run in one test.
    #[test]
    fn test_config_defaults_and_overrides() {
        for key in [
            "DMARC_MAX_FILE_SIZE",
            "DMARC_MAX_DECOMPRESSED_SIZE",
            "DMARC_MAX_FILES_IN_ZIP",
            "DMARC_MAX_COMPRESSION_RATIO",
            "DMARC_MAX_FILENAME_LENGTH",
        ] {
            env::remove_var(key);
        }

        let config = Config::new().unwrap();
        assert_eq!(config.max_file_size, 10 * 1024 * 1024);
        assert_eq!(config.max_decompressed_size, 100 * 1024 * 1024);
        assert_eq!(config.max_files_in_zip, 1000);
        assert_eq!(config.max_compression_ratio, 1000.0);
        assert_eq!(config.max_filename_length, 256);

        env::set_var("DMARC_MAX_FILE_SIZE", "5242880");
        env::set_var("DMARC_MAX_FILES_IN_ZIP", "500");
        env::set_var("DMARC_MAX_COMPRESSION_RATIO", "not a number");
        let config = Config::new().unwrap();
        assert_eq!(config.max_file_size, 5242880);
        assert_eq!(config.max_files_in_zip, 500);
        assert_eq!(config.max_compression_ratio, 1000.0);

        env::set_var("DMARC_MAX_FILE_SIZE", "600000000");
        assert!(Config::new().is_err());

        env::remove_var("DMARC_MAX_FILE_SIZE");
        env::remove_var("DMARC_MAX_FILES_IN_ZIP");
        env::remove_var("DMARC_MAX_COMPRESSION_RATIO");
    }
}
