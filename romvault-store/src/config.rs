// SPDX-FileCopyrightText: 2026 romvault contributors
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{IoContext, Result, StoreError};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "ROMVAULT_CONFIG";

/// Configuration file picked up from the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "romvault.toml";

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Path to the SQLite store
    pub db_path: PathBuf,

    /// Upper bound on check/repair passes before giving up
    pub max_repair_passes: usize,

    /// Yield to the runtime after this many items in long batch operations
    pub yield_every: usize,

    /// Largest archive entry, in bytes, a backup import will read
    pub max_entry_size: u64,

    /// Log level
    pub log_level: String,

    pub screenshot: ScreenshotConfig,
}

/// Aspect-ratio correction applied to screenshots before storage.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ScreenshotConfig {
    /// Platforms whose screenshots get a 2x stretch when too wide or too tall
    pub stretch_platforms: Vec<String>,

    /// Width/height ratio beyond which a screenshot counts as distorted
    pub max_aspect_ratio: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("romvault.sqlite"),
            max_repair_passes: 5,
            yield_every: 32,
            max_entry_size: 1 << 30,
            log_level: "info".to_string(),
            screenshot: ScreenshotConfig::default(),
        }
    }
}

impl Default for ScreenshotConfig {
    fn default() -> Self {
        Self {
            stretch_platforms: vec!["snes".to_string()],
            max_aspect_ratio: 2.0,
        }
    }
}

impl ScreenshotConfig {
    pub fn applies_to(&self, platform_id: &str) -> bool {
        self.stretch_platforms.iter().any(|p| p == platform_id)
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .io_context(|| format!("Failed to read config file at {}", path.display()))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the store cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.max_repair_passes == 0 {
            return Err(StoreError::config("max_repair_passes must be greater than 0"));
        }
        if self.yield_every == 0 {
            return Err(StoreError::config("yield_every must be greater than 0"));
        }
        if self.max_entry_size == 0 {
            return Err(StoreError::config("max_entry_size must be greater than 0"));
        }
        let ratio = self.screenshot.max_aspect_ratio;
        if ratio.is_nan() || ratio <= 1.0 {
            return Err(StoreError::config(
                "screenshot.max_aspect_ratio must be greater than 1",
            ));
        }
        Ok(())
    }
}

/// Load the configuration from `ROMVAULT_CONFIG`, then `romvault.toml`,
/// falling back to defaults.
pub fn load() -> Result<Config> {
    match std::env::var(CONFIG_ENV) {
        Ok(path) => Config::from_file(Path::new(&path)),
        Err(_) => {
            let local = Path::new(DEFAULT_CONFIG_FILE);
            if local.exists() {
                Config::from_file(local)
            } else {
                Ok(Config::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.max_repair_passes, 5);
        assert_eq!(config.max_entry_size, 1 << 30);
        assert!(config.screenshot.applies_to("snes"));
        assert!(!config.screenshot.applies_to("nes"));
    }

    #[test]
    fn test_partial_override() {
        let config = Config::from_toml(
            r#"
            db_path = "/tmp/store.sqlite"
            yield_every = 8

            [screenshot]
            stretch_platforms = ["snes", "psx"]
            "#,
        )
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/store.sqlite"));
        assert_eq!(config.yield_every, 8);
        assert_eq!(config.max_repair_passes, 5);
        assert!(config.screenshot.applies_to("psx"));
        assert_eq!(config.screenshot.max_aspect_ratio, 2.0);
    }

    #[rstest]
    #[case::zero_passes("max_repair_passes = 0")]
    #[case::zero_yield("yield_every = 0")]
    #[case::zero_entry_size("max_entry_size = 0")]
    #[case::flat_ratio("[screenshot]\nmax_aspect_ratio = 1.0")]
    fn test_invalid_values(#[case] contents: &str) {
        assert!(matches!(
            Config::from_toml(contents),
            Err(StoreError::Config(_))
        ));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(matches!(
            Config::from_toml("max_passes = 3"),
            Err(StoreError::Toml(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("romvault.toml");
        std::fs::write(&path, "log_level = \"debug\"\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.log_level, "debug");

        let missing = Config::from_file(&dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(StoreError::Io { .. })));
    }
}
