use anyhow::{anyhow, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::services::BIG_SPREAD_THRESHOLD;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding `nfl_{season}.csv` files
    pub season_data_dir: PathBuf,
    pub first_season: u16,
    pub last_season: u16,
    pub big_spread_threshold: f64,
}

impl AppConfig {
    /// Read configuration from the environment (after `.env` has been loaded).
    pub fn from_env() -> Result<Self> {
        let season_data_dir: PathBuf = env::var("SEASON_DATA_DIR")
            .unwrap_or_else(|_| "season_data".to_string())
            .into();

        let config = Self {
            season_data_dir,
            first_season: parse_var("FIRST_SEASON", 1999)?,
            last_season: parse_var("LAST_SEASON", 2024)?,
            big_spread_threshold: parse_var("BIG_SPREAD_THRESHOLD", BIG_SPREAD_THRESHOLD)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.first_season > self.last_season {
            anyhow::bail!(
                "FIRST_SEASON ({}) must not be after LAST_SEASON ({})",
                self.first_season,
                self.last_season
            );
        }
        if !self.big_spread_threshold.is_finite() || self.big_spread_threshold < 0.0 {
            anyhow::bail!("BIG_SPREAD_THRESHOLD must be a non-negative number");
        }
        Ok(())
    }

    /// Keep the seasons inside the configured `FIRST_SEASON..=LAST_SEASON` window.
    pub fn seasons_within(&self, available: &[u16]) -> Vec<u16> {
        available
            .iter()
            .copied()
            .filter(|s| (self.first_season..=self.last_season).contains(s))
            .collect()
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow!("{} has an invalid value: '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}
