use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

use crate::constants::auction;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub environment: String,
    pub port: u16,
    pub database_url: String,
    pub total_rounds: u32,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let total_rounds: u32 = env::var("AUCTION_TOTAL_ROUNDS")
            .unwrap_or_else(|_| auction::DEFAULT_TOTAL_ROUNDS.to_string())
            .parse()?;
        if total_rounds == 0 {
            return Err(anyhow::anyhow!("AUCTION_TOTAL_ROUNDS must be at least 1"));
        }

        Ok(Config {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()?,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://auction.db?mode=rwc".to_string()),
            total_rounds,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }
}
