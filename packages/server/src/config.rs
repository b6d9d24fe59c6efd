use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub database_max_connections: u32,
    /// How long a waitlist offer stays open before the sweep reclaims it
    pub offer_window_minutes: i64,
    /// Share of the ticket price withheld when a returned ticket is resold
    pub platform_fee_rate: Decimal,
    /// Six-field cron expression for the reservation sweep
    pub reservation_sweep_cron: String,
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let offer_window_minutes: i64 = env::var("OFFER_WINDOW_MINUTES")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .context("OFFER_WINDOW_MINUTES must be a whole number of minutes")?;
        if offer_window_minutes <= 0 {
            bail!("OFFER_WINDOW_MINUTES must be positive");
        }

        let platform_fee_rate = Decimal::from_str(
            &env::var("PLATFORM_FEE_RATE").unwrap_or_else(|_| "0.02".to_string()),
        )
        .context("PLATFORM_FEE_RATE must be a decimal number")?;
        if platform_fee_rate < Decimal::ZERO || platform_fee_rate >= Decimal::ONE {
            bail!("PLATFORM_FEE_RATE must be in [0, 1)");
        }

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a valid number")?,
            offer_window_minutes,
            platform_fee_rate,
            reservation_sweep_cron: env::var("RESERVATION_SWEEP_CRON")
                .unwrap_or_else(|_| "0 */2 * * * *".to_string()),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .map(|origins| parse_origins(&origins))
                .unwrap_or_default(),
        })
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}
