//! Server dependencies shared by every activity.

use chrono::Duration;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::config::Config;

/// Tunables for waitlist offers and resale settlements.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitlistPolicy {
    /// Lifetime of a reserved-ticket offer.
    pub offer_window: Duration,
    /// Share of the original price withheld from a resale settlement.
    pub fee_rate: Decimal,
}

impl WaitlistPolicy {
    pub const DEFAULT_OFFER_WINDOW_MINUTES: i64 = 30;

    pub fn from_config(config: &Config) -> Self {
        Self {
            offer_window: Duration::minutes(config.offer_window_minutes),
            fee_rate: config.platform_fee_rate,
        }
    }
}

impl Default for WaitlistPolicy {
    fn default() -> Self {
        Self {
            offer_window: Duration::minutes(Self::DEFAULT_OFFER_WINDOW_MINUTES),
            // 2%
            fee_rate: Decimal::new(2, 2),
        }
    }
}

/// Server dependencies accessible to activities
#[derive(Clone)]
pub struct ServerDeps {
    pub db_pool: PgPool,
    pub policy: WaitlistPolicy,
}

impl ServerDeps {
    pub fn new(db_pool: PgPool, policy: WaitlistPolicy) -> Self {
        Self { db_pool, policy }
    }
}
