use crate::configuration::Configuration;
use clap::Parser;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "salon_booking", about = "Booking backend for a network of hairdressing salons")]
pub struct ConfigurationHandler {
    /// Port the HTTP server listens on
    #[arg(long, env = "PORT", default_value = "8080")]
    port: String,

    /// PostgreSQL connection URL. Slots and reservations are kept in memory if absent
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Maximum number of pooled database connections
    #[arg(long, env = "DATABASE_POOL_SIZE", default_value_t = 10)]
    pool_size: u32,

    /// Timeout for acquiring a connection or lock and for every statement
    #[arg(long, env = "STORAGE_TIMEOUT_MS", default_value_t = 5000)]
    storage_timeout_ms: u64,

    /// Seconds between two repair passes, 0 disables them
    #[arg(long, env = "RECONCILE_INTERVAL_SECS", default_value_t = 60)]
    reconcile_interval_secs: u64,
}

impl ConfigurationHandler {
    pub fn parse_arguments() -> Self {
        dotenvy::dotenv().ok();
        Self::parse()
    }
}

impl Configuration for ConfigurationHandler {
    fn port(&self) -> String {
        self.port.clone()
    }

    fn database_url(&self) -> Option<String> {
        self.database_url.clone().filter(|url| !url.is_empty())
    }

    fn pool_size(&self) -> u32 {
        self.pool_size.max(1)
    }

    fn storage_timeout(&self) -> Duration {
        Duration::from_millis(self.storage_timeout_ms.max(1))
    }

    fn reconcile_interval(&self) -> Option<Duration> {
        (self.reconcile_interval_secs > 0).then(|| Duration::from_secs(self.reconcile_interval_secs))
    }
}
