use std::time::Duration;

pub trait Configuration: Clone + Send + Sync + 'static {
    fn port(&self) -> String;
    fn database_url(&self) -> Option<String>;
    fn pool_size(&self) -> u32;
    /// Upper bound for any single storage interaction.
    fn storage_timeout(&self) -> Duration;
    /// Period of the background repair pass, `None` when disabled.
    fn reconcile_interval(&self) -> Option<Duration>;
}
