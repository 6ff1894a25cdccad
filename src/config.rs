// config.rs
use tracing_subscriber::filter::LevelFilter;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub db_max_connections: u32,
    // Handover lifecycle
    pub handover_window_days: i64,
    pub handover_sweep_interval_secs: u64,
    // Ambient
    pub log_level: LevelFilter,
    pub cors_origins: Vec<String>,
    /// Variables that were set but unparsable; logged once tracing is up.
    pub ignored_vars: Vec<String>,
}

impl Config {
    pub fn init() -> Config {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let mut ignored = Vec::new();

        Config {
            database_url,
            port: env_or("PORT", 8000, &mut ignored),
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 10, &mut ignored),
            handover_window_days: env_or("HANDOVER_WINDOW_DAYS", 30, &mut ignored),
            handover_sweep_interval_secs: env_or("HANDOVER_SWEEP_INTERVAL_SECS", 3600, &mut ignored),
            log_level: env_or("LOG_LEVEL", LevelFilter::DEBUG, &mut ignored),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:5173".to_string())
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
            ignored_vars: ignored,
        }
    }

    pub fn handover_window(&self) -> chrono::Duration {
        chrono::Duration::days(self.handover_window_days)
    }

    /// `None` disables the built-in periodic sweep.
    pub fn sweep_interval(&self) -> Option<std::time::Duration> {
        (self.handover_sweep_interval_secs > 0)
            .then(|| std::time::Duration::from_secs(self.handover_sweep_interval_secs))
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T, ignored: &mut Vec<String>) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            ignored.push(format!("{}={:?}", key, raw));
            default
        }),
        Err(_) => default,
    }
}
