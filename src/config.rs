// config.rs
use std::net::SocketAddr;
use std::path::PathBuf;

pub const ENV_DB: &str = "LAND_PRICE_DB";
pub const ENV_ADDR: &str = "LAND_PRICE_ADDR";
pub const ENV_WORKERS: &str = "LAND_PRICE_WORKERS";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub max_workers: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("land_price.sqlite3"),
            addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            max_workers: 8,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unparseable values keep the default and log a warning.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(v) = get(ENV_DB).filter(|v| !v.trim().is_empty()) {
            cfg.db_path = PathBuf::from(v.trim());
        }
        if let Some(v) = get(ENV_ADDR) {
            match v.trim().parse::<SocketAddr>() {
                Ok(addr) => cfg.addr = addr,
                Err(e) => tracing::warn!(value = %v, error = %e, "invalid {ENV_ADDR}, using default"),
            }
        }
        if let Some(v) = get(ENV_WORKERS) {
            match v.trim().parse::<usize>() {
                Ok(n) if n > 0 => cfg.max_workers = n,
                _ => tracing::warn!(value = %v, "invalid {ENV_WORKERS}, using default"),
            }
        }

        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(AppConfig::from_lookup(lookup(&[])), AppConfig::default());
    }

    #[test]
    fn values_override_defaults() {
        let cfg = AppConfig::from_lookup(lookup(&[
            (ENV_DB, "/var/lib/land/prices.db"),
            (ENV_ADDR, "0.0.0.0:8080"),
            (ENV_WORKERS, "16"),
        ]));
        assert_eq!(cfg.db_path, PathBuf::from("/var/lib/land/prices.db"));
        assert_eq!(cfg.addr.port(), 8080);
        assert_eq!(cfg.max_workers, 16);
    }

    #[test]
    fn invalid_values_fall_back() {
        let cfg = AppConfig::from_lookup(lookup(&[(ENV_ADDR, "nowhere"), (ENV_WORKERS, "0")]));
        assert_eq!(cfg.addr, AppConfig::default().addr);
        assert_eq!(cfg.max_workers, 8);
    }
}
