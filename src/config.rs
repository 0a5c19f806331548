use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::{env, net::SocketAddr, str::FromStr, time::Duration};
use thiserror::Error;

pub const DEFAULT_MARKET_DATA_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
pub const DEFAULT_DASHBOARD_SYMBOLS: &str = "AAPL,MSFT,GOOGL,AMZN,TSLA";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("Invalid {key} '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime settings, read once at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    pub market_data_base_url: String,
    pub market_data_timeout: Duration,
    pub market_data_cache_ttl: Duration,
    pub dashboard_symbols: Vec<String>,
    pub session_ttl: chrono::Duration,
    pub starting_balance: Decimal,
    pub secure_cookies: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            market_data_base_url: DEFAULT_MARKET_DATA_URL.to_string(),
            market_data_timeout: Duration::from_secs(10),
            market_data_cache_ttl: Duration::from_secs(300),
            dashboard_symbols: parse_symbol_list(DEFAULT_DASHBOARD_SYMBOLS),
            session_ttl: chrono::Duration::hours(336),
            starting_balance: dec!(10000),
            secure_cookies: false,
        }
    }
}

impl AppConfig {
    /// Load from the process environment (and `.env` when present).
    ///
    /// Only `DATABASE_URL` is required; everything else falls back to the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let listen_addr: SocketAddr = parse_var("LISTEN_ADDR", defaults.listen_addr)?;

        let market_data_base_url =
            env::var("MARKET_DATA_BASE_URL").unwrap_or(defaults.market_data_base_url);

        let timeout_secs: u64 = parse_var("MARKET_DATA_TIMEOUT_SECS", 10)?;
        let cache_ttl_secs: u64 = parse_var("MARKET_DATA_CACHE_TTL_SECS", 300)?;
        let session_ttl_hours: i64 = parse_var("SESSION_TTL_HOURS", 336)?;
        let starting_balance: Decimal = parse_var("STARTING_BALANCE", defaults.starting_balance)?;
        let secure_cookies: bool = parse_var("SECURE_COOKIES", false)?;

        let dashboard_symbols = env::var("DASHBOARD_SYMBOLS")
            .map(|raw| parse_symbol_list(&raw))
            .unwrap_or(defaults.dashboard_symbols);

        if starting_balance.is_sign_negative() {
            return Err(ConfigError::Invalid {
                key: "STARTING_BALANCE",
                value: starting_balance.to_string(),
                reason: "cannot be negative".to_string(),
            });
        }

        Ok(Self {
            database_url,
            listen_addr,
            market_data_base_url,
            market_data_timeout: Duration::from_secs(timeout_secs),
            market_data_cache_ttl: Duration::from_secs(cache_ttl_secs),
            dashboard_symbols,
            session_ttl: chrono::Duration::hours(session_ttl_hours),
            starting_balance,
            secure_cookies,
        })
    }
}

fn parse_var<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Split a comma separated symbol list, uppercasing and dropping blanks and duplicates
pub fn parse_symbol_list(raw: &str) -> Vec<String> {
    let mut symbols: Vec<String> = Vec::new();
    for symbol in raw.split(',').map(|s| s.trim().to_uppercase()) {
        if !symbol.is_empty() && !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    symbols
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_symbol_list() {
        assert_eq!(
            parse_symbol_list(" aapl, MSFT,,aapl ,tsla"),
            vec!["AAPL", "MSFT", "TSLA"]
        );
        assert!(parse_symbol_list("").is_empty());
    }

    #[test]
    fn test_parse_value_errors() {
        assert_eq!(parse_value::<u64>("MARKET_DATA_TIMEOUT_SECS", " 15 "), Ok(15));

        let err = parse_value::<u64>("MARKET_DATA_TIMEOUT_SECS", "soon").unwrap_err();
        match &err {
            ConfigError::Invalid { key, value, .. } => {
                assert_eq!(*key, "MARKET_DATA_TIMEOUT_SECS");
                assert_eq!(value, "soon");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.to_string().starts_with("Invalid MARKET_DATA_TIMEOUT_SECS 'soon'"));

        assert!(parse_value::<SocketAddr>("LISTEN_ADDR", "not-an-addr").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.starting_balance, dec!(10000));
        assert_eq!(config.dashboard_symbols.len(), 5);
        assert_eq!(config.session_ttl, chrono::Duration::days(14));
    }
}
