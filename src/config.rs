use chrono::Duration;
use std::env;
use std::net::SocketAddr;

/// Statement shown to the wallet user when none is configured.
pub const DEFAULT_STATEMENT: &str =
    "Please ensure that the domain above matches the URL of the current website.";

/// Minimum length of the session signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Upper bound for every lifetime setting (ten years).
pub const MAX_TTL_SECS: u64 = 10 * 365 * 86_400;

#[derive(Clone)]
pub struct Config {
    // Session signing key material
    pub secret: String,

    // Challenge identity
    pub domain: String,
    pub uri: String,
    pub statement: String,

    // Server
    pub bind_addr: SocketAddr,
    pub cors_allowed_origin: Option<String>,

    // Nonce store (in-memory when unset)
    pub redis_url: Option<String>,

    // TTLs (in seconds)
    pub challenge_ttl_secs: u64,
    pub session_ttl_secs: u64,
    pub cookie_max_age_secs: u64,
    pub nonce_sweep_interval_secs: u64,

    // Abuse limits
    pub rate_limit_login_per_min: u32,
    pub max_pending_nonces: usize,

    // Cookie
    pub cookie_secure: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("secret", &"[REDACTED]")
            .field("domain", &self.domain)
            .field("uri", &self.uri)
            .field("statement", &self.statement)
            .field("bind_addr", &self.bind_addr)
            .field("cors_allowed_origin", &self.cors_allowed_origin)
            .field("redis_url", &self.redis_url.as_ref().map(|_| "[REDACTED]"))
            .field("challenge_ttl_secs", &self.challenge_ttl_secs)
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("cookie_max_age_secs", &self.cookie_max_age_secs)
            .field("nonce_sweep_interval_secs", &self.nonce_sweep_interval_secs)
            .field("rate_limit_login_per_min", &self.rate_limit_login_per_min)
            .field("max_pending_nonces", &self.max_pending_nonces)
            .field("cookie_secure", &self.cookie_secure)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Failed to parse {0}: {1}")]
    ParseError(String, String),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Attempt to load .env file, but don't fail if it doesn't exist
        // (env vars may be set directly in production)
        let _ = dotenvy::dotenv();

        let secret = required_var("SECRET")?;
        if secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::InvalidValue(
                "SECRET".to_string(),
                format!("must be at least {} bytes", MIN_SECRET_LEN),
            ));
        }

        let domain = required_var("DOMAIN")?;
        let uri = required_var("URI")?;
        let statement = env::var("SIWE_STATEMENT")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_STATEMENT.to_string());

        // Any of these would break the line-oriented challenge text
        for (key, value) in [("DOMAIN", &domain), ("URI", &uri), ("SIWE_STATEMENT", &statement)] {
            if value.contains(['\n', '\r']) {
                return Err(ConfigError::InvalidValue(
                    key.to_string(),
                    "must not contain line breaks".to_string(),
                ));
            }
        }

        // Server
        let bind_addr_str = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let bind_addr = bind_addr_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::ParseError("BIND_ADDR".to_string(), e.to_string()))?;
        let cors_allowed_origin = optional_var("CORS_ALLOWED_ORIGIN");

        let redis_url = optional_var("REDIS_URL");

        // TTLs
        let challenge_ttl_secs = parse_env_or_default("CHALLENGE_TTL_SECS", 3_600)?;
        let session_ttl_secs = parse_env_or_default("SESSION_TTL_SECS", 86_400)?;
        let cookie_max_age_secs = parse_env_or_default("COOKIE_MAX_AGE_SECS", 3_600)?;
        let nonce_sweep_interval_secs = parse_env_or_default("NONCE_SWEEP_INTERVAL_SECS", 60)?;

        for (key, value) in [
            ("CHALLENGE_TTL_SECS", challenge_ttl_secs),
            ("SESSION_TTL_SECS", session_ttl_secs),
            ("COOKIE_MAX_AGE_SECS", cookie_max_age_secs),
            ("NONCE_SWEEP_INTERVAL_SECS", nonce_sweep_interval_secs),
        ] {
            if value > MAX_TTL_SECS {
                return Err(ConfigError::InvalidValue(
                    key.to_string(),
                    format!("must be at most {} seconds", MAX_TTL_SECS),
                ));
            }
            if value == 0 && key != "COOKIE_MAX_AGE_SECS" {
                return Err(ConfigError::InvalidValue(
                    key.to_string(),
                    "must be greater than zero".to_string(),
                ));
            }
        }

        // Abuse limits
        let rate_limit_login_per_min = parse_env_or_default("RATE_LIMIT_LOGIN_PER_MIN", 30)?;
        if rate_limit_login_per_min == 0 {
            return Err(ConfigError::InvalidValue(
                "RATE_LIMIT_LOGIN_PER_MIN".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        let max_pending_nonces = parse_env_or_default("MAX_PENDING_NONCES", 100_000)?;
        if max_pending_nonces == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_PENDING_NONCES".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let cookie_secure = parse_env_or_default("COOKIE_SECURE", false)?;

        Ok(Config {
            secret,
            domain,
            uri,
            statement,
            bind_addr,
            cors_allowed_origin,
            redis_url,
            challenge_ttl_secs,
            session_ttl_secs,
            cookie_max_age_secs,
            nonce_sweep_interval_secs,
            rate_limit_login_per_min,
            max_pending_nonces,
            cookie_secure,
        })
    }

    /// Challenge validity on each side of its issue time.
    pub fn challenge_ttl(&self) -> Result<Duration, ConfigError> {
        ttl_duration("CHALLENGE_TTL_SECS", self.challenge_ttl_secs)
    }

    /// Lifetime of an issued session credential.
    pub fn session_ttl(&self) -> Result<Duration, ConfigError> {
        ttl_duration("SESSION_TTL_SECS", self.session_ttl_secs)
    }

    /// Cookie `Max-Age`, in seconds.
    pub fn cookie_max_age(&self) -> i64 {
        i64::try_from(self.cookie_max_age_secs.min(MAX_TTL_SECS)).unwrap_or(0)
    }
}

fn ttl_duration(key: &str, secs: u64) -> Result<Duration, ConfigError> {
    i64::try_from(secs)
        .ok()
        .filter(|_| secs <= MAX_TTL_SECS)
        .and_then(Duration::try_seconds)
        .ok_or_else(|| {
            ConfigError::InvalidValue(
                key.to_string(),
                format!("must be at most {} seconds", MAX_TTL_SECS),
            )
        })
}

fn required_var(key: &str) -> Result<String, ConfigError> {
    let value = env::var(key).map_err(|_| ConfigError::MissingVar(key.to_string()))?;
    if value.trim().is_empty() {
        return Err(ConfigError::InvalidValue(
            key.to_string(),
            "cannot be empty".to_string(),
        ));
    }
    Ok(value)
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

/// Helper function to parse environment variable with a default value
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| ConfigError::ParseError(key.to_string(), format!("{}: {}", e, val))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Use a mutex to ensure tests run serially since they modify global env vars.
    // unwrap_or_else handles poison from prior panics.
    static TEST_MUTEX: Mutex<()> = Mutex::new(());

    fn lock_test() -> std::sync::MutexGuard<'static, ()> {
        TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner())
    }

    const TEST_SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn clear_test_env() {
        env::remove_var("SECRET");
        env::remove_var("DOMAIN");
        env::remove_var("URI");
        env::remove_var("SIWE_STATEMENT");
        env::remove_var("BIND_ADDR");
        env::remove_var("CORS_ALLOWED_ORIGIN");
        env::remove_var("REDIS_URL");
        env::remove_var("CHALLENGE_TTL_SECS");
        env::remove_var("SESSION_TTL_SECS");
        env::remove_var("COOKIE_MAX_AGE_SECS");
        env::remove_var("NONCE_SWEEP_INTERVAL_SECS");
        env::remove_var("COOKIE_SECURE");
        env::remove_var("RATE_LIMIT_LOGIN_PER_MIN");
        env::remove_var("MAX_PENDING_NONCES");
    }

    fn set_required() {
        env::set_var("SECRET", TEST_SECRET);
        env::set_var("DOMAIN", "app.example.com");
        env::set_var("URI", "https://app.example.com");
    }

    #[test]
    fn test_parse_env_or_default() {
        let _guard = lock_test();

        env::set_var("TEST_U64", "12345");
        let result: Result<u64, ConfigError> = parse_env_or_default("TEST_U64", 100);
        assert_eq!(result.unwrap(), 12345);

        env::remove_var("TEST_U64");
        let result: Result<u64, ConfigError> = parse_env_or_default("TEST_U64", 100);
        assert_eq!(result.unwrap(), 100);
    }

    #[test]
    fn test_empty_secret() {
        let _guard = lock_test();
        clear_test_env();

        // Set SECRET to empty to prevent dotenvy from reloading
        // a valid one from .env (dotenvy doesn't override existing vars).
        set_required();
        env::set_var("SECRET", "");

        let result = Config::from_env();
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidValue(ref s, _) if s == "SECRET"
        ));

        clear_test_env();
    }

    #[test]
    fn test_short_secret() {
        let _guard = lock_test();
        clear_test_env();

        set_required();
        env::set_var("SECRET", "too-short");

        let result = Config::from_env();
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidValue(ref s, _) if s == "SECRET"
        ));

        clear_test_env();
    }

    #[test]
    fn test_empty_domain() {
        let _guard = lock_test();
        clear_test_env();

        set_required();
        env::set_var("DOMAIN", "  ");

        let result = Config::from_env();
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidValue(ref s, _) if s == "DOMAIN"
        ));

        clear_test_env();
    }

    #[test]
    fn test_statement_with_newline_rejected() {
        let _guard = lock_test();
        clear_test_env();

        set_required();
        env::set_var("SIWE_STATEMENT", "line one\nURI: https://evil.example");

        let result = Config::from_env();
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidValue(ref s, _) if s == "SIWE_STATEMENT"
        ));

        clear_test_env();
    }

    #[test]
    fn test_invalid_socket_addr() {
        let _guard = lock_test();
        clear_test_env();

        set_required();
        env::set_var("BIND_ADDR", "invalid_address");

        let result = Config::from_env();
        assert!(matches!(result.unwrap_err(), ConfigError::ParseError(_, _)));

        clear_test_env();
    }

    #[test]
    fn test_zero_challenge_ttl_rejected() {
        let _guard = lock_test();
        clear_test_env();

        set_required();
        env::set_var("CHALLENGE_TTL_SECS", "0");

        let result = Config::from_env();
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidValue(ref s, _) if s == "CHALLENGE_TTL_SECS"
        ));

        clear_test_env();
    }

    #[test]
    fn test_oversized_ttls_rejected() {
        let _guard = lock_test();

        for key in ["CHALLENGE_TTL_SECS", "SESSION_TTL_SECS", "COOKIE_MAX_AGE_SECS"] {
            clear_test_env();
            set_required();
            env::set_var(key, "10000000000000");

            let result = Config::from_env();
            assert!(matches!(
                result.unwrap_err(),
                ConfigError::InvalidValue(ref s, _) if s == key
            ));
        }

        clear_test_env();
    }

    #[test]
    fn test_largest_ttl_accepted() {
        let _guard = lock_test();
        clear_test_env();

        set_required();
        env::set_var("SESSION_TTL_SECS", MAX_TTL_SECS.to_string());

        let config = Config::from_env().unwrap();
        assert_eq!(
            config.session_ttl().unwrap(),
            Duration::seconds(i64::try_from(MAX_TTL_SECS).unwrap())
        );

        clear_test_env();
    }

    #[test]
    fn test_ttl_accessors_reject_unbounded_literals() {
        let _guard = lock_test();
        clear_test_env();

        set_required();
        let mut config = Config::from_env().unwrap();
        config.challenge_ttl_secs = u64::MAX;
        config.session_ttl_secs = MAX_TTL_SECS + 1;

        assert!(matches!(
            config.challenge_ttl(),
            Err(ConfigError::InvalidValue(ref s, _)) if s == "CHALLENGE_TTL_SECS"
        ));
        assert!(matches!(
            config.session_ttl(),
            Err(ConfigError::InvalidValue(ref s, _)) if s == "SESSION_TTL_SECS"
        ));

        clear_test_env();
    }

    #[test]
    fn test_zero_rate_limit_rejected() {
        let _guard = lock_test();
        clear_test_env();

        set_required();
        env::set_var("RATE_LIMIT_LOGIN_PER_MIN", "0");

        let result = Config::from_env();
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidValue(ref s, _) if s == "RATE_LIMIT_LOGIN_PER_MIN"
        ));

        clear_test_env();
    }

    #[test]
    fn test_config_defaults() {
        let _guard = lock_test();
        clear_test_env();

        set_required();
        // Override any .env defaults to ensure predictable values
        env::set_var("BIND_ADDR", "127.0.0.1:8080");
        env::set_var("REDIS_URL", "");
        env::set_var("CORS_ALLOWED_ORIGIN", "");
        env::set_var("SIWE_STATEMENT", "");

        let config = Config::from_env().unwrap();

        assert_eq!(config.secret, TEST_SECRET);
        assert_eq!(config.domain, "app.example.com");
        assert_eq!(config.uri, "https://app.example.com");
        assert_eq!(config.statement, DEFAULT_STATEMENT);
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert!(config.cors_allowed_origin.is_none());
        assert!(config.redis_url.is_none());
        assert_eq!(config.challenge_ttl_secs, 3_600);
        assert_eq!(config.session_ttl_secs, 86_400);
        assert_eq!(config.cookie_max_age_secs, 3_600);
        assert_eq!(config.nonce_sweep_interval_secs, 60);
        assert_eq!(config.rate_limit_login_per_min, 30);
        assert_eq!(config.max_pending_nonces, 100_000);
        assert!(!config.cookie_secure);
        assert_eq!(config.challenge_ttl().unwrap(), Duration::hours(1));
        assert_eq!(config.session_ttl().unwrap(), Duration::hours(24));
        assert_eq!(config.cookie_max_age(), 3_600);

        clear_test_env();
    }

    #[test]
    fn test_debug_redacts_secret() {
        let _guard = lock_test();
        clear_test_env();

        set_required();
        env::set_var("REDIS_URL", "redis://:hunter2@127.0.0.1:6390");

        let config = Config::from_env().unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains(TEST_SECRET));
        assert!(!debug.contains("hunter2"));

        clear_test_env();
    }
}
