use std::{env, path::PathBuf, time::Duration};

use secrecy::SecretString;

const DEFAULT_JWT_SECRET: &str = "dev_secret_key_change_in_production";
const DEFAULT_EXPIRY: Duration = Duration::from_secs(15 * 60);

#[derive(Clone, Debug)]
pub struct Config {
    pub app_env: String,
    pub mongo_conn_string: String,
    pub mongo_db_name: String,
    pub web_server_host: String,
    pub web_server_port: u16,
    pub jwt_secret: SecretString,
    pub jwt_access_expiry: Duration,
    pub jwt_refresh_expiry: Duration,
    pub bcrypt_cost: u32,
    pub upload_dir: PathBuf,
    pub cors_origins: Vec<String>,
    pub rate_limit_window: Duration,
    pub rate_limit_max: u32,
    pub login_limit_window: Duration,
    pub login_limit_max: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            app_env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            mongo_conn_string: env::var("MONGODB_URI")
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            mongo_db_name: env::var("MONGODB_DB_NAME").unwrap_or_else(|_| "smartlearn".to_string()),
            web_server_host: env::var("WEB_SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_server_port: parse_env("PORT", 3001),
            jwt_secret: SecretString::from(
                env::var("JWT_SECRET").unwrap_or_else(|_| DEFAULT_JWT_SECRET.to_string()),
            ),
            jwt_access_expiry: parse_expiry(
                &env::var("JWT_ACCESS_EXPIRY").unwrap_or_else(|_| "15m".to_string()),
            ),
            jwt_refresh_expiry: parse_expiry(
                &env::var("JWT_REFRESH_EXPIRY").unwrap_or_else(|_| "7d".to_string()),
            ),
            bcrypt_cost: parse_env("BCRYPT_COST", 12),
            upload_dir: PathBuf::from(env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string())),
            cors_origins: env::var("CORS_ORIGIN")
                .map(|v| split_origins(&v))
                .unwrap_or_else(|_| {
                    vec![
                        "http://localhost:3000".to_string(),
                        "http://localhost:3002".to_string(),
                    ]
                }),
            rate_limit_window: Duration::from_secs(parse_env("RATE_LIMIT_WINDOW_SECS", 15 * 60)),
            rate_limit_max: parse_env("RATE_LIMIT_MAX", 100),
            login_limit_window: Duration::from_secs(parse_env("LOGIN_LIMIT_WINDOW_SECS", 60 * 60)),
            login_limit_max: parse_env("LOGIN_LIMIT_MAX", 5),
        }
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }

    /// Validate that production-critical configuration is set.
    /// Panics if required secrets are using default values.
    pub fn validate_for_production(&self) {
        use secrecy::ExposeSecret;

        if !self.is_production() {
            return;
        }

        let jwt_secret = self.jwt_secret.expose_secret();

        if jwt_secret == DEFAULT_JWT_SECRET {
            panic!(
                "FATAL: JWT_SECRET is using default value! Set JWT_SECRET environment variable to a secure random string."
            );
        }

        if jwt_secret.len() < 32 {
            panic!(
                "FATAL: JWT_SECRET is too short ({}). Must be at least 32 characters for security.",
                jwt_secret.len()
            );
        }
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            app_env: "test".to_string(),
            mongo_conn_string: "mongodb://localhost:27017".to_string(),
            mongo_db_name: "smartlearn-test".to_string(),
            web_server_host: "127.0.0.1".to_string(),
            web_server_port: 3001,
            jwt_secret: SecretString::from("test_jwt_secret_key".to_string()),
            jwt_access_expiry: Duration::from_secs(15 * 60),
            jwt_refresh_expiry: Duration::from_secs(7 * 24 * 60 * 60),
            bcrypt_cost: 4,
            upload_dir: env::temp_dir().join("smartlearn-test-uploads"),
            cors_origins: vec!["http://localhost:3000".to_string()],
            rate_limit_window: Duration::from_secs(60),
            rate_limit_max: 100,
            login_limit_window: Duration::from_secs(60),
            login_limit_max: 5,
        }
    }
}

/// Parses `<n><s|m|h|d>` durations such as `15m` or `7d`.
/// Anything else falls back to fifteen minutes.
pub fn parse_expiry(value: &str) -> Duration {
    let value = value.trim();
    let Some((split, unit)) = value.char_indices().last() else {
        return DEFAULT_EXPIRY;
    };
    let Ok(amount) = value[..split].parse::<u64>() else {
        return DEFAULT_EXPIRY;
    };

    let seconds = match unit {
        's' => Some(amount),
        'm' => amount.checked_mul(60),
        'h' => amount.checked_mul(60 * 60),
        'd' => amount.checked_mul(24 * 60 * 60),
        _ => None,
    };
    seconds.map_or(DEFAULT_EXPIRY, Duration::from_secs)
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn split_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
