use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use tracing::{info, warn};

pub struct Config {
    pub port: u16,
    pub redis_url: String,
    /// Plaintext admin password. Absence is a request-time
    /// `Configuration` error on login, distinct from a wrong password.
    pub admin_password: Option<String>,
    /// HMAC secret for signing admin tokens. Absence is a request-time
    /// `Configuration` error on any privileged request.
    pub token_secret: Option<String>,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("RUST_PORT", "1111"),
            redis_url: try_load("REDIS_URL", "redis://127.0.0.1:6379"),
            admin_password: try_secret("ADMIN_PASSWORD"),
            token_secret: try_secret("TOKEN_SECRET"),
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}

/// Secrets come from the environment, or from a mounted secrets file when
/// deployed under swarm. A missing secret is not fatal at startup: the
/// affected endpoints report a configuration error instead.
fn try_secret(secret_name: &str) -> Option<String> {
    if let Ok(value) = env::var(secret_name) {
        return Some(value);
    }

    let path = format!("/run/secrets/{secret_name}");
    match read_to_string(&path) {
        Ok(s) => Some(s.trim().to_string()),
        Err(_) => {
            warn!("Secret {secret_name} not set; dependent endpoints will refuse requests");
            None
        }
    }
}
