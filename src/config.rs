//! Process configuration, read once at startup from the environment.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_STATIC_DIR: &str = "static/build";

#[derive(Debug, Clone)]
pub struct Config {
    /// Port to bind on all interfaces.
    pub port: u16,
    /// Directory holding the prebuilt frontend bundle.
    pub static_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env_or("PORT", DEFAULT_PORT),
            static_dir: env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_STATIC_DIR)),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
