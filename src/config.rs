// Application configuration, loaded from environment variables (and `.env`).

use crate::services::EngineConfig;

#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite connection string.
    pub database_url: String,
    /// Port to bind the HTTP server to.
    pub port: u16,
    pub engine: EngineConfig,
}

impl Config {
    /// Environment variables:
    /// - `DATABASE_URL` (default: `sqlite:../data/pelada.db`)
    /// - `PORT` (default: 3000)
    /// - `STRICT_POSITION_MATCH` - only rate matches played in the current position
    /// - `COUNT_SHOOTOUT_WINS` - shootout victories count as wins for VIT
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:../data/pelada.db".to_string());

        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        let engine = EngineConfig {
            strict_position_match: env_flag("STRICT_POSITION_MATCH"),
            count_shootout_wins: env_flag("COUNT_SHOOTOUT_WINS"),
        };

        Config {
            database_url,
            port,
            engine,
        }
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name).map(|v| parse_flag(&v)).unwrap_or(false)
}

fn parse_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}
