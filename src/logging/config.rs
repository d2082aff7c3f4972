use std::path::PathBuf;

/// Where and how verbosely to log. Read straight from the environment since
/// logging is up before the rest of the configuration is parsed.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub is_production: bool,
    pub level: String,
    pub dir: PathBuf,
}

impl LogConfig {
    pub fn from_env() -> Self {
        let environment =
            std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let is_production = environment == "production";

        let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| {
            if is_production {
                "info".to_string()
            } else {
                "debug".to_string()
            }
        });

        Self {
            is_production,
            level,
            dir: PathBuf::from(std::env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string())),
        }
    }

    /// Default `EnvFilter` directive when `RUST_LOG` is not set.
    pub fn filter_directive(&self) -> String {
        format!(
            "portfolio_showcase={},tower_http=info,axum=info,sqlx=warn",
            self.level
        )
    }
}
