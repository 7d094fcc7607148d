use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;

const DEFAULT_HISTORY_LIMIT: usize = 100;
const MAX_HISTORY_LIMIT: usize = 1000;

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub users_file: PathBuf,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    /// Page size used by history requests that do not pass `limit`
    pub history_limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, crate::error::AppError> {
        dotenv().ok();

        let data_dir = PathBuf::from(env::var("CHAT_DATA_DIR").unwrap_or_else(|_| "data".into()));
        let users_file = env::var("USERS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("users.json"));

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| crate::error::AppError::Config("JWT_SECRET missing".into()))?;
        if jwt_secret.trim().is_empty() {
            return Err(crate::error::AppError::Config("JWT_SECRET is empty".into()));
        }

        let host = env::var("BIND_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = match env::var("PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| crate::error::AppError::Config(format!("invalid PORT: {raw}")))?,
            Err(_) => 8000,
        };

        let history_limit = env::var("CHAT_HISTORY_LIMIT")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .map(Self::clamp_history_limit)
            .unwrap_or(DEFAULT_HISTORY_LIMIT);

        Ok(Self {
            data_dir,
            users_file,
            jwt_secret,
            host,
            port,
            history_limit,
        })
    }

    /// Clamp a caller-supplied history limit into `1..=MAX_HISTORY_LIMIT`.
    pub fn clamp_history_limit(limit: usize) -> usize {
        limit.clamp(1, MAX_HISTORY_LIMIT)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
