use std::path::PathBuf;

/// Process configuration, read once at startup. A `.env` file is honored.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub secret_key: String,
    pub bind_addr: String,
    pub media_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: dotenv::var("DATABASE_URL")?,
            secret_key: dotenv::var("SECRET_KEY")?,
            bind_addr: dotenv::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_owned()),
            media_dir: dotenv::var("MEDIA_DIR").unwrap_or_else(|_| "media".to_owned()).into(),
        })
    }
}
