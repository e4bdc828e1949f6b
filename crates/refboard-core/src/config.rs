use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub store_path: String,
    pub app_url: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            store_path: env::var("STORE_PATH")
                .unwrap_or_else(|_| "./data/refboard.db".to_string()),
            app_url: env::var("APP_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        }
    }
}
