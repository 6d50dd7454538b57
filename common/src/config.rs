use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::{env, fs};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    pub oracle_endpoint: String,
    pub oracle_api_key: String,
    pub oracle_timeout_secs: u64,
    pub smtp_host: String,
    pub smtp_username: String,
    pub smtp_password: String,
    pub email_from_name: String,
}

static CONFIG: OnceCell<Config> = OnceCell::new();

impl Config {
    pub fn init(env_path: &str) -> &'static Self {
        dotenvy::from_filename(env_path).ok();

        CONFIG.get_or_init(|| {
            let project_name = env::var("PROJECT_NAME").unwrap_or_else(|_| "gradebook".into());
            let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "debug".into());
            let log_file = env::var("LOG_FILE").unwrap_or_else(|_| "logs/gradebook.log".into());

            if let Some(parent) = std::path::Path::new(&log_file).parent() {
                fs::create_dir_all(parent).expect("Failed to create log directory");
            }

            let oracle_endpoint = env::var("ORACLE_ENDPOINT").expect("ORACLE_ENDPOINT must be set");
            let oracle_api_key = env::var("ORACLE_API_KEY").expect("ORACLE_API_KEY must be set");
            let oracle_timeout_secs = env::var("ORACLE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30);

            let smtp_host = env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".into());
            let smtp_username = env::var("SMTP_USERNAME").expect("SMTP_USERNAME must be set");
            let smtp_password = env::var("SMTP_PASSWORD").expect("SMTP_PASSWORD must be set");
            let email_from_name =
                env::var("EMAIL_FROM_NAME").unwrap_or_else(|_| "Gradebook".into());

            Config {
                project_name,
                log_level,
                log_file,
                oracle_endpoint,
                oracle_api_key,
                oracle_timeout_secs,
                smtp_host,
                smtp_username,
                smtp_password,
                email_from_name,
            }
        })
    }

    pub fn get() -> &'static Self {
        CONFIG.get().expect("Config not initialized")
    }
}
