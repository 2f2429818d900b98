use secrecy::Secret;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,

    // Transactional email provider API
    pub email_api_url: String,
    pub email_api_key: Secret<String>,
    pub email_from: String,
    pub email_reply_to: Option<String>,

    // Shown in email templates
    pub school_name: String,

    // Days before due_date that a reminder goes out
    pub reminder_lead_days: i64,

    // Recurring sweep + notification scan interval
    pub scan_interval_minutes: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for local development)
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .build()?;

        Ok(Self {
            database_url: config.get("database_url")?,
            host: config.get("host").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: config.get("port")?,

            email_api_url: config.get("email_api_url")?,
            email_api_key: Secret::new(config.get("email_api_key")?),
            email_from: config.get("email_from")?,
            email_reply_to: config.get("email_reply_to").ok(),

            school_name: config
                .get("school_name")
                .unwrap_or_else(|_| "School".to_string()),

            reminder_lead_days: config.get("reminder_lead_days").unwrap_or(3),
            scan_interval_minutes: config.get("scan_interval_minutes").unwrap_or(30),
        })
    }
}
