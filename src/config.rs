use std::env;

/// Process configuration, read once at startup and injected through
/// [`crate::state::AppState`]. Nothing reads the environment after boot.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub razorpay_key_id: String,
    pub razorpay_key_secret: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(5000);
        let jwt_secret = env::var("JWT_SECRET")?;
        let razorpay_key_id = env::var("RAZORPAY_KEY_ID")?;
        let razorpay_key_secret = env::var("RAZORPAY_KEY_SECRET")?;
        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            razorpay_key_id,
            razorpay_key_secret,
        })
    }
}
