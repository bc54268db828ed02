use std::env;
use anyhow::{Context, Result};
use zeroize::Zeroizing;

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The URL of the PostgreSQL database.
    pub database_url: String,
    /// The URL of the Redis server.
    pub redis_url: String,
    /// The secret used to sign session tokens.
    pub jwt_secret: Zeroizing<String>,
    /// The validity of a session token in days.
    pub session_ttl_days: i64,
    /// The time-to-live of a signup OTP in seconds.
    pub otp_ttl_secs: u64,
    /// Object storage (S3-compatible) settings.
    pub storage: StorageConfig,
    /// The Brevo API key. Absent -> mock mail mode, OTPs are logged.
    pub brevo_api_key: Option<Zeroizing<String>>,
    /// The verified sender address for transactional email.
    pub sender_email: String,
    /// The Razorpay key id.
    pub razorpay_key_id: String,
    /// The Razorpay key secret (signs payment confirmations).
    pub razorpay_key_secret: Zeroizing<String>,
    /// Email that is promoted to the admin role on signup.
    pub admin_email: Option<String>,
    /// The port to listen on.
    pub port: u16,
}

/// Connection settings for the private object-storage bucket.
#[derive(Clone)]
pub struct StorageConfig {
    /// Endpoint override (e.g. a Cloudflare R2 account endpoint).
    pub endpoint: Option<String>,
    /// The bucket region. R2 uses "auto".
    pub region: String,
    /// The access key id.
    pub access_key_id: String,
    /// The secret access key.
    pub secret_access_key: Zeroizing<String>,
    /// The bucket holding video and PDF binaries.
    pub bucket: String,
}

impl Config {
    /// The OTP validity window as a `Duration`.
    pub fn otp_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.otp_ttl_secs)
    }

    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters");
        }

        let storage = StorageConfig {
            endpoint: env::var("S3_ENDPOINT").ok(),
            region: env::var("S3_REGION").unwrap_or_else(|_| "auto".to_string()),
            access_key_id: env::var("S3_ACCESS_KEY_ID")
                .context("S3_ACCESS_KEY_ID must be set")?,
            secret_access_key: Zeroizing::new(
                env::var("S3_SECRET_ACCESS_KEY").context("S3_SECRET_ACCESS_KEY must be set")?,
            ),
            bucket: env::var("S3_BUCKET").context("S3_BUCKET must be set")?,
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .context("DATABASE_URL must be set")?,
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            jwt_secret: Zeroizing::new(jwt_secret),
            session_ttl_days: env::var("SESSION_TTL_DAYS")
                .unwrap_or_else(|_| "7".to_string())
                .parse()
                .context("Invalid SESSION_TTL_DAYS")?,
            otp_ttl_secs: env::var("OTP_TTL_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .context("Invalid OTP_TTL_SECS")?,
            storage,
            brevo_api_key: env::var("BREVO_API_KEY").ok().map(Zeroizing::new),
            sender_email: env::var("SENDER_EMAIL")
                .unwrap_or_else(|_| "noreply@coursedeck.app".to_string()),
            razorpay_key_id: env::var("RAZORPAY_KEY_ID")
                .unwrap_or_else(|_| "test_key".to_string()),
            razorpay_key_secret: Zeroizing::new(
                env::var("RAZORPAY_KEY_SECRET").unwrap_or_else(|_| "test_secret".to_string()),
            ),
            admin_email: env::var("ADMIN_EMAIL").ok(),
            port: env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .context("Invalid PORT")?,
        })
    }
}
