use std::sync::Arc;

use redis::aio::ConnectionManager;
use sqlx::PgPool;

use crate::config::Config;
use crate::error::Result;
use crate::services::mailer::Mailer;
use crate::services::otp::{OtpStore, RedisOtpStore};
use crate::services::payment::PaymentGateway;
use crate::services::signer::KeySigner;
use crate::storage::{ObjectStore, S3Store};

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The database connection pool.
    pub db: PgPool,
    /// The Redis connection manager.
    pub redis: ConnectionManager,
    /// The private object-storage bucket.
    pub storage: Arc<dyn ObjectStore>,
    /// The object key signer.
    pub signer: KeySigner,
    /// Pending signup codes (TTL-evicted).
    pub otp: Arc<dyn OtpStore>,
    /// The transactional-email client.
    pub mailer: Mailer,
    /// The payment gateway client.
    pub payments: PaymentGateway,
    /// The application's configuration.
    pub config: Config,
}

impl AppState {
    /// Creates a new `AppState`.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`.
    pub async fn new(config: &Config) -> Result<Self> {
        let db = crate::db::create_pool(&config.database_url).await?;
        crate::db::init_schema(&db).await?;
        tracing::info!("✅ PostgreSQL pool initialized");

        let redis_client = redis::Client::open(config.redis_url.as_str())?;
        let redis = ConnectionManager::new(redis_client).await?;
        tracing::info!("✅ Redis Connection Manager initialized (pooled)");

        let storage: Arc<dyn ObjectStore> = Arc::new(S3Store::new(&config.storage).await?);
        let signer = KeySigner::new(storage.clone());

        let otp: Arc<dyn OtpStore> = Arc::new(RedisOtpStore::new(redis.clone()));

        let mailer = Mailer::new(config);
        if !mailer.is_live() {
            tracing::warn!("⚠️ BREVO_API_KEY is missing. Emails will NOT be sent (mock mode active).");
        }

        let payments = PaymentGateway::new(config);

        Ok(AppState {
            db,
            redis,
            storage,
            signer,
            otp,
            mailer,
            payments,
            config: config.clone(),
        })
    }
}
