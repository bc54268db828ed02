use std::time::Duration;

use async_trait::async_trait;
use rand::{rngs::OsRng, TryRngCore};
use redis::AsyncCommands;

use crate::error::{AppError, Result};

/// Message returned for every verification failure. Deliberately conflates
/// "wrong code" and "expired" so the endpoint does not reveal which.
pub const OTP_REJECTED: &str = "Invalid or expired OTP";

/// Store for pending signup codes, keyed by email. At most one unconsumed
/// code exists per email: `put` is an atomic overwrite (last-write-wins), so
/// re-initiating signup invalidates the prior code in the same operation.
/// Expiry is enforced entirely by the store's TTL eviction.
#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Upsert the pending code for an email with the given TTL.
    async fn put(&self, email: &str, code: &str, ttl: Duration) -> Result<()>;

    /// Fetch the pending, unexpired code for an email.
    async fn fetch(&self, email: &str) -> Result<Option<String>>;

    /// Remove the pending code for an email.
    async fn delete(&self, email: &str) -> Result<()>;
}

/// `OtpStore` backed by Redis. `SET .. EX` is a single atomic command, so
/// concurrent initiations for the same email converge to the newest code.
#[derive(Clone)]
pub struct RedisOtpStore {
    redis: redis::aio::ConnectionManager,
}

impl RedisOtpStore {
    pub fn new(redis: redis::aio::ConnectionManager) -> Self {
        Self { redis }
    }

    fn key(email: &str) -> String {
        format!("otp:{}", email.to_lowercase())
    }
}

#[async_trait]
impl OtpStore for RedisOtpStore {
    async fn put(&self, email: &str, code: &str, ttl: Duration) -> Result<()> {
        let mut redis = self.redis.clone();
        let _: () = redis
            .set_ex(Self::key(email), code, ttl.as_secs())
            .await
            .map_err(AppError::Redis)?;
        Ok(())
    }

    async fn fetch(&self, email: &str) -> Result<Option<String>> {
        let mut redis = self.redis.clone();
        let code: Option<String> = redis.get(Self::key(email)).await.map_err(AppError::Redis)?;
        Ok(code)
    }

    async fn delete(&self, email: &str) -> Result<()> {
        let mut redis = self.redis.clone();
        let _: () = redis.del(Self::key(email)).await.map_err(AppError::Redis)?;
        Ok(())
    }
}

/// Generates a 4-digit numeric code (1000..=9999). The narrow space is
/// mitigated by the short TTL and single-use consumption.
pub fn generate_code() -> Result<String> {
    // Rejection sampling: a plain modulo would skew the low codes because
    // 2^32 is not a multiple of 9000.
    const RANGE: u32 = 9000;
    const LIMIT: u32 = u32::MAX - u32::MAX % RANGE;

    loop {
        let mut bytes = [0u8; 4];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| AppError::Internal(format!("Failed to generate OTP: {}", e)))?;

        let n = u32::from_le_bytes(bytes);
        if n < LIMIT {
            return Ok((n % RANGE + 1000).to_string());
        }
    }
}

/// Creates (or replaces) the pending code for an email and returns it.
///
/// # Arguments
///
/// * `store` - The OTP store.
/// * `email` - The address being verified.
/// * `ttl` - The code's validity window.
pub async fn initiate(store: &dyn OtpStore, email: &str, ttl: Duration) -> Result<String> {
    let code = generate_code()?;
    store.put(email, &code, ttl).await?;
    Ok(code)
}

/// Consumes the pending code for an email. Succeeds only if a matching,
/// unexpired record exists; success deletes the record, so a code can never
/// be used twice.
///
/// # Arguments
///
/// * `store` - The OTP store.
/// * `email` - The address being verified.
/// * `code` - The code the client submitted.
pub async fn verify(store: &dyn OtpStore, email: &str, code: &str) -> Result<()> {
    let pending = store.fetch(email).await?;

    match pending {
        Some(expected) if expected == code => {
            store.delete(email).await?;
            tracing::info!("✅ OTP verified for {}", email);
            Ok(())
        }
        _ => Err(AppError::Validation(OTP_REJECTED.to_string())),
    }
}

#[cfg(test)]
pub mod memory {
    //! In-memory `OtpStore` for unit tests, with explicit expiry instants.

    use std::collections::HashMap;
    use std::time::Instant;

    use tokio::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct MemoryOtpStore {
        records: Mutex<HashMap<String, (String, Instant)>>,
    }

    impl MemoryOtpStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Force the pending record for an email past its TTL.
        pub async fn expire(&self, email: &str) {
            let mut records = self.records.lock().await;
            if let Some((_, deadline)) = records.get_mut(email) {
                *deadline = Instant::now() - Duration::from_secs(1);
            }
        }
    }

    #[async_trait]
    impl OtpStore for MemoryOtpStore {
        async fn put(&self, email: &str, code: &str, ttl: Duration) -> Result<()> {
            self.records
                .lock()
                .await
                .insert(email.to_string(), (code.to_string(), Instant::now() + ttl));
            Ok(())
        }

        async fn fetch(&self, email: &str) -> Result<Option<String>> {
            let records = self.records.lock().await;
            Ok(records
                .get(email)
                .filter(|(_, deadline)| *deadline > Instant::now())
                .map(|(code, _)| code.clone()))
        }

        async fn delete(&self, email: &str) -> Result<()> {
            self.records.lock().await.remove(email);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryOtpStore;
    use super::*;

    const TTL: Duration = Duration::from_secs(300);

    #[test]
    fn generated_codes_are_four_digits() {
        for _ in 0..256 {
            let code = generate_code().unwrap();
            assert_eq!(code.len(), 4);
            let n: u32 = code.parse().unwrap();
            assert!((1000..=9999).contains(&n));
        }
    }

    #[tokio::test]
    async fn verify_is_single_use() {
        let store = MemoryOtpStore::new();
        let code = initiate(&store, "a@x.com", TTL).await.unwrap();

        verify(&store, "a@x.com", &code).await.unwrap();

        // Consumed by deletion: the same code must now be rejected.
        let err = verify(&store, "a@x.com", &code).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == OTP_REJECTED));
    }

    #[tokio::test]
    async fn reinitiate_leaves_only_the_newest_code_valid() {
        let store = MemoryOtpStore::new();
        let first = initiate(&store, "a@x.com", TTL).await.unwrap();
        let second = initiate(&store, "a@x.com", TTL).await.unwrap();

        if first != second {
            let err = verify(&store, "a@x.com", &first).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
        verify(&store, "a@x.com", &second).await.unwrap();
    }

    #[tokio::test]
    async fn wrong_code_is_rejected_and_does_not_consume() {
        let store = MemoryOtpStore::new();
        let code = initiate(&store, "a@x.com", TTL).await.unwrap();
        let wrong = if code == "1234" { "4321" } else { "1234" };

        let err = verify(&store, "a@x.com", wrong).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == OTP_REJECTED));

        // The pending record survives a failed attempt.
        verify(&store, "a@x.com", &code).await.unwrap();
    }

    #[tokio::test]
    async fn expired_code_is_rejected_with_the_same_message() {
        let store = MemoryOtpStore::new();
        let code = initiate(&store, "a@x.com", TTL).await.unwrap();
        store.expire("a@x.com").await;

        let err = verify(&store, "a@x.com", &code).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == OTP_REJECTED));
    }
}
