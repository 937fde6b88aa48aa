use std::time::Duration;

use moka::future::Cache;

/// Refresh tokens that are still redeemable, keyed by jti.
///
/// The TTL matches the refresh token lifetime. Rotation and logout remove
/// the entry early.
#[derive(Clone)]
pub struct RefreshRegistry {
    live: Cache<String, String>,
}

impl RefreshRegistry {
    pub fn new(ttl_secs: usize) -> Self {
        Self {
            live: Cache::builder()
                .max_capacity(100_000) // tune based on memory
                .time_to_live(Duration::from_secs(ttl_secs as u64))
                .build(),
        }
    }

    pub async fn issue(&self, jti: &str, username: &str) {
        self.live.insert(jti.to_string(), username.to_string()).await;
    }

    /// Removes the token and reports whether it was live.
    pub async fn redeem(&self, jti: &str) -> bool {
        self.live.remove(jti).await.is_some()
    }

    pub async fn revoke(&self, jti: &str) {
        self.live.invalidate(jti).await;
    }
}
