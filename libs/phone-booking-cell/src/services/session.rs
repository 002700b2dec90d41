use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::models::{CallSession, SessionStoreError};

/// Call sessions keyed by the provider's call id.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, call_id: &str) -> Result<Option<CallSession>, SessionStoreError>;

    /// Stores the session and restarts its time-to-live.
    async fn put(&self, call_id: &str, session: &CallSession) -> Result<(), SessionStoreError>;

    async fn delete(&self, call_id: &str) -> Result<(), SessionStoreError>;

    /// Drops sessions whose time-to-live has passed; returns how many went.
    async fn expire(&self) -> Result<usize, SessionStoreError>;
}

pub type DynSessionStore = Arc<dyn SessionStore>;

// ==============================================================================
// IN-MEMORY STORE
// ==============================================================================

struct Entry {
    session: CallSession,
    expires_at: Instant,
}

pub struct InMemorySessionStore {
    ttl: Duration,
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, call_id: &str) -> Result<Option<CallSession>, SessionStoreError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(call_id)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.session.clone()))
    }

    async fn put(&self, call_id: &str, session: &CallSession) -> Result<(), SessionStoreError> {
        let entry = Entry {
            session: session.clone(),
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.write().await.insert(call_id.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, call_id: &str) -> Result<(), SessionStoreError> {
        self.entries.write().await.remove(call_id);
        Ok(())
    }

    async fn expire(&self) -> Result<usize, SessionStoreError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        Ok(before - entries.len())
    }
}

// ==============================================================================
// REDIS STORE
// ==============================================================================

const KEY_PREFIX: &str = "call_session:";

/// Sessions shared across API instances; Redis enforces the time-to-live.
pub struct RedisSessionStore {
    pool: Pool,
    ttl_seconds: u64,
}

impl RedisSessionStore {
    pub async fn new(redis_url: &str, ttl: Duration) -> Result<Self, SessionStoreError> {
        let pool = Config::from_url(redis_url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| SessionStoreError::Backend(format!("Failed to create Redis pool: {}", e)))?;

        let mut conn = pool.get().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!("Redis session store initialized");

        Ok(Self {
            pool,
            ttl_seconds: ttl.as_secs().max(1),
        })
    }

    fn key(call_id: &str) -> String {
        format!("{}{}", KEY_PREFIX, call_id)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn get(&self, call_id: &str) -> Result<Option<CallSession>, SessionStoreError> {
        let mut conn = self.pool.get().await?;
        let raw: Option<String> = conn.get(Self::key(call_id)).await?;
        raw.map(|data| serde_json::from_str(&data))
            .transpose()
            .map_err(SessionStoreError::from)
    }

    async fn put(&self, call_id: &str, session: &CallSession) -> Result<(), SessionStoreError> {
        let mut conn = self.pool.get().await?;
        let data = serde_json::to_string(session)?;
        let _: () = redis::cmd("SET")
            .arg(Self::key(call_id))
            .arg(data)
            .arg("EX")
            .arg(self.ttl_seconds)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete(&self, call_id: &str) -> Result<(), SessionStoreError> {
        let mut conn = self.pool.get().await?;
        let _: () = conn.del(Self::key(call_id)).await?;
        Ok(())
    }

    async fn expire(&self) -> Result<usize, SessionStoreError> {
        Ok(0)
    }
}

/// Periodically reclaims abandoned sessions.
pub fn spawn_session_sweeper(store: DynSessionStore, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            match store.expire().await {
                Ok(0) => {}
                Ok(removed) => debug!("Expired {} abandoned call sessions", removed),
                Err(e) => warn!("Call session sweep failed: {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn put_get_delete() {
        let store = InMemorySessionStore::new(Duration::from_secs(60));
        let session = CallSession::for_user(Uuid::new_v4());

        store.put("CA1", &session).await.unwrap();
        assert_eq!(store.get("CA1").await.unwrap(), Some(session));

        store.delete("CA1").await.unwrap();
        assert_eq!(store.get("CA1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn sessions_expire_after_ttl() {
        let store = InMemorySessionStore::new(Duration::from_millis(30));
        store.put("CA1", &CallSession::default()).await.unwrap();
        store.put("CA2", &CallSession::default()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(store.get("CA1").await.unwrap(), None);

        // Refreshing restarts the clock.
        store.put("CA2", &CallSession::default()).await.unwrap();
        assert_eq!(store.expire().await.unwrap(), 1);
        assert_eq!(store.len().await, 1);
        assert!(store.get("CA2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn sweeper_reclaims_abandoned_calls() {
        let store = Arc::new(InMemorySessionStore::new(Duration::from_millis(20)));
        store.put("CA1", &CallSession::default()).await.unwrap();

        let sweeper = spawn_session_sweeper(store.clone(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(80)).await;
        sweeper.abort();

        assert_eq!(store.len().await, 0);
    }
}
