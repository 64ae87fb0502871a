//! Cookie sessions with sliding expiry, persisted in a shared key/value
//! store so every server process sees the same sessions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use redis::{aio::ConnectionManager, Client};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use service_core::error::{AppError, UNAUTHORIZED_MESSAGE};

use super::Clock;
use crate::config::{RedisConfig, SessionConfig};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no session")]
    Missing,

    #[error("session expired")]
    Expired,

    #[error("session store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Missing | SessionError::Expired => {
                AppError::unauthorized(UNAUTHORIZED_MESSAGE)
            }
            SessionError::Store(e) => AppError::InternalError(e),
        }
    }
}

/// Persisted session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Key/value store with per-key TTL.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn put(&self, token: &str, record: &SessionRecord, ttl_seconds: i64)
        -> Result<(), anyhow::Error>;
    async fn get(&self, token: &str) -> Result<Option<SessionRecord>, anyhow::Error>;
    async fn remove(&self, token: &str) -> Result<(), anyhow::Error>;
    async fn health_check(&self) -> Result<(), anyhow::Error>;
}

fn session_key(token: &str) -> String {
    format!("session:{}", token)
}

#[derive(Clone)]
pub struct RedisSessionStore {
    _client: Client,
    manager: ConnectionManager,
}

impl RedisSessionStore {
    pub async fn new(config: &RedisConfig) -> Result<Self, anyhow::Error> {
        tracing::info!("Connecting to Redis");
        let client = Client::open(config.url.clone())?;

        let manager = client.get_connection_manager().await.map_err(|e| {
            tracing::error!("Failed to get Redis connection manager: {}", e);
            anyhow::anyhow!("Failed to connect to Redis: {}", e)
        })?;

        tracing::info!("Successfully connected to Redis");

        Ok(Self {
            _client: client,
            manager,
        })
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn put(
        &self,
        token: &str,
        record: &SessionRecord,
        ttl_seconds: i64,
    ) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        let value = serde_json::to_string(record)?;

        redis::cmd("SET")
            .arg(session_key(token))
            .arg(value)
            .arg("EX")
            .arg(ttl_seconds.max(1))
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to store session: {}", e))
    }

    async fn get(&self, token: &str) -> Result<Option<SessionRecord>, anyhow::Error> {
        let mut conn = self.manager.clone();
        let value: Option<String> = redis::cmd("GET")
            .arg(session_key(token))
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read session: {}", e))?;

        value
            .map(|v| serde_json::from_str(&v).map_err(anyhow::Error::from))
            .transpose()
    }

    async fn remove(&self, token: &str) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        redis::cmd("DEL")
            .arg(session_key(token))
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to delete session: {}", e))
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Redis health check failed: {}", e))
    }
}

/// In-process session store. Expiry is left to [`SessionManager`].
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(
        &self,
        token: &str,
        record: &SessionRecord,
        _ttl_seconds: i64,
    ) -> Result<(), anyhow::Error> {
        self.sessions
            .lock()
            .map_err(|_| anyhow::anyhow!("session map poisoned"))?
            .insert(token.to_string(), record.clone());
        Ok(())
    }

    async fn get(&self, token: &str) -> Result<Option<SessionRecord>, anyhow::Error> {
        Ok(self
            .sessions
            .lock()
            .map_err(|_| anyhow::anyhow!("session map poisoned"))?
            .get(token)
            .cloned())
    }

    async fn remove(&self, token: &str) -> Result<(), anyhow::Error> {
        self.sessions
            .lock()
            .map_err(|_| anyhow::anyhow!("session map poisoned"))?
            .remove(token);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        Ok(())
    }
}

/// Issues, loads, refreshes and destroys sessions.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>, config: SessionConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    fn ttl(&self) -> Duration {
        Duration::seconds(self.config.ttl_seconds)
    }

    /// 256-bit random token, hex encoded.
    fn generate_token() -> String {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    pub async fn create(&self, user_id: Uuid) -> Result<Session, SessionError> {
        let token = Self::generate_token();
        let session = self.store_session(token, user_id).await?;
        tracing::info!(%user_id, "Session created");
        Ok(session)
    }

    /// Reads the session named by the request's cookie.
    pub async fn load(&self, jar: &CookieJar) -> Result<Session, SessionError> {
        let token = jar
            .get(&self.config.cookie_name)
            .map(|c| c.value().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(SessionError::Missing)?;

        self.load_token(&token).await
    }

    pub async fn load_token(&self, token: &str) -> Result<Session, SessionError> {
        let record = self.store.get(token).await?.ok_or(SessionError::Missing)?;

        if record.expires_at <= self.clock.now() {
            self.store.remove(token).await?;
            return Err(SessionError::Expired);
        }

        Ok(Session {
            token: token.to_string(),
            user_id: record.user_id,
            expires_at: record.expires_at,
        })
    }

    /// Slides expiry to now + TTL.
    pub async fn refresh(&self, session: &Session) -> Result<Session, SessionError> {
        self.store_session(session.token.clone(), session.user_id).await
    }

    /// Idempotent.
    pub async fn destroy(&self, token: &str) -> Result<(), SessionError> {
        self.store.remove(token).await?;
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), anyhow::Error> {
        self.store.health_check().await
    }

    async fn store_session(&self, token: String, user_id: Uuid) -> Result<Session, SessionError> {
        let record = SessionRecord {
            user_id,
            expires_at: self.clock.now() + self.ttl(),
        };
        self.store
            .put(&token, &record, self.config.ttl_seconds)
            .await?;

        Ok(Session {
            token,
            user_id,
            expires_at: record.expires_at,
        })
    }

    /// Cookie carrying `session`'s token.
    pub fn cookie(&self, session: &Session) -> Cookie<'static> {
        self.build_cookie(session.token.clone(), self.config.ttl_seconds)
    }

    /// Cookie that clears the session cookie in the browser.
    pub fn removal_cookie(&self) -> Cookie<'static> {
        self.build_cookie(String::new(), 0)
    }

    fn build_cookie(&self, value: String, max_age_seconds: i64) -> Cookie<'static> {
        let mut builder = Cookie::build((self.config.cookie_name.clone(), value))
            .path("/")
            .http_only(false)
            .secure(self.config.cookie_secure)
            .same_site(SameSite::Strict)
            .max_age(time::Duration::seconds(max_age_seconds));

        if let Some(domain) = &self.config.cookie_domain {
            builder = builder.domain(domain.clone());
        }

        builder.build()
    }
}
