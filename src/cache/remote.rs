//! Redis Store Module
//!
//! Remote backend. Every call either returns a value or an explicit
//! `Unavailable`/`Timeout` error; nothing here blocks a request for longer
//! than the configured timeouts.

use std::future::Future;
use std::time::Instant;

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisResult};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::cache::{validate_entry, CacheTier};
use crate::config::RedisConfig;
use crate::error::{CacheError, Result};

#[derive(Default)]
struct Connection {
    manager: Option<ConnectionManager>,
    last_attempt: Option<Instant>,
}

// == Redis Store ==
/// Redis-backed store. Keys are written as `{prefix}{tier}:{key}`.
///
/// The connection is opened lazily. Once open, `ConnectionManager`
/// reconnects on its own after the server comes back; if the first connect
/// fails, a new attempt is made at most once per `reconnect_interval`.
pub struct RedisStore {
    client: Client,
    config: RedisConfig,
    connection: Mutex<Connection>,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("prefix", &self.config.prefix)
            .finish_non_exhaustive()
    }
}

impl RedisStore {
    // == Constructor ==
    /// Parses the connection string without connecting.
    ///
    /// A malformed URL is a startup error; an unreachable server is not.
    pub fn new(config: RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| CacheError::Config(format!("invalid REDIS_URL: {e}")))?;

        Ok(Self {
            client,
            config,
            connection: Mutex::new(Connection::default()),
        })
    }

    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    async fn connection(&self) -> Result<ConnectionManager> {
        let mut state = self.connection.lock().await;
        if let Some(manager) = &state.manager {
            return Ok(manager.clone());
        }

        if let Some(last) = state.last_attempt {
            if last.elapsed() < self.config.reconnect_interval {
                return Err(CacheError::Unavailable(
                    "waiting before next reconnect attempt".into(),
                ));
            }
        }
        state.last_attempt = Some(Instant::now());

        match timeout(
            self.config.connect_timeout,
            ConnectionManager::new(self.client.clone()),
        )
        .await
        {
            Ok(Ok(manager)) => {
                info!(prefix = %self.config.prefix, "Connected to Redis");
                state.manager = Some(manager.clone());
                Ok(manager)
            }
            Ok(Err(err)) => {
                warn!(error = %err, "Redis connection failed");
                Err(err.into())
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.config.connect_timeout.as_millis() as u64,
                    "Redis connection timed out"
                );
                Err(CacheError::Timeout("connect"))
            }
        }
    }

    /// Runs one command with the operation timeout applied.
    async fn run<T, F, Fut>(&self, op: &'static str, command: F) -> Result<T>
    where
        F: FnOnce(ConnectionManager) -> Fut,
        Fut: Future<Output = RedisResult<T>>,
    {
        let conn = self.connection().await?;
        match timeout(self.config.operation_timeout, command(conn)).await {
            Ok(result) => result.map_err(CacheError::from),
            Err(_) => Err(CacheError::Timeout(op)),
        }
    }

    fn tier_prefix(&self, tier: CacheTier) -> String {
        format!("{}{}:", self.config.prefix, tier.name())
    }

    fn full_key(&self, tier: CacheTier, key: &str) -> String {
        format!("{}{}", self.tier_prefix(tier), key)
    }

    // == Get ==
    pub async fn get(&self, tier: CacheTier, key: &str) -> Result<Option<String>> {
        let full = self.full_key(tier, key);
        self.run("get", move |mut conn| async move {
            let value: Option<String> = conn.get(&full).await?;
            Ok(value)
        })
        .await
    }

    // == Set ==
    /// Writes with `SET .. EX`, replacing any previous value and TTL.
    pub async fn set(&self, tier: CacheTier, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        validate_entry(key, value, ttl_seconds)?;

        let full = self.full_key(tier, key);
        let value = value.to_string();
        self.run("set", move |mut conn| async move {
            conn.set_ex::<_, _, ()>(&full, value, ttl_seconds).await
        })
        .await
    }

    // == Delete ==
    pub async fn delete(&self, tier: CacheTier, key: &str) -> Result<bool> {
        let full = self.full_key(tier, key);
        self.run("delete", move |mut conn| async move {
            let removed: i64 = conn.del(&full).await?;
            Ok(removed > 0)
        })
        .await
    }

    // == List Keys ==
    /// Lists keys of a tier containing `pattern`, without the Redis prefix.
    ///
    /// Walks the keyspace with `SCAN MATCH` so the server is never blocked.
    pub async fn list_keys(&self, tier: CacheTier, pattern: Option<&str>) -> Result<Vec<String>> {
        let prefix = self.tier_prefix(tier);
        let glob = match pattern {
            Some(p) => format!("{}*{}*", escape_glob(&prefix), escape_glob(p)),
            None => format!("{}*", escape_glob(&prefix)),
        };

        let keys = self
            .run("list_keys", move |mut conn| async move {
                let mut iter = conn.scan_match::<_, String>(&glob).await?;
                let mut keys = Vec::new();
                while let Some(key) = iter.next_item().await {
                    keys.push(key);
                }
                Ok(keys)
            })
            .await?;

        Ok(keys
            .into_iter()
            .filter_map(|k| k.strip_prefix(&prefix).map(str::to_string))
            .collect())
    }

    // == Clear ==
    /// Deletes every key of a tier written by this store.
    pub async fn clear(&self, tier: CacheTier) -> Result<usize> {
        let keys: Vec<String> = self
            .list_keys(tier, None)
            .await?
            .iter()
            .map(|k| self.full_key(tier, k))
            .collect();

        if keys.is_empty() {
            return Ok(0);
        }

        self.run("clear", move |mut conn| async move {
            let removed: i64 = conn.del(&keys).await?;
            Ok(removed.max(0) as usize)
        })
        .await
    }
}

/// Escapes Redis glob metacharacters so a pattern matches literally.
fn escape_glob(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::TcpListener;

    /// Nothing listens on port 1, so every connect is refused.
    fn unreachable_store() -> RedisStore {
        let mut config = RedisConfig::new("redis://127.0.0.1:1");
        config.connect_timeout = Duration::from_millis(200);
        config.operation_timeout = Duration::from_millis(200);
        config.reconnect_interval = Duration::from_secs(60);
        RedisStore::new(config).unwrap()
    }

    #[test]
    fn test_invalid_url_is_config_error() {
        let result = RedisStore::new(RedisConfig::new("not a url"));
        assert!(matches!(result, Err(CacheError::Config(_))));
    }

    #[test]
    fn test_full_key_layout() {
        let store = unreachable_store();
        assert_eq!(
            store.full_key(CacheTier::Medium, "api:GET:/api/dishes"),
            "response-cache:medium:api:GET:/api/dishes"
        );
    }

    #[test]
    fn test_escape_glob() {
        assert_eq!(escape_glob("user:1"), "user:1");
        assert_eq!(escape_glob("a*b?[c]\\"), "a\\*b\\?\\[c\\]\\\\");
    }

    #[tokio::test]
    async fn test_unreachable_server_reports_unavailable() {
        let store = unreachable_store();

        let result = store.get(CacheTier::Short, "k").await;
        assert!(result.unwrap_err().is_unavailable());

        // Second call hits the reconnect back-off and fails fast
        let result = store.set(CacheTier::Short, "k", "[]", 60).await;
        assert!(result.unwrap_err().is_unavailable());

        let result = store.list_keys(CacheTier::Short, Some("dishes")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        // Accepts connections and never answers
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let mut config = RedisConfig::new(format!("redis://127.0.0.1:{port}"));
        config.connect_timeout = Duration::from_millis(300);
        config.operation_timeout = Duration::from_millis(300);
        let store = RedisStore::new(config).unwrap();

        let started = Instant::now();
        let result = store.get(CacheTier::Short, "k").await;

        assert!(matches!(result, Err(CacheError::Timeout(_))));
        assert!(started.elapsed() < Duration::from_secs(2));
        server.abort();
    }

    #[tokio::test]
    async fn test_reconnects_after_back_off() {
        // Reserve a free port, then release it so the first connect is refused
        let port = {
            let reserved = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            reserved.local_addr().unwrap().port()
        };

        let mut config = RedisConfig::new(format!("redis://127.0.0.1:{port}"));
        config.connect_timeout = Duration::from_millis(300);
        config.operation_timeout = Duration::from_millis(300);
        config.reconnect_interval = Duration::from_millis(200);
        let store = RedisStore::new(config).unwrap();

        assert!(store.get(CacheTier::Short, "k").await.unwrap_err().is_unavailable());

        let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let server = {
            let accepted = accepted.clone();
            tokio::spawn(async move {
                let mut held = Vec::new();
                while let Ok((socket, _)) = listener.accept().await {
                    accepted.fetch_add(1, Ordering::SeqCst);
                    held.push(socket);
                }
            })
        };

        tokio::time::sleep(Duration::from_millis(300)).await;

        // The server never answers, so the call itself still fails
        let _ = store.get(CacheTier::Short, "k").await;
        assert!(accepted.load(Ordering::SeqCst) >= 1);
        server.abort();
    }

    #[tokio::test]
    async fn test_validation_runs_before_connecting() {
        let store = unreachable_store();

        let result = store.set(CacheTier::Short, "k", "[]", 0).await;
        assert!(matches!(result, Err(CacheError::InvalidTtl(0))));
    }
}
