use std::{
    collections::HashSet,
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use redis::{Commands, Connection, RedisResult};

use crate::{Error, ExternalStore, Result};

/// Configuration for [`RedisStore`].
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    url: String,
    timeout: Duration,
}

impl RedisStoreConfig {
    /// Default connect, read, and write timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(250);

    /// Create a default configuration for the server at `url`.
    ///
    /// ```
    /// # use rollout::RedisStoreConfig;
    /// RedisStoreConfig::from_url("redis://localhost:6379");
    /// ```
    pub fn from_url(url: impl Into<String>) -> Self {
        RedisStoreConfig {
            url: url.into(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Override the I/O timeout. A read that times out is treated as absent.
    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = timeout;
        self
    }

    /// Create a new [`RedisStore`]. No connection is made until the first read.
    ///
    /// ```
    /// # use std::time::Duration;
    /// # use rollout::RedisStoreConfig;
    /// let store = RedisStoreConfig::from_url("redis://localhost:6379")
    ///     .timeout(Duration::from_millis(100))
    ///     .to_store()?;
    /// # Ok::<(), rollout::Error>(())
    /// ```
    pub fn to_store(&self) -> Result<RedisStore> {
        let mut url = url::Url::parse(&self.url).map_err(Error::InvalidStoreUrl)?;
        match url.scheme() {
            "redis" | "rediss" | "redis+unix" | "unix" => {}
            scheme => return Err(Error::UnsupportedStoreScheme(scheme.to_owned())),
        }

        let client = redis::Client::open(self.url.as_str())?;

        // Keep credentials out of log records.
        if url.password().is_some() {
            let _ = url.set_password(Some("***"));
        }

        Ok(RedisStore {
            client,
            timeout: self.timeout,
            redacted_url: url.to_string(),
            idle: Mutex::new(Vec::new()),
        })
    }
}

/// [`ExternalStore`] backed by a Redis server.
///
/// Scalars are read with `GET` and allow-lists with `SMEMBERS`. Any failure is logged and
/// reported as absent.
///
/// Each read checks out an idle connection, or opens a new one, and returns it once the command
/// succeeds. Concurrent reads never wait on each other, so a hanging server costs every reader
/// at most its own timeouts. A failed connection is dropped.
pub struct RedisStore {
    client: redis::Client,
    timeout: Duration,
    redacted_url: String,
    idle: Mutex<Vec<Connection>>,
}

impl RedisStore {
    /// Create a store for `url` with default settings.
    pub fn open(url: impl Into<String>) -> Result<RedisStore> {
        RedisStoreConfig::from_url(url).to_store()
    }

    fn connect(&self) -> RedisResult<Connection> {
        log::debug!(target: "rollout", url:display = self.redacted_url; "connecting to store");
        let connection = self.client.get_connection_with_timeout(self.timeout)?;
        connection.set_read_timeout(Some(self.timeout))?;
        connection.set_write_timeout(Some(self.timeout))?;
        Ok(connection)
    }

    fn idle_connections(&self) -> MutexGuard<'_, Vec<Connection>> {
        match self.idle.lock() {
            Ok(idle) => idle,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn query<T>(&self, f: impl FnOnce(&mut Connection) -> RedisResult<T>) -> Result<T> {
        // The lock is only held to check a connection in or out, never across I/O.
        let checked_out = self.idle_connections().pop();
        let mut connection = match checked_out {
            Some(connection) => connection,
            None => self.connect()?,
        };

        let value = f(&mut connection)?;
        self.idle_connections().push(connection);
        Ok(value)
    }

    fn try_get_value(&self, key: &str) -> Result<Option<String>> {
        self.query(|connection| connection.get(key))
    }

    fn try_get_set(&self, key: &str) -> Result<HashSet<String>> {
        self.query(|connection| connection.smembers(key))
    }
}

impl ExternalStore for RedisStore {
    fn get_value(&self, key: &str) -> Option<String> {
        self.try_get_value(key).unwrap_or_else(|err| {
            log::warn!(target: "rollout",
                       key,
                       url:display = self.redacted_url;
                       "failed to read value from store: {:?}", err);
            None
        })
    }

    fn get_set(&self, key: &str) -> HashSet<String> {
        self.try_get_set(key).unwrap_or_else(|err| {
            log::warn!(target: "rollout",
                       key,
                       url:display = self.redacted_url;
                       "failed to read set from store: {:?}", err);
            HashSet::new()
        })
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("url", &self.redacted_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        net::TcpListener,
        sync::Arc,
        time::{Duration, Instant},
    };

    use super::{RedisStore, RedisStoreConfig};
    use crate::{Error, ExternalStore};

    #[test]
    fn rejects_invalid_url() {
        assert!(matches!(
            RedisStore::open("not a url"),
            Err(Error::InvalidStoreUrl(_))
        ));
    }

    #[test]
    fn rejects_unsupported_scheme() {
        assert!(matches!(
            RedisStore::open("http://localhost:6379"),
            Err(Error::UnsupportedStoreScheme(scheme)) if scheme == "http"
        ));
    }

    #[test]
    fn redacts_password() {
        let store = RedisStore::open("redis://:secret@localhost:6379/0").unwrap();
        let debug = format!("{:?}", store);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn hanging_store_does_not_serialize_readers() {
        const READERS: u32 = 8;
        const READS: u32 = 2;
        let timeout = Duration::from_millis(100);

        // Accepts connections and never replies.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        std::thread::spawn(move || {
            let mut accepted = Vec::new();
            for stream in listener.incoming().flatten() {
                accepted.push(stream);
            }
        });

        let store = Arc::new(
            RedisStoreConfig::from_url(format!("redis://127.0.0.1:{port}"))
                .timeout(timeout)
                .to_store()
                .unwrap(),
        );

        let started = Instant::now();
        let readers: Vec<_> = (0..READERS)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..READS {
                        assert_eq!(store.get_value("gator.rollout.enabled"), None);
                    }
                })
            })
            .collect();
        for reader in readers {
            reader.join().unwrap();
        }

        // One timeout per read if readers queued behind each other.
        let serialized = timeout * READERS * READS;
        assert!(
            started.elapsed() < serialized / 2,
            "readers took {:?}",
            started.elapsed()
        );
    }

    #[test]
    fn unreachable_store_reads_as_empty() {
        let _ = env_logger::builder().is_test(true).try_init();

        let store = RedisStoreConfig::from_url("redis://127.0.0.1:1")
            .timeout(Duration::from_millis(50))
            .to_store()
            .unwrap();

        assert_eq!(store.get_value("gator.rollout.enabled"), None);
        assert!(store.get_set("gator.rollout.owners").is_empty());
    }
}
