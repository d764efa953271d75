use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use redis::{Client, ConnectionAddr, ConnectionInfo, IntoConnectionInfo, RedisConnectionInfo};
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

/// Redis endpoint described by host/port instead of a URL.
#[derive(Clone, Debug)]
pub struct RedisEndpoint {
    pub host: String,
    pub port: u16,
    pub db: i64,
    pub password: Option<String>,
}

impl RedisEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            db: 0,
            password: None,
        }
    }

    fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo {
            addr: ConnectionAddr::Tcp(self.host.clone(), self.port),
            redis: RedisConnectionInfo {
                db: self.db,
                password: self.password.clone(),
                ..Default::default()
            },
        }
    }

    /// Label used in logs; never contains the password.
    pub fn label(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.db)
    }
}

/// Redis connection handle.
///
/// `ConnectionManager` is multiplexed and cheap to clone, so callers clone it
/// per command instead of sharing it behind a lock. Commands for different
/// users never wait on each other in this process.
#[derive(Clone)]
pub struct RedisPool {
    manager: ConnectionManager,
    label: String,
}

impl RedisPool {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let info: ConnectionInfo = redis_url
            .into_connection_info()
            .context("failed to parse REDIS_URL connection string")?;
        let label = match &info.addr {
            ConnectionAddr::Tcp(host, port) => format!("{}:{}/{}", host, port, info.redis.db),
            ConnectionAddr::TcpTls { host, port, .. } => {
                format!("{}:{}/{} (tls)", host, port, info.redis.db)
            }
            other => format!("{:?}", other),
        };
        Self::open(info, label).await
    }

    pub async fn connect_endpoint(endpoint: &RedisEndpoint) -> Result<Self> {
        Self::open(endpoint.connection_info(), endpoint.label()).await
    }

    /// Connect, retrying while the server comes up.
    pub async fn connect_with_retry(
        endpoint: &RedisEndpoint,
        attempts: u32,
        delay: Duration,
    ) -> Result<Self> {
        let mut attempt = 1;
        loop {
            match Self::connect_endpoint(endpoint).await {
                Ok(pool) => return Ok(pool),
                Err(err) if attempt < attempts => {
                    warn!(
                        endpoint = %endpoint.label(),
                        attempt,
                        "Redis not reachable yet: {:#}",
                        err
                    );
                    attempt += 1;
                    sleep(delay).await;
                }
                Err(err) => {
                    return Err(err).with_context(|| {
                        format!("giving up on Redis at {} after {} attempts", endpoint.label(), attempts)
                    })
                }
            }
        }
    }

    async fn open(info: ConnectionInfo, label: String) -> Result<Self> {
        let client = Client::open(info).context("failed to construct Redis client")?;
        let manager = ConnectionManager::new(client)
            .await
            .context("failed to initialize Redis connection manager")?;
        info!("Redis connected at {}", label);
        Ok(Self { manager, label })
    }

    pub fn manager(&self) -> ConnectionManager {
        self.manager.clone()
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}
