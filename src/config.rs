//! Pool configuration options

use crate::connection::Connection;
use crate::errors::{PoolError, PoolResult};
use crate::logger::{Logger, TracingLogger};
use crate::metrics::MetricsSink;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Factory that opens a new connection
pub type ConnectFn<C> = Arc<dyn Fn() -> Result<C, <C as Connection>::Error> + Send + Sync>;

/// Predicate deciding whether a pooled connection is still usable
pub type HealthCheckFn<C> = Arc<dyn Fn(&C) -> bool + Send + Sync>;

/// Configuration for a connection pool
///
/// # Examples
///
/// ```
/// use esox_connectionpool::PoolOptions;
/// use std::net::TcpStream;
/// use std::time::Duration;
///
/// let options = PoolOptions::<TcpStream>::new()
///     .with_connect(|| TcpStream::connect("127.0.0.1:6379"))
///     .with_connections(4)
///     .with_probe_interval(Duration::from_secs(5));
///
/// assert_eq!(options.connections, 4);
/// assert!(options.validate().is_ok());
/// ```
pub struct PoolOptions<C: Connection> {
    /// Opens a new connection. Required.
    pub connect: Option<ConnectFn<C>>,

    /// Optional health check; without one unhealthy connections are never evicted
    pub health_check: Option<HealthCheckFn<C>>,

    /// Number of connections the pool keeps open
    pub connections: usize,

    /// Interval between health probes and replenishment
    pub probe_interval: Duration,

    pub logger: Arc<dyn Logger>,

    pub metrics: Option<Arc<dyn MetricsSink>>,
}

impl<C: Connection> Default for PoolOptions<C> {
    fn default() -> Self {
        Self {
            connect: None,
            health_check: None,
            connections: 1,
            probe_interval: Duration::from_secs(1),
            logger: Arc::new(TracingLogger),
            metrics: None,
        }
    }
}

impl<C: Connection> Clone for PoolOptions<C> {
    fn clone(&self) -> Self {
        Self {
            connect: self.connect.clone(),
            health_check: self.health_check.clone(),
            connections: self.connections,
            probe_interval: self.probe_interval,
            logger: Arc::clone(&self.logger),
            metrics: self.metrics.clone(),
        }
    }
}

impl<C: Connection> fmt::Debug for PoolOptions<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolOptions")
            .field("connect", &self.connect.is_some())
            .field("health_check", &self.health_check.is_some())
            .field("connections", &self.connections)
            .field("probe_interval", &self.probe_interval)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

impl<C: Connection> PoolOptions<C> {
    /// Create options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connect function
    pub fn with_connect<F>(mut self, connect: F) -> Self
    where
        F: Fn() -> Result<C, C::Error> + Send + Sync + 'static,
    {
        self.connect = Some(Arc::new(connect));
        self
    }

    /// Set the health check
    pub fn with_health_check<F>(mut self, health_check: F) -> Self
    where
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        self.health_check = Some(Arc::new(health_check));
        self
    }

    /// Set the number of pooled connections
    pub fn with_connections(mut self, count: usize) -> Self {
        self.connections = count;
        self
    }

    /// Set the probe interval
    pub fn with_probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = interval;
        self
    }

    /// Replace the default `tracing` logger
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Check the options, reporting the first problem found
    ///
    /// # Examples
    ///
    /// ```
    /// use esox_connectionpool::{PoolError, PoolOptions};
    /// use std::net::TcpStream;
    ///
    /// let err = PoolOptions::<TcpStream>::new().validate().unwrap_err();
    /// assert!(matches!(err, PoolError::NoConnectFunction));
    /// ```
    pub fn validate(&self) -> PoolResult<()> {
        if self.connect.is_none() {
            return Err(PoolError::NoConnectFunction);
        }
        if self.connections < 1 {
            return Err(PoolError::InvalidConnectionCount);
        }
        if self.probe_interval.is_zero() {
            return Err(PoolError::InvalidProbeInterval);
        }
        Ok(())
    }
}
