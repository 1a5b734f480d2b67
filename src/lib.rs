//! # EsoxSolutions.ConnectionPool
//!
//! Self-healing, thread-safe pool of long-lived connections.
//!
//! ## Features
//!
//! - Keeps a fixed number of connections open, reconnecting missing ones
//! - Periodic health probing with eviction of unhealthy connections
//! - Shared round-robin retrieval and exclusive checkout
//! - Idempotent shutdown with an observable closed signal
//! - Pluggable logging (`tracing` by default) and metrics (Prometheus)
//!
//! ## Quick Start
//!
//! ```rust
//! use esox_connectionpool::{Pool, PoolOptions};
//! use std::net::{TcpListener, TcpStream};
//! use std::time::Duration;
//!
//! let listener = TcpListener::bind("127.0.0.1:0").unwrap();
//! let addr = listener.local_addr().unwrap();
//!
//! let pool = Pool::new(
//!     PoolOptions::<TcpStream>::new()
//!         .with_connect(move || TcpStream::connect(addr))
//!         .with_health_check(|stream| matches!(stream.take_error(), Ok(None)))
//!         .with_connections(3)
//!         .with_probe_interval(Duration::from_secs(5)),
//! )
//! .unwrap();
//!
//! if let Some(conn) = pool.next() {
//!     println!("Using {:?}", conn.local_addr());
//! }
//!
//! pool.close();
//! assert_eq!(pool.size(), 0);
//! ```

mod pool;
mod config;
mod connection;
mod registry;
mod reconcile;
mod metrics;
mod health;
mod logger;
mod shutdown;
mod errors;

pub use pool::Pool;
pub use config::{ConnectFn, HealthCheckFn, PoolOptions};
pub use connection::{Connection, Exclusive};
pub use metrics::MetricsSink;
#[cfg(feature = "metrics")]
pub use metrics::PrometheusMetrics;
pub use health::PoolStatus;
pub use logger::{Logger, NoopLogger, TracingLogger};
pub use shutdown::ClosedSignal;
pub use errors::{PoolError, PoolResult, ReturnError};
