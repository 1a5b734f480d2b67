//! Core connection pool implementation

use crate::config::{ConnectFn, HealthCheckFn, PoolOptions};
use crate::connection::{Connection, Exclusive};
use crate::errors::{PoolError, PoolResult, ReturnError};
use crate::health::PoolStatus;
use crate::logger::Logger;
use crate::metrics::MetricsSink;
use crate::reconcile::Ticker;
use crate::registry::Registry;
use crate::shutdown::{ClosedSignal, Shutdown};

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// State shared between the pool handle, the ticker and probe threads
pub(crate) struct Shared<C: Connection> {
    pub connect: ConnectFn<C>,
    pub health_check: Option<HealthCheckFn<C>>,
    pub target: usize,
    pub probe_interval: Duration,
    pub logger: Arc<dyn Logger>,
    pub metrics: Option<Arc<dyn MetricsSink>>,

    /// Shared with outstanding exclusive handles
    pub registry: Arc<Registry<C>>,
    /// Serializes reconciliation passes
    pub prober: Mutex<()>,
    pub shutdown: Shutdown,
}

impl<C: Connection> Shared<C> {
    pub fn is_closed(&self) -> bool {
        self.registry.is_closed()
    }

    /// Close a connection the pool no longer holds, logging failures
    pub fn close_connection(&self, conn: &C) {
        if let Err(e) = conn.close() {
            self.logger.error(format_args!("failed to close connection: {e}"));
        }
    }

    pub fn report_size(&self, size: usize) {
        if let Some(ref metrics) = self.metrics {
            metrics.set_connections(size);
        }
    }

    pub fn report_error(&self) {
        if let Some(ref metrics) = self.metrics {
            metrics.inc_connection_errors();
        }
    }

    pub fn report_retrieval(&self) {
        if let Some(ref metrics) = self.metrics {
            metrics.inc_retrievals();
        }
    }
}

/// Self-healing pool of long-lived connections.
///
/// The pool keeps `connections` connections open, probing them every
/// `probe_interval` on a background thread: unhealthy ones are closed and
/// evicted, missing ones are reconnected. Callers either share a connection
/// round-robin with [`next`](Pool::next) or take one exclusively with
/// [`ex_next`](Pool::ex_next).
///
/// Dropping the pool closes it.
///
/// # Examples
///
/// ```
/// use esox_connectionpool::{Pool, PoolOptions};
/// use std::net::{TcpListener, TcpStream};
/// use std::time::Duration;
///
/// let listener = TcpListener::bind("127.0.0.1:0").unwrap();
/// let addr = listener.local_addr().unwrap();
///
/// let pool = Pool::new(
///     PoolOptions::<TcpStream>::new()
///         .with_connect(move || TcpStream::connect(addr))
///         .with_connections(2)
///         .with_probe_interval(Duration::from_secs(60)),
/// )
/// .unwrap();
///
/// assert_eq!(pool.size(), 2);
///
/// let shared = pool.next().unwrap();
/// let exclusive = pool.ex_next().unwrap();
/// assert_eq!(pool.size(), 1);
///
/// pool.return_connection(exclusive).unwrap();
/// assert_eq!(pool.size(), 2);
/// # drop(shared);
/// ```
pub struct Pool<C: Connection> {
    shared: Arc<Shared<C>>,
    ticker: Mutex<Option<Ticker>>,
}

impl<C: Connection> Pool<C> {
    /// Validate `options`, fill the pool, and start background probing.
    ///
    /// The first reconciliation pass runs on the calling thread, so the pool
    /// is as full as the connect function allows when this returns. Connect
    /// failures are logged rather than returned.
    pub fn new(options: PoolOptions<C>) -> PoolResult<Self> {
        options.validate()?;
        let PoolOptions {
            connect,
            health_check,
            connections,
            probe_interval,
            logger,
            metrics,
        } = options;
        let connect = connect.ok_or(PoolError::NoConnectFunction)?;

        logger.debug(format_args!(
            "creating connection pool with {connections} connections"
        ));

        let pool = Self {
            shared: Arc::new(Shared {
                connect,
                health_check,
                target: connections,
                probe_interval,
                logger,
                metrics,
                registry: Arc::new(Registry::new(connections)),
                prober: Mutex::new(()),
                shutdown: Shutdown::new(),
            }),
            ticker: Mutex::new(None),
        };

        pool.shared.reconcile();

        // On failure the pool is dropped here, which closes what was opened
        let ticker = Ticker::spawn(&pool.shared).map_err(PoolError::Spawn)?;
        *pool.ticker.lock() = Some(ticker);

        Ok(pool)
    }

    /// Get the next connection round-robin, leaving it in the pool.
    ///
    /// Other callers may be handed the same connection concurrently. Returns
    /// `None` if the pool is empty.
    pub fn next(&self) -> Option<Arc<C>> {
        let conn = self.shared.registry.next_shared()?;
        self.shared.report_retrieval();
        Some(conn)
    }

    /// Take the next connection round-robin out of the pool.
    ///
    /// The connection is unavailable to other callers until it is handed
    /// back with [`return_connection`](Pool::return_connection). Returns
    /// `None` if the pool is empty.
    pub fn ex_next(&self) -> Option<Exclusive<C>> {
        let conn = self.shared.registry.take_next()?;
        self.shared.report_retrieval();
        Some(Exclusive::new(conn, Arc::clone(&self.shared.registry)))
    }

    /// Put an exclusively checked out connection back at the end of the pool.
    ///
    /// If the pool has been closed in the meantime the connection is closed
    /// instead.
    ///
    /// # Errors
    ///
    /// [`PoolError::ForeignConnection`] if `conn` came from another pool. The
    /// handle is handed back untouched inside the error.
    pub fn return_connection(&self, conn: Exclusive<C>) -> Result<(), ReturnError<C>> {
        if !conn.issued_by(&self.shared.registry) {
            return Err(ReturnError::new(PoolError::ForeignConnection, conn));
        }

        if let Err(conn) = conn.restore() {
            self.shared
                .logger
                .debug(format_args!("pool closed, closing returned connection"));
            self.shared.close_connection(&conn);
        }
        Ok(())
    }

    /// Number of connections currently in the pool
    pub fn size(&self) -> usize {
        self.shared.registry.size()
    }

    pub fn status(&self) -> PoolStatus {
        let (pooled, checked_out) = self.shared.registry.counts();
        PoolStatus::new(pooled, checked_out, self.shared.target, self.is_closed())
    }

    /// Run a reconciliation pass now, on the calling thread.
    ///
    /// Waits for a pass already in progress to finish first.
    pub fn reconcile(&self) {
        self.shared.reconcile();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Observe when the pool gets closed
    pub fn closed_signal(&self) -> ClosedSignal {
        self.shared.shutdown.subscribe()
    }

    /// Close the pool and every pooled connection.
    ///
    /// Only the first call has any effect. Stops background probing, fires
    /// the closed signal and closes each pooled connection exactly once;
    /// close failures are logged. Connections checked out at this point are
    /// closed when they are returned.
    pub fn close(&self) {
        // Held throughout, so concurrent callers return only once the pool
        // is fully drained
        let mut ticker = self.ticker.lock();
        if !self.shared.registry.mark_closed() {
            return;
        }

        self.shared
            .logger
            .debug(format_args!("closing connection pool"));
        self.shared.shutdown.trigger();

        if let Some(ticker) = ticker.take() {
            ticker.stop(self.shared.logger.as_ref());
        }

        // Nothing can be added any more, so this drains for good
        while let Some(conn) = self.shared.registry.remove_at(0) {
            self.shared.close_connection(&conn);
        }
        self.shared.report_size(0);
    }
}

impl<C: Connection> Drop for Pool<C> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<C: Connection> fmt::Debug for Pool<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("status", &self.status())
            .field("probe_interval", &self.shared.probe_interval)
            .finish()
    }
}
