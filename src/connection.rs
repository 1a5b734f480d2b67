//! Connection contract and the exclusive checkout handle

use std::fmt;
use std::net::{Shutdown, TcpStream};
use std::ops::Deref;
use std::sync::Arc;

use crate::registry::Registry;

/// A long-lived item the pool can manage.
///
/// The only capability the pool needs is closing. Closing takes `&self`
/// because shared retrieval hands the same connection to several callers at
/// once, so the pool never has unique access to a pooled value.
///
/// # Examples
///
/// ```
/// use esox_connectionpool::Connection;
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// struct Session {
///     open: AtomicBool,
/// }
///
/// impl Connection for Session {
///     type Error = std::io::Error;
///
///     fn close(&self) -> Result<(), Self::Error> {
///         self.open.store(false, Ordering::SeqCst);
///         Ok(())
///     }
/// }
/// ```
pub trait Connection: Send + Sync + 'static {
    /// Error produced when connecting or closing fails
    type Error: std::error::Error + Send + Sync + 'static;

    /// Close the connection
    fn close(&self) -> Result<(), Self::Error>;
}

impl Connection for TcpStream {
    type Error = std::io::Error;

    fn close(&self) -> Result<(), Self::Error> {
        self.shutdown(Shutdown::Both)
    }
}

/// A connection checked out with [`Pool::ex_next`](crate::Pool::ex_next).
///
/// While the handle is alive the connection is not in the pool and no other
/// caller can check it out exclusively. Give it back with
/// [`Pool::return_connection`](crate::Pool::return_connection). A dropped
/// handle is lost to the pool: it is not closed by the pool, and its slot is
/// refilled on the next probe.
pub struct Exclusive<C> {
    conn: Arc<C>,
    lease: Lease<C>,
}

impl<C> Exclusive<C> {
    pub(crate) fn new(conn: Arc<C>, registry: Arc<Registry<C>>) -> Self {
        Self {
            conn,
            lease: Lease {
                registry: Some(registry),
            },
        }
    }

    pub(crate) fn issued_by(&self, registry: &Arc<Registry<C>>) -> bool {
        self.lease
            .registry
            .as_ref()
            .is_some_and(|own| Arc::ptr_eq(own, registry))
    }

    /// Put the connection back into the registry it came from. Hands the
    /// connection back if that registry has been closed.
    pub(crate) fn restore(self) -> Result<(), Arc<C>> {
        let Self { conn, mut lease } = self;
        match lease.registry.take() {
            Some(registry) => registry.restore(conn),
            None => Err(conn),
        }
    }
}

impl<C> Deref for Exclusive<C> {
    type Target = C;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl<C: fmt::Debug> fmt::Debug for Exclusive<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exclusive").field("conn", &self.conn).finish()
    }
}

/// Releases the checkout slot if the handle is dropped instead of returned
struct Lease<C> {
    registry: Option<Arc<Registry<C>>>,
}

impl<C> Drop for Lease<C> {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.take() {
            registry.forget_checkout();
        }
    }
}
