//! Error types for the connection pool

use crate::connection::Exclusive;

use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("No connect function specified")]
    NoConnectFunction,

    #[error("Invalid connection count - at least one connection is required")]
    InvalidConnectionCount,

    #[error("Invalid probe interval - must be greater than zero")]
    InvalidProbeInterval,

    #[error("Connection was checked out from a different pool")]
    ForeignConnection,

    #[error("Failed to start the probe thread: {0}")]
    Spawn(#[source] std::io::Error),
}

pub type PoolResult<T> = Result<T, PoolError>;

/// A handle refused by [`Pool::return_connection`](crate::Pool::return_connection).
///
/// Carries the handle so it is not lost; hand it to the pool it came from
/// with [`into_inner`](ReturnError::into_inner).
#[derive(Error)]
#[error("{error}")]
pub struct ReturnError<C> {
    error: PoolError,
    conn: Exclusive<C>,
}

impl<C> ReturnError<C> {
    pub(crate) fn new(error: PoolError, conn: Exclusive<C>) -> Self {
        Self { error, conn }
    }

    pub fn error(&self) -> &PoolError {
        &self.error
    }

    pub fn into_inner(self) -> Exclusive<C> {
        self.conn
    }
}

impl<C> fmt::Debug for ReturnError<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReturnError")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}
