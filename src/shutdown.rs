//! One-shot closed notification

use tokio::sync::watch;

/// Owner side of the closed signal. Kept inside the pool.
pub(crate) struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn subscribe(&self) -> ClosedSignal {
        ClosedSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Flip to closed. Works with or without subscribers.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

/// Read-only view of a pool's closed state.
///
/// Fires once, when the pool is closed, and stays fired. Subscribing after
/// the fact still observes the closed state.
///
/// # Examples
///
/// ```
/// use esox_connectionpool::{Pool, PoolOptions};
/// use std::net::{TcpListener, TcpStream};
///
/// let listener = TcpListener::bind("127.0.0.1:0").unwrap();
/// let addr = listener.local_addr().unwrap();
///
/// let pool = Pool::new(
///     PoolOptions::<TcpStream>::new().with_connect(move || TcpStream::connect(addr)),
/// )
/// .unwrap();
///
/// let signal = pool.closed_signal();
/// assert!(!signal.is_closed());
///
/// pool.close();
/// assert!(signal.is_closed());
/// ```
#[derive(Debug, Clone)]
pub struct ClosedSignal {
    rx: watch::Receiver<bool>,
}

impl ClosedSignal {
    pub fn is_closed(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the pool is closed
    pub async fn closed(&self) {
        let mut rx = self.rx.clone();
        // Err means the pool is gone, and a dropped pool is a closed pool
        let _ = rx.wait_for(|closed| *closed).await;
    }
}
