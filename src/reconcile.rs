//! Background health probing and replenishment

use crate::connection::Connection;
use crate::logger::Logger;
use crate::pool::Shared;

use crossbeam::channel::{self, Sender};
use crossbeam::select;
use std::io;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

impl<C: Connection> Shared<C> {
    /// Run one pass, waiting for any pass in progress
    pub fn reconcile(&self) {
        let _guard = self.prober.lock();
        self.run_pass();
    }

    /// Run one pass unless another is in progress. Returns whether it ran.
    pub fn try_reconcile(&self) -> bool {
        match self.prober.try_lock() {
            Some(_guard) => {
                self.run_pass();
                true
            }
            None => false,
        }
    }

    fn run_pass(&self) {
        self.logger.debug(format_args!("probing connection pool"));
        if self.is_closed() {
            return;
        }

        let size = self.registry.size();
        self.report_size(size);

        self.evict_unhealthy();

        // A slow health check may have overlapped with close
        if self.is_closed() {
            return;
        }
        self.replenish();
    }

    /// Health checks run even when the pool is full, so a broken connection
    /// is never kept just because the count looks right.
    ///
    /// A connection that fails its check stays pooled until it is removed
    /// below, so a concurrent [`Pool::next`](crate::Pool::next) may still
    /// hand it out in between. Callers sharing a connection must cope with
    /// it going bad at any time regardless.
    fn evict_unhealthy(&self) {
        let Some(ref health_check) = self.health_check else {
            return;
        };

        // Checks run against a snapshot; the registry lock is not held
        // while the predicate runs
        for conn in self.registry.snapshot() {
            if health_check(conn.as_ref()) {
                continue;
            }
            // Gone already: checked out meanwhile, or drained by close
            if !self.registry.remove(&conn) {
                continue;
            }
            self.logger
                .error(format_args!("removing unhealthy connection from pool"));
            self.report_error();
            self.close_connection(&conn);
        }
    }

    /// Checked out connections do not count towards the target, so a pool
    /// whose members are all checked out is refilled in full.
    fn replenish(&self) {
        let deficit = self.target.saturating_sub(self.registry.size());

        for _ in 0..deficit {
            if self.is_closed() {
                self.logger
                    .debug(format_args!("pool closed, stopping replenishment"));
                return;
            }

            match (self.connect)() {
                Ok(conn) => {
                    if let Err(conn) = self.registry.add(Arc::new(conn)) {
                        self.close_connection(&conn);
                    }
                }
                Err(e) => {
                    self.logger
                        .error(format_args!("failed to create connection: {e}"));
                    self.report_error();
                }
            }
        }
    }
}

/// Thread firing a reconciliation pass every probe interval.
///
/// Each pass gets its own thread so a slow connect never delays the timer.
/// A tick that finds the previous pass still running is skipped.
pub(crate) struct Ticker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl Ticker {
    pub fn spawn<C: Connection>(shared: &Arc<Shared<C>>) -> io::Result<Self> {
        let (stop, stopped) = channel::bounded::<()>(0);
        let interval = shared.probe_interval;
        let logger = Arc::clone(&shared.logger);
        // Weak so the ticker never keeps a dropped pool alive
        let shared: Weak<Shared<C>> = Arc::downgrade(shared);

        let handle = thread::Builder::new()
            .name("esox-pool-ticker".to_string())
            .spawn(move || {
                let ticks = channel::tick(interval);
                loop {
                    let running = select! {
                        recv(stopped) -> _ => false,
                        recv(ticks) -> _ => on_tick(&shared, logger.as_ref()),
                    };
                    if !running {
                        break;
                    }
                }
            })?;

        Ok(Self { stop, handle })
    }

    /// Stop ticking and wait for the ticker thread to exit.
    ///
    /// Passes already started finish on their own; they see the closed
    /// registry and do no further work.
    pub fn stop(self, logger: &dyn Logger) {
        drop(self.stop);
        if self.handle.join().is_err() {
            logger.error(format_args!("probe ticker thread panicked"));
        }
    }
}

/// Returns false once the pool is gone or closed
fn on_tick<C: Connection>(shared: &Weak<Shared<C>>, logger: &dyn Logger) -> bool {
    let Some(shared) = shared.upgrade() else {
        return false;
    };
    if shared.is_closed() {
        return false;
    }
    if shared.prober.is_locked() {
        logger.debug(format_args!("previous probe still running, skipping tick"));
        return true;
    }

    let spawned = thread::Builder::new()
        .name("esox-pool-probe".to_string())
        .spawn(move || {
            shared.try_reconcile();
        });
    if let Err(e) = spawned {
        logger.error(format_args!("failed to spawn probe thread: {e}"));
    }
    true
}
