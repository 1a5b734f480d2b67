//! Integration tests for the connection pool lifecycle
//!
//! These exercise the public API end to end: construction, retrieval,
//! self-healing and shutdown.

use esox_connectionpool::{Connection, NoopLogger, Pool, PoolError, PoolOptions};
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct TestConnection {
    id: usize,
    healthy: AtomicBool,
    closes: AtomicUsize,
}

impl Connection for TestConnection {
    type Error = io::Error;

    fn close(&self) -> Result<(), Self::Error> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out connections that the test can reach after the pool owns them
#[derive(Clone, Default)]
struct Registry {
    all: Arc<Mutex<Vec<Arc<TestConnection>>>>,
}

#[derive(Debug)]
struct Handle(Arc<TestConnection>);

impl Connection for Handle {
    type Error = io::Error;

    fn close(&self) -> Result<(), Self::Error> {
        self.0.close()
    }
}

impl Registry {
    fn connect(&self) -> io::Result<Handle> {
        let mut all = self.all.lock();
        let conn = Arc::new(TestConnection {
            id: all.len(),
            healthy: AtomicBool::new(true),
            closes: AtomicUsize::new(0),
        });
        all.push(Arc::clone(&conn));
        Ok(Handle(conn))
    }

    fn all(&self) -> Vec<Arc<TestConnection>> {
        self.all.lock().clone()
    }
}

fn options(registry: &Registry, connections: usize) -> PoolOptions<Handle> {
    let registry = registry.clone();
    PoolOptions::new()
        .with_connect(move || registry.connect())
        .with_health_check(|h: &Handle| h.0.healthy.load(Ordering::SeqCst))
        .with_connections(connections)
        .with_probe_interval(Duration::from_millis(5))
        .with_logger(Arc::new(NoopLogger))
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

#[test]
fn test_construction_errors() {
    let registry = Registry::default();

    let missing_connect = PoolOptions::<Handle>::new()
        .with_connections(1)
        .with_probe_interval(Duration::from_millis(1));
    assert!(matches!(
        Pool::new(missing_connect),
        Err(PoolError::NoConnectFunction)
    ));

    assert!(matches!(
        Pool::new(options(&registry, 0)),
        Err(PoolError::InvalidConnectionCount)
    ));

    assert!(matches!(
        Pool::new(options(&registry, 1).with_probe_interval(Duration::ZERO)),
        Err(PoolError::InvalidProbeInterval)
    ));

    // Nothing was connected for the rejected configurations
    assert!(registry.all().is_empty());
}

#[test]
fn test_construction_with_and_without_health_check() {
    let registry = Registry::default();
    let with_check = Pool::new(options(&registry, 1)).unwrap();

    let mut without_check = options(&registry, 1);
    without_check.health_check = None;
    let without_check = Pool::new(without_check).unwrap();

    assert_eq!(with_check.size(), 1);
    assert_eq!(without_check.size(), 1);
}

#[test]
fn test_two_connection_scenario() {
    let registry = Registry::default();
    let pool = Pool::new(options(&registry, 2)).unwrap();

    assert!(wait_until(Duration::from_secs(1), || pool.size() == 2));

    let a = pool.next().unwrap();
    let b = pool.next().unwrap();
    assert_ne!(a.0.id, b.0.id);

    // The checked out slot is refilled by the next probe
    let held = pool.ex_next().unwrap();
    assert!(wait_until(Duration::from_secs(1), || pool.size() == 2));
    assert_eq!(registry.all().len(), 3);

    pool.return_connection(held).unwrap();
    assert_eq!(pool.size(), 3);
}

#[test]
fn test_pool_refills_while_every_connection_is_checked_out() {
    let registry = Registry::default();
    let pool = Pool::new(options(&registry, 2)).unwrap();

    let held: Vec<_> = (0..2).map(|_| pool.ex_next().unwrap()).collect();

    assert!(wait_until(Duration::from_millis(500), || pool.size() == 2));
    assert!(pool.next().is_some());

    let status = pool.status();
    assert_eq!(status.checked_out, 2);
    assert!(status.is_healthy());
    drop(held);
}

#[test]
fn test_round_robin_visits_every_position_equally() {
    let registry = Registry::default();
    let pool = Pool::new(options(&registry, 4).with_probe_interval(Duration::from_secs(60)))
        .unwrap();

    let ids: Vec<usize> = (0..8).map(|_| pool.next().unwrap().0.id).collect();
    assert_eq!(&ids[..4], &ids[4..]);

    let mut counts = HashMap::new();
    for id in ids {
        *counts.entry(id).or_insert(0) += 1;
    }
    assert_eq!(counts.len(), 4);
    assert!(counts.values().all(|&n| n == 2));
}

#[test]
fn test_exclusive_checkouts_are_unique() {
    let registry = Registry::default();
    let pool = Arc::new(
        Pool::new(options(&registry, 8).with_probe_interval(Duration::from_secs(60))).unwrap(),
    );

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.ex_next())
        })
        .collect();

    let mut handles = Vec::new();
    for worker in workers {
        if let Some(handle) = worker.join().unwrap() {
            handles.push(handle);
        }
    }

    let mut ids: Vec<usize> = handles.iter().map(|h| h.0.id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), handles.len());
    assert_eq!(pool.size(), 8 - handles.len());

    for handle in handles {
        pool.return_connection(handle).unwrap();
    }
    assert_eq!(pool.size(), 8);
}

#[test]
fn test_concurrent_shared_retrieval_never_panics() {
    let registry = Registry::default();
    let pool = Arc::new(Pool::new(options(&registry, 3)).unwrap());

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                for _ in 0..500 {
                    if let Some(conn) = pool.ex_next() {
                        let _ = pool.next();
                        pool.return_connection(conn).unwrap();
                    }
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }
    // Probes may refill while connections are out, so returns can overshoot
    assert!(pool.size() >= 3);
    assert_eq!(pool.status().checked_out, 0);
}

#[test]
fn test_empty_pool_returns_nothing() {
    let pool = Pool::new(
        PoolOptions::<Handle>::new()
            .with_connect(|| Err(io::Error::other("connection refused")))
            .with_connections(3)
            .with_probe_interval(Duration::from_millis(5))
            .with_logger(Arc::new(NoopLogger)),
    )
    .unwrap();

    assert_eq!(pool.size(), 0);
    assert!(pool.next().is_none());
    assert!(pool.ex_next().is_none());
    assert_eq!(pool.status().missing_connections(), 3);
}

#[test]
fn test_unhealthy_connection_replaced_within_a_probe() {
    let registry = Registry::default();
    let pool = Pool::new(options(&registry, 3)).unwrap();

    let victim = Arc::clone(&registry.all()[1]);
    victim.healthy.store(false, Ordering::SeqCst);

    assert!(wait_until(Duration::from_secs(1), || {
        victim.closes.load(Ordering::SeqCst) == 1 && pool.size() == 3
    }));
    assert_eq!(registry.all().len(), 4);

    thread::sleep(Duration::from_millis(25));
    assert_eq!(victim.closes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_close_is_idempotent() {
    let registry = Registry::default();
    let pool = Pool::new(options(&registry, 3)).unwrap();
    let signal = pool.closed_signal();

    for _ in 0..5 {
        pool.close();
    }

    assert_eq!(pool.size(), 0);
    assert!(pool.is_closed());
    assert!(signal.is_closed());
    assert!(pool.closed_signal().is_closed());
    assert!(!pool.status().is_healthy());
    for conn in registry.all() {
        assert_eq!(conn.closes.load(Ordering::SeqCst), 1);
    }
}

#[test]
fn test_close_from_many_threads_closes_each_once() {
    let registry = Registry::default();
    let pool = Arc::new(Pool::new(options(&registry, 5)).unwrap());

    let closers: Vec<_> = (0..4)
        .map(|_| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.close())
        })
        .collect();
    for closer in closers {
        closer.join().unwrap();
    }

    assert_eq!(pool.size(), 0);
    for conn in registry.all() {
        assert_eq!(conn.closes.load(Ordering::SeqCst), 1);
    }
}

#[tokio::test]
async fn test_closed_signal_wakes_async_waiters() {
    let registry = Registry::default();
    let pool = Arc::new(Pool::new(options(&registry, 1)).unwrap());
    let signal = pool.closed_signal();

    let waiter = tokio::spawn(async move { signal.closed().await });

    let closer = Arc::clone(&pool);
    tokio::task::spawn_blocking(move || closer.close())
        .await
        .unwrap();

    tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .unwrap()
        .unwrap();
}
