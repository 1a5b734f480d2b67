//! Basic usage examples

use esox_connectionpool::{Connection, Pool, PoolOptions};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::sleep;
use std::time::Duration;

/// Stand-in for a real client session
#[derive(Debug)]
struct Session {
    id: usize,
    alive: AtomicBool,
}

impl Connection for Session {
    type Error = io::Error;

    fn close(&self) -> Result<(), Self::Error> {
        println!("   Closing session {}", self.id);
        self.alive.store(false, Ordering::SeqCst);
        Ok(())
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "esox_connectionpool=debug".into()),
        )
        .init();

    println!("=== EsoxSolutions.ConnectionPool - Basic Examples ===\n");

    let next_id = Arc::new(AtomicUsize::new(0));
    let pool = Pool::new(
        PoolOptions::<Session>::new()
            .with_connect(move || {
                Ok(Session {
                    id: next_id.fetch_add(1, Ordering::SeqCst),
                    alive: AtomicBool::new(true),
                })
            })
            .with_health_check(|session| session.alive.load(Ordering::SeqCst))
            .with_connections(3)
            .with_probe_interval(Duration::from_millis(50)),
    )
    .expect("valid pool options");

    // Example 1: Shared retrieval
    println!("1. Shared round-robin retrieval:");
    for _ in 0..4 {
        let session = pool.next().expect("pool is populated");
        println!("   Got session {}", session.id);
    }
    println!("   Pool size: {}\n", pool.size());

    // Example 2: Exclusive checkout
    println!("2. Exclusive checkout:");
    let session = pool.ex_next().expect("pool is populated");
    println!("   Checked out session {}", session.id);
    println!("   Pool size while checked out: {}", pool.size());
    pool.return_connection(session).expect("returned to its own pool");
    println!("   Pool size after return: {}\n", pool.size());

    // Example 3: Self-healing
    println!("3. Self-healing:");
    let broken = pool.next().expect("pool is populated");
    broken.alive.store(false, Ordering::SeqCst);
    println!("   Marked session {} unhealthy", broken.id);
    sleep(Duration::from_millis(200));
    println!("   Status after a few probes: {:?}\n", pool.status());

    // Example 4: Shutdown
    println!("4. Shutdown:");
    let signal = pool.closed_signal();
    pool.close();
    println!("   Closed: {}, size: {}", signal.is_closed(), pool.size());
}
