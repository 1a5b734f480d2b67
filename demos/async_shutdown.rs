//! Awaiting pool shutdown from async code

use esox_connectionpool::{Connection, Pool, PoolOptions};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug)]
struct Worker(u32);

impl Connection for Worker {
    type Error = std::io::Error;

    fn close(&self) -> Result<(), Self::Error> {
        println!("   Worker {} closed", self.0);
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    println!("=== EsoxSolutions.ConnectionPool - Async Shutdown ===\n");

    let pool = Arc::new(
        Pool::new(
            PoolOptions::<Worker>::new()
                .with_connect(|| Ok(Worker(next_worker_id())))
                .with_connections(2)
                .with_probe_interval(Duration::from_millis(100)),
        )
        .expect("valid pool options"),
    );

    let signal = pool.closed_signal();
    let watcher = tokio::spawn(async move {
        signal.closed().await;
        println!("   Watcher saw the pool close");
    });

    // Connect and close may block, so keep them off the async workers
    let closer = Arc::clone(&pool);
    sleep(Duration::from_millis(50)).await;
    tokio::task::spawn_blocking(move || closer.close())
        .await
        .expect("close task");

    watcher.await.expect("watcher task");
    println!("   Final size: {}", pool.size());
}

fn next_worker_id() -> u32 {
    use std::sync::atomic::{AtomicU32, Ordering};
    static NEXT: AtomicU32 = AtomicU32::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}
